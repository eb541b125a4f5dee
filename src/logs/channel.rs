//! A single append-only log destination.
//!
//! # Responsibilities
//! - Own the file handle for one log file
//! - Filter writes below the channel's threshold before taking any lock
//! - Mirror every accepted line to the file and stdout
//! - Host the retention sweeper for the file's directory
//!
//! # Design Decisions
//! - One mutex covers the file for writes and sweeps, so a sweep never runs mid-line
//! - Write failures are reported to the other sink and never returned
//! - Writes after `close` still reach stdout

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local, NaiveDate};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::duration::RetentionWindow;
use super::error::{LogError, LogResult};
use super::level::Level;
use super::retention::{sweep_directory, RetentionSweeper};
use crate::lifecycle::StopSignal;
use crate::observability::metrics;

/// How often a channel sweeps its directory for aged files.
pub const PRUNE_INTERVAL: Duration = Duration::from_secs(60 * 60);

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Policy class of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// The proxy's own log.
    System,
    /// One backend MCP server.
    Server,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::System => "system",
            ChannelKind::Server => "server",
        }
    }
}

/// Everything needed to open a channel.
#[derive(Debug, Clone)]
pub struct ChannelOptions {
    pub kind: ChannelKind,
    pub path: PathBuf,
    pub level: Level,
    pub retention: RetentionWindow,
    /// Session fragment of the identifier that first opened the channel.
    pub session: Option<String>,
    /// Open `<stem>-<date>.<ext>` next to `path` instead of `path` itself.
    pub dated: bool,
    pub prune_interval: Duration,
}

impl ChannelOptions {
    pub fn new(kind: ChannelKind, path: impl Into<PathBuf>, level: Level, retention: RetentionWindow) -> Self {
        Self {
            kind,
            path: path.into(),
            level,
            retention,
            session: None,
            dated: false,
            prune_interval: PRUNE_INTERVAL,
        }
    }

    pub fn with_session(mut self, session: Option<String>) -> Self {
        self.session = session;
        self
    }

    pub fn with_dated(mut self, dated: bool) -> Self {
        self.dated = dated;
        self
    }

    pub fn with_prune_interval(mut self, interval: Duration) -> Self {
        self.prune_interval = interval;
        self
    }
}

/// Format one log line, including the trailing newline.
pub fn format_line(timestamp: DateTime<Local>, level: Level, message: impl fmt::Display) -> String {
    format!("[{}] [{}] {}\n", timestamp.format(TIMESTAMP_FORMAT), level, message)
}

/// `mcp-memory.log` on 2024-03-09 becomes `mcp-memory-2024-03-09.log`.
pub fn dated_path(base: &Path, date: NaiveDate) -> PathBuf {
    let stem = file_stem(base);
    let name = match base.extension() {
        Some(ext) => format!("{}-{}.{}", stem, date.format("%Y-%m-%d"), ext.to_string_lossy()),
        None => format!("{}-{}", stem, date.format("%Y-%m-%d")),
    };
    base.with_file_name(name)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn write_stdout(bytes: &[u8]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    out.write_all(bytes)?;
    out.flush()
}

/// State shared between a channel and its sweeper task.
pub(crate) struct ChannelCore {
    kind: ChannelKind,
    path: PathBuf,
    /// Stem of the undated path; every file this channel has ever written starts with it.
    stem: String,
    level: Level,
    retention: RetentionWindow,
    session: Option<String>,
    /// `None` once the channel has been closed.
    file: Mutex<Option<File>>,
    write_failures: AtomicU64,
}

impl ChannelCore {
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn retention(&self) -> RetentionWindow {
        self.retention
    }

    fn lock(&self) -> MutexGuard<'_, Option<File>> {
        // A panic elsewhere must not disable logging.
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one line to both sinks. The caller holds the file lock.
    fn emit(&self, file: &mut Option<File>, level: Level, message: impl fmt::Display) {
        let now = Local::now();
        let line = format_line(now, level, message);

        let file_result = match file.as_mut() {
            Some(f) => f.write_all(line.as_bytes()),
            None => Ok(()),
        };
        let stdout_result = write_stdout(line.as_bytes());

        if let Err(e) = file_result {
            self.write_failures.fetch_add(1, Ordering::Relaxed);
            metrics::record_write_failure("file");
            tracing::warn!(path = %self.path.display(), error = %e, "Log file write failed");
            let notice = format_line(
                now,
                Level::Error,
                format_args!("failed to write log file {}: {}", self.path.display(), e),
            );
            let _ = write_stdout(notice.as_bytes());
        }

        if let Err(e) = stdout_result {
            metrics::record_write_failure("stdout");
            if let Some(f) = file.as_mut() {
                let notice = format_line(now, Level::Error, format_args!("failed to write stdout: {}", e));
                let _ = f.write_all(notice.as_bytes());
            }
        }

        metrics::record_line_written(self.kind, level);
    }

    fn log(&self, level: Level, message: impl fmt::Display) {
        if level < self.level {
            return;
        }
        let mut file = self.lock();
        self.emit(&mut file, level, message);
    }

    /// Delete aged siblings of the live file. Returns how many were removed.
    pub(crate) fn sweep(&self, now: SystemTime) -> usize {
        let Some(cutoff) = self.retention.cutoff(now) else {
            return 0;
        };

        let mut file = self.lock();
        let report = match sweep_directory(&self.path, &self.stem, cutoff) {
            Ok(report) => report,
            Err(e) => {
                self.emit(
                    &mut file,
                    Level::Error,
                    format_args!("Failed to read log directory for cleanup: {}", e),
                );
                return 0;
            }
        };

        for (path, e) in &report.failed {
            self.emit(
                &mut file,
                Level::Warn,
                format_args!("Failed to remove old log file {}: {}", path.display(), e),
            );
        }
        for path in &report.removed {
            self.emit(&mut file, Level::Info, format_args!("Removed old log file: {}", path.display()));
        }

        metrics::record_pruned(report.removed.len());
        report.removed.len()
    }
}

/// One append-only log destination with its own threshold and retention.
///
/// Channels are normally obtained from a [`ChannelRegistry`](super::ChannelRegistry)
/// and shared as `Arc<LogChannel>`.
pub struct LogChannel {
    core: Arc<ChannelCore>,
    stop: StopSignal,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl LogChannel {
    /// Create the parent directory, open the file for append and write the
    /// session banner.
    ///
    /// With a runtime handle the retention sweeper is started immediately;
    /// without one the channel works but never prunes.
    pub fn open(options: ChannelOptions, runtime: Option<&Handle>) -> LogResult<Self> {
        if let Some(dir) = options.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| LogError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let stem = file_stem(&options.path);
        let path = if options.dated {
            dated_path(&options.path, Local::now().date_naive())
        } else {
            options.path
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LogError::OpenFile {
                path: path.clone(),
                source,
            })?;

        let core = Arc::new(ChannelCore {
            kind: options.kind,
            path,
            stem,
            level: options.level,
            retention: options.retention,
            session: options.session,
            file: Mutex::new(Some(file)),
            write_failures: AtomicU64::new(0),
        });

        {
            let mut file = core.lock();
            let started = Local::now().format("%Y-%m-%d %H:%M:%S");
            core.emit(&mut file, Level::Info, format_args!("=== LOG SESSION START {} ===", started));
        }

        let channel = Self {
            core,
            stop: StopSignal::new(),
            sweeper: Mutex::new(None),
        };

        match runtime {
            Some(handle) => channel.start_sweeper(handle, options.prune_interval),
            None => tracing::warn!(
                path = %channel.path().display(),
                "No Tokio runtime available, retention pruning disabled for this channel"
            ),
        }

        tracing::debug!(
            path = %channel.path().display(),
            kind = channel.kind().as_str(),
            level = %channel.level(),
            "Log channel opened"
        );

        Ok(channel)
    }

    fn start_sweeper(&self, runtime: &Handle, period: Duration) {
        let stop = self.stop.subscribe();
        let sweeper = RetentionSweeper::new(Arc::clone(&self.core), period);
        let task = runtime.spawn(sweeper.run(stop));
        *self.sweeper.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
    }

    pub fn path(&self) -> &Path {
        &self.core.path
    }

    pub fn kind(&self) -> ChannelKind {
        self.core.kind
    }

    /// Minimum level this channel writes.
    pub fn level(&self) -> Level {
        self.core.level
    }

    pub fn retention(&self) -> RetentionWindow {
        self.core.retention
    }

    /// Session fragment of the identifier that created this channel, if any.
    pub fn session(&self) -> Option<&str> {
        self.core.session.as_deref()
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.core.level
    }

    /// Lines that could not be written to the file since the channel opened.
    pub fn write_failures(&self) -> u64 {
        self.core.write_failures.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.core.lock().is_none()
    }

    /// Write `message` at `level`. Never fails; I/O problems are reported
    /// best-effort on the other sink.
    pub fn log(&self, level: Level, message: impl fmt::Display) {
        self.core.log(level, message);
    }

    pub fn trace(&self, message: impl fmt::Display) {
        self.log(Level::Trace, message);
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Level::Debug, message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log(Level::Info, message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.log(Level::Warn, message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(Level::Error, message);
    }

    /// Run one retention sweep now. Returns the number of files removed.
    pub fn prune_now(&self) -> usize {
        self.core.sweep(SystemTime::now())
    }

    /// Stop the sweeper, wait for it to exit, then flush and release the file.
    ///
    /// Closing an already closed channel is a no-op.
    pub async fn close(&self) -> LogResult<()> {
        self.stop.trigger();

        let task = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(path = %self.path().display(), error = %e, "Retention sweeper ended abnormally");
            }
        }

        let Some(mut file) = self.core.lock().take() else {
            return Ok(());
        };
        file.flush()
            .and_then(|_| file.sync_all())
            .map_err(|source| LogError::Close {
                path: self.core.path.clone(),
                source,
            })
    }
}

impl Drop for LogChannel {
    fn drop(&mut self) {
        // Let the sweeper exit even if close() was never awaited.
        self.stop.trigger();
    }
}

impl fmt::Debug for LogChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogChannel")
            .field("kind", &self.core.kind)
            .field("path", &self.core.path)
            .field("level", &self.core.level)
            .field("retention", &self.core.retention)
            .field("session", &self.core.session)
            .finish()
    }
}
