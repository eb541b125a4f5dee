//! Retention sweeps over a channel's log directory.
//!
//! # Responsibilities
//! - Find files owned by a channel: its stem, then a separator (`.`, `-`, `_`) or nothing
//! - Delete the ones last modified before a cutoff
//! - Run that sweep on a fixed period until the channel is closed

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::broadcast;
use tokio::task;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::channel::ChannelCore;

/// Outcome of a single sweep.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Files that were deleted.
    pub removed: Vec<PathBuf>,
    /// Files that matched but could not be deleted.
    pub failed: Vec<(PathBuf, io::Error)>,
}

/// Delete aged siblings of `live_file` that belong to `stem`.
///
/// A regular file belongs to `stem` when its name is the stem followed by
/// nothing or by `.`, `-` or `_`: for `mcp-memory` that covers
/// `mcp-memory.log`, `mcp-memory.1.log` and `mcp-memory-2024-03-09.log`, but
/// not `mcp-memory2.log`, and a `mcp-mem` channel never touches any of them.
/// The live file itself is never deleted. Failing to read the directory is an
/// error; failing to delete one file is recorded and the sweep continues.
pub fn sweep_directory(live_file: &Path, stem: &str, cutoff: SystemTime) -> io::Result<SweepReport> {
    let dir = match live_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let live_name = live_file.file_name();

    let mut report = SweepReport::default();

    for entry in fs::read_dir(dir)? {
        let Ok(entry) = entry else { continue };

        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }

        let name = entry.file_name();
        if Some(name.as_os_str()) == live_name {
            continue;
        }
        match name.to_str() {
            Some(name) if belongs_to(name, stem) => {}
            _ => continue,
        }

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => continue,
        };
        if modified >= cutoff {
            continue;
        }

        let path = entry.path();
        match fs::remove_file(&path) {
            Ok(()) => report.removed.push(path),
            Err(e) => report.failed.push((path, e)),
        }
    }

    Ok(report)
}

fn belongs_to(name: &str, stem: &str) -> bool {
    match name.strip_prefix(stem) {
        Some(rest) => rest.is_empty() || rest.starts_with(['.', '-', '_']),
        None => false,
    }
}

/// Periodic sweeper bound to one channel.
pub(crate) struct RetentionSweeper {
    core: Arc<ChannelCore>,
    period: Duration,
}

impl RetentionSweeper {
    pub(crate) fn new(core: Arc<ChannelCore>, period: Duration) -> Self {
        Self { core, period }
    }

    /// Sweep every `period` until `stop` fires. The first sweep happens one
    /// full period after start.
    pub(crate) async fn run(self, mut stop: broadcast::Receiver<()>) {
        if !self.core.retention().is_enabled() {
            tracing::debug!(path = %self.core.path().display(), "Retention disabled, sweeper not started");
            return;
        }

        tracing::debug!(
            path = %self.core.path().display(),
            period_secs = self.period.as_secs(),
            "Retention sweeper starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = stop.recv() => {
                    tracing::debug!(path = %self.core.path().display(), "Retention sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    // Directory scans and unlinks block; keep them off the async workers.
                    let core = Arc::clone(&self.core);
                    if let Err(e) = task::spawn_blocking(move || core.sweep(SystemTime::now())).await {
                        tracing::warn!(path = %self.core.path().display(), error = %e, "Retention sweep panicked");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn touch(path: &Path, age: Duration) {
        let mut file = File::create(path).unwrap();
        file.write_all(b"old line\n").unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn test_removes_only_aged_siblings() {
        let temp_dir = TempDir::new().unwrap();
        let live = temp_dir.path().join("mcp-memory.log");
        touch(&live, Duration::from_secs(5 * 3600));

        let old = temp_dir.path().join("mcp-memory.1.log");
        let recent = temp_dir.path().join("mcp-memory.2.log");
        let other = temp_dir.path().join("mcp-filesystem.log");
        touch(&old, Duration::from_secs(2 * 3600));
        touch(&recent, Duration::from_secs(30 * 60));
        touch(&other, Duration::from_secs(10 * 3600));

        let cutoff = SystemTime::now() - Duration::from_secs(3600);
        let report = sweep_directory(&live, "mcp-memory", cutoff).unwrap();

        assert_eq!(report.removed, vec![old.clone()]);
        assert!(report.failed.is_empty());
        assert!(!old.exists());
        assert!(recent.exists());
        assert!(other.exists());
        // The live file is kept even though it is older than the cutoff.
        assert!(live.exists());
    }

    #[test]
    fn test_skips_directories_with_matching_stem() {
        let temp_dir = TempDir::new().unwrap();
        let live = temp_dir.path().join("system.log");
        File::create(&live).unwrap();
        fs::create_dir(temp_dir.path().join("system-archive")).unwrap();

        let cutoff = SystemTime::now() + Duration::from_secs(3600);
        let report = sweep_directory(&live, "system", cutoff).unwrap();

        assert!(report.removed.is_empty());
        assert!(temp_dir.path().join("system-archive").is_dir());
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let live = temp_dir.path().join("gone").join("system.log");
        assert!(sweep_directory(&live, "system", SystemTime::now()).is_err());
    }

    #[test]
    fn test_ownership_needs_a_separator_after_the_stem() {
        assert!(belongs_to("mcp-mem.log", "mcp-mem"));
        assert!(belongs_to("mcp-mem.1.log", "mcp-mem"));
        assert!(belongs_to("mcp-mem-2024-03-09.log", "mcp-mem"));
        assert!(belongs_to("mcp-mem_old", "mcp-mem"));
        assert!(belongs_to("mcp-mem", "mcp-mem"));
        assert!(!belongs_to("mcp-memory.log", "mcp-mem"));
        assert!(!belongs_to("mcp-memory-2024-03-09.log", "mcp-mem"));
        assert!(!belongs_to("mcp-me.log", "mcp-mem"));
    }

    #[test]
    fn test_dated_siblings_are_pruned() {
        let temp_dir = TempDir::new().unwrap();
        let live = temp_dir.path().join("mcp-memory-2024-03-09.log");
        touch(&live, Duration::from_secs(5 * 3600));
        let yesterday = temp_dir.path().join("mcp-memory-2024-03-08.log");
        touch(&yesterday, Duration::from_secs(30 * 3600));

        let cutoff = SystemTime::now() - Duration::from_secs(3600);
        let report = sweep_directory(&live, "mcp-memory", cutoff).unwrap();

        assert_eq!(report.removed, vec![yesterday.clone()]);
        assert!(live.exists());
    }
}
