//! Channel registry: one system channel plus lazily created per-server channels.
//!
//! # Responsibilities
//! - Build the system channel eagerly from [`RegistrySettings`]
//! - Map runtime identifiers (`memory`, `memory-<session>`) onto one channel per server
//! - Guarantee at most one channel per key under concurrent resolution
//! - Close everything at shutdown, tolerating individual failures
//!
//! # Design Decisions
//! - Double-checked locking: shared read for hits, exclusive write for misses
//! - Failed constructions are not cached; the next resolve retries
//! - The storage path depends only on the server name, never on the session

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::runtime::Handle;

use super::channel::{ChannelKind, ChannelOptions, LogChannel, PRUNE_INTERVAL};
use super::duration::{parse_retention, RetentionWindow};
use super::error::{LogError, LogResult};
use super::level::Level;
use crate::config::loader::logging_from_env;
use crate::config::schema::LoggingConfig;
use crate::observability::metrics;

/// Parsed settings for a [`ChannelRegistry`].
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrySettings {
    pub system_level: Level,
    pub server_level: Level,
    pub system_retention: RetentionWindow,
    pub server_retention: RetentionWindow,
    pub log_dir: PathBuf,
    /// Open `<stem>-<date>.<ext>` instead of the bare path.
    pub dated_files: bool,
    pub prune_interval: Duration,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            system_level: Level::Info,
            server_level: Level::Debug,
            system_retention: RetentionWindow::hours(24),
            server_retention: RetentionWindow::hours(12),
            log_dir: PathBuf::from(LoggingConfig::DEFAULT_LOG_DIR),
            dated_files: false,
            prune_interval: PRUNE_INTERVAL,
        }
    }
}

impl RegistrySettings {
    /// Parse raw logging configuration. Malformed retention strings are fatal.
    pub fn from_config(config: &LoggingConfig) -> LogResult<Self> {
        match Self::from_config_partial(config) {
            (settings, None) => Ok(settings),
            (_, Some(e)) => Err(e),
        }
    }

    /// Parse as much of `config` as possible.
    ///
    /// Levels and the directory always parse. Retention windows are parsed
    /// system first; on the first failure parsing stops and the remaining
    /// windows stay disabled.
    pub fn from_config_partial(config: &LoggingConfig) -> (Self, Option<LogError>) {
        let mut settings = Self {
            system_level: Level::parse(&config.level_system),
            server_level: Level::parse(&config.level_mcp),
            system_retention: RetentionWindow::disabled(),
            server_retention: RetentionWindow::disabled(),
            log_dir: config.log_dir.clone(),
            dated_files: config.dated_files,
            prune_interval: PRUNE_INTERVAL,
        };

        match parse_retention(&config.retention_system) {
            Ok(window) => settings.system_retention = window,
            Err(source) => {
                let error = LogError::InvalidRetention {
                    var: "LOG_RETENTION_SYSTEM",
                    source,
                };
                return (settings, Some(error));
            }
        }

        match parse_retention(&config.retention_mcp) {
            Ok(window) => settings.server_retention = window,
            Err(source) => {
                let error = LogError::InvalidRetention {
                    var: "LOG_RETENTION_MCP",
                    source,
                };
                return (settings, Some(error));
            }
        }

        (settings, None)
    }

    /// Read `LOG_LEVEL_*`, `LOG_RETENTION_*` and `LOG_DIR` from the environment.
    pub fn from_env() -> LogResult<Self> {
        Self::from_config(&logging_from_env())
    }

    /// Undated system log path; the open file may carry a date suffix.
    pub fn system_path(&self) -> PathBuf {
        self.log_dir.join("system.log")
    }

    pub fn server_path(&self, server: &str) -> PathBuf {
        self.log_dir.join(format!("mcp-{}.log", server))
    }
}

/// A runtime identifier split into its stable and transient parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelIdentity<'a> {
    /// Server name; the channel key and file name are built from this alone.
    pub server: &'a str,
    /// Everything after the first hyphen, if non-empty.
    pub session: Option<&'a str>,
}

impl<'a> ChannelIdentity<'a> {
    /// Split on the first hyphen: `memory-test-new` → (`memory`, `test-new`).
    pub fn parse(raw: &'a str) -> Self {
        match raw.split_once('-') {
            Some((server, session)) => Self {
                server,
                session: Some(session).filter(|s| !s.is_empty()),
            },
            None => Self {
                server: raw,
                session: None,
            },
        }
    }

    /// Reject names that cannot safely become a file name.
    fn validate(&self, raw: &str) -> LogResult<()> {
        let server = self.server;
        if server.is_empty()
            || server == "."
            || server == ".."
            || server.contains(|c: char| c == '/' || c == '\\' || c == '\0')
        {
            return Err(LogError::InvalidIdentifier(raw.to_string()));
        }
        Ok(())
    }
}

/// Owns the system channel and every per-server channel.
pub struct ChannelRegistry {
    settings: RegistrySettings,
    system: Option<Arc<LogChannel>>,
    channels: RwLock<HashMap<String, Arc<LogChannel>>>,
    runtime: Option<Handle>,
}

impl ChannelRegistry {
    /// Build a registry on the current Tokio runtime, if there is one.
    pub fn new(settings: RegistrySettings) -> LogResult<Self> {
        Self::with_runtime(settings, Handle::try_current().ok())
    }

    /// Build a registry whose sweepers run on `runtime`.
    pub fn with_runtime(settings: RegistrySettings, runtime: Option<Handle>) -> LogResult<Self> {
        let options = ChannelOptions::new(
            ChannelKind::System,
            settings.system_path(),
            settings.system_level,
            settings.system_retention,
        )
        .with_dated(settings.dated_files)
        .with_prune_interval(settings.prune_interval);
        let system = LogChannel::open(options, runtime.as_ref())?;

        tracing::info!(
            log_dir = %settings.log_dir.display(),
            system_level = %settings.system_level,
            server_level = %settings.server_level,
            system_retention = %settings.system_retention,
            server_retention = %settings.server_retention,
            "Log registry initialized"
        );

        Ok(Self {
            settings,
            system: Some(Arc::new(system)),
            channels: RwLock::new(HashMap::new()),
            runtime,
        })
    }

    /// Build a registry from environment settings on the current runtime.
    pub fn from_env() -> LogResult<Self> {
        Self::new(RegistrySettings::from_env()?)
    }

    /// A registry without a system channel, used when initialization failed.
    ///
    /// Server channels can still be resolved.
    pub fn degraded(settings: RegistrySettings, runtime: Option<Handle>) -> Self {
        Self {
            settings,
            system: None,
            channels: RwLock::new(HashMap::new()),
            runtime,
        }
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// The system channel, or `None` if it could not be created.
    pub fn system(&self) -> Option<&Arc<LogChannel>> {
        self.system.as_ref()
    }

    /// Return the channel for `raw_id`, creating it on first use.
    ///
    /// Identifiers that differ only in their session suffix share a channel.
    pub fn resolve(&self, raw_id: &str) -> LogResult<Arc<LogChannel>> {
        let identity = ChannelIdentity::parse(raw_id);
        identity.validate(raw_id)?;

        if let Some(channel) = self.lookup(identity.server) {
            return Ok(channel);
        }

        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have won the race while we waited for the write lock.
        if let Some(channel) = channels.get(identity.server) {
            return Ok(Arc::clone(channel));
        }

        let options = ChannelOptions::new(
            ChannelKind::Server,
            self.settings.server_path(identity.server),
            self.settings.server_level,
            self.settings.server_retention,
        )
        .with_session(identity.session.map(str::to_string))
        .with_dated(self.settings.dated_files)
        .with_prune_interval(self.settings.prune_interval);

        let channel = match LogChannel::open(options, self.runtime.as_ref()) {
            Ok(channel) => Arc::new(channel),
            Err(e) => {
                tracing::error!(server = identity.server, error = %e, "Failed to create server log channel");
                return Err(e);
            }
        };

        channels.insert(identity.server.to_string(), Arc::clone(&channel));
        metrics::record_active_channels(channels.len());
        tracing::debug!(
            server = identity.server,
            session = identity.session.unwrap_or(""),
            path = %channel.path().display(),
            "Server log channel created"
        );

        Ok(channel)
    }

    /// Return an existing channel without creating one.
    pub fn get(&self, raw_id: &str) -> Option<Arc<LogChannel>> {
        self.lookup(ChannelIdentity::parse(raw_id).server)
    }

    fn lookup(&self, server: &str) -> Option<Arc<LogChannel>> {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(server)
            .cloned()
    }

    /// Number of per-server channels (the system channel is not counted).
    pub fn channel_count(&self) -> usize {
        self.channels.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Keys of all per-server channels, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Close the system channel and every server channel.
    ///
    /// Every channel is closed even if some fail; the last error is returned.
    pub async fn shutdown(&self) -> LogResult<()> {
        let servers: Vec<(String, Arc<LogChannel>)> = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        let mut last_error = None;

        if let Some(system) = &self.system {
            if let Err(e) = system.close().await {
                tracing::error!(error = %e, "Failed to close system log channel");
                last_error = Some(e);
            }
        }

        for (server, channel) in servers {
            if let Err(e) = channel.close().await {
                tracing::error!(server = %server, error = %e, "Failed to close server log channel");
                last_error = Some(e);
            }
        }

        metrics::record_active_channels(0);
        tracing::info!("Log registry shut down");

        match last_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("settings", &self.settings)
            .field("system", &self.system.is_some())
            .field("channels", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings(dir: &Path) -> RegistrySettings {
        RegistrySettings {
            log_dir: dir.to_path_buf(),
            ..RegistrySettings::default()
        }
    }

    #[test]
    fn test_identity_split() {
        let id = ChannelIdentity::parse("memory-test-new");
        assert_eq!(id.server, "memory");
        assert_eq!(id.session, Some("test-new"));

        let id = ChannelIdentity::parse("memory");
        assert_eq!(id.server, "memory");
        assert_eq!(id.session, None);

        let id = ChannelIdentity::parse("memory-");
        assert_eq!(id.server, "memory");
        assert_eq!(id.session, None);
    }

    #[test]
    fn test_defaults() {
        let defaults = RegistrySettings::default();
        assert_eq!(defaults.system_level, Level::Info);
        assert_eq!(defaults.server_level, Level::Debug);
        assert_eq!(defaults.system_retention, RetentionWindow::hours(24));
        assert_eq!(defaults.server_retention, RetentionWindow::hours(12));
        assert_eq!(defaults.system_path(), PathBuf::from("/app/logs/system.log"));
        assert_eq!(defaults.server_path("memory"), PathBuf::from("/app/logs/mcp-memory.log"));
    }

    #[test]
    fn test_from_config_parses_levels_and_days() {
        let config = LoggingConfig {
            level_system: "warn".into(),
            level_mcp: "nonsense".into(),
            retention_system: "2d".into(),
            retention_mcp: "".into(),
            log_dir: PathBuf::from("/tmp/x"),
            dated_files: true,
        };
        let parsed = RegistrySettings::from_config(&config).unwrap();
        assert!(parsed.dated_files);
        assert_eq!(parsed.system_level, Level::Warn);
        assert_eq!(parsed.server_level, Level::Info);
        assert_eq!(parsed.system_retention, RetentionWindow::hours(48));
        assert!(!parsed.server_retention.is_enabled());
    }

    #[test]
    fn test_from_config_rejects_bad_retention() {
        let config = LoggingConfig {
            retention_mcp: "forever".into(),
            ..LoggingConfig::default()
        };
        let err = RegistrySettings::from_config(&config).unwrap_err();
        assert!(matches!(err, LogError::InvalidRetention { var: "LOG_RETENTION_MCP", .. }));
        assert!(err.to_string().contains("LOG_RETENTION_MCP"));
    }

    #[test]
    fn test_partial_parse_keeps_what_parsed() {
        let config = LoggingConfig {
            level_mcp: "error".into(),
            retention_system: "bogus".into(),
            log_dir: PathBuf::from("/srv/logs"),
            ..LoggingConfig::default()
        };
        let (settings, error) = RegistrySettings::from_config_partial(&config);
        assert!(matches!(error, Some(LogError::InvalidRetention { var: "LOG_RETENTION_SYSTEM", .. })));
        assert_eq!(settings.server_level, Level::Error);
        assert_eq!(settings.log_dir, PathBuf::from("/srv/logs"));
        // Parsing stopped before the server window.
        assert!(!settings.server_retention.is_enabled());
    }

    #[test]
    fn test_resolve_ignores_session_suffix() {
        let temp_dir = TempDir::new().unwrap();
        let registry = ChannelRegistry::with_runtime(settings(temp_dir.path()), None).unwrap();

        let channel = registry.resolve("memory-test-new").unwrap();
        assert_eq!(channel.session(), Some("test-new"));
        assert!(!channel.path().to_string_lossy().contains("test-new"));
        assert_eq!(channel.path(), temp_dir.path().join("mcp-memory.log"));
        assert_eq!(channel.level(), Level::Debug);

        let again = registry.resolve("memory").unwrap();
        assert!(Arc::ptr_eq(&channel, &again));
        assert_eq!(registry.keys(), vec!["memory".to_string()]);
    }

    #[test]
    fn test_dated_files_carry_the_open_date() {
        let temp_dir = TempDir::new().unwrap();
        let settings = RegistrySettings {
            dated_files: true,
            ..settings(temp_dir.path())
        };
        let registry = ChannelRegistry::with_runtime(settings, None).unwrap();
        let today = chrono::Local::now().format("%Y-%m-%d");

        let channel = registry.resolve("memory-abc").unwrap();
        assert_eq!(channel.path(), temp_dir.path().join(format!("mcp-memory-{today}.log")));
        let system = registry.system().unwrap();
        assert_eq!(system.path(), temp_dir.path().join(format!("system-{today}.log")));
    }

    #[test]
    fn test_resolve_rejects_unsafe_names() {
        let temp_dir = TempDir::new().unwrap();
        let registry = ChannelRegistry::with_runtime(settings(temp_dir.path()), None).unwrap();

        for raw in ["", "-session", "..", "a/b", "..\\x"] {
            assert!(
                matches!(registry.resolve(raw), Err(LogError::InvalidIdentifier(_))),
                "{raw:?} should be rejected"
            );
        }
        assert_eq!(registry.channel_count(), 0);
    }

    #[test]
    fn test_degraded_registry_still_resolves() {
        let temp_dir = TempDir::new().unwrap();
        let registry = ChannelRegistry::degraded(settings(temp_dir.path()), None);
        assert!(registry.system().is_none());
        assert!(registry.resolve("fetch").is_ok());
        assert!(registry.get("fetch-abc").is_some());
        assert!(registry.get("other").is_none());
    }
}
