//! Error types for the log subsystem.

use std::path::PathBuf;

use thiserror::Error;

use super::duration::DurationError;

/// Errors that can occur while building, resolving or closing log channels.
/// Write failures never reach the caller and have no variant here.
#[derive(Debug, Error)]
pub enum LogError {
    /// A retention setting could not be parsed.
    #[error("invalid {var}: {source}")]
    InvalidRetention {
        var: &'static str,
        #[source]
        source: DurationError,
    },

    /// The log directory could not be created.
    #[error("failed to create log directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The log file could not be opened or created.
    #[error("failed to open log file {}: {source}", path.display())]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A runtime identifier cannot be turned into a storage path.
    #[error("invalid server identifier {0:?}")]
    InvalidIdentifier(String),

    /// Flushing or syncing a log file during shutdown failed.
    #[error("failed to close log file {}: {source}", path.display())]
    Close {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for log subsystem operations.
pub type LogResult<T> = Result<T, LogError>;
