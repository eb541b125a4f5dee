//! Per-server log channels.
//!
//! # Data Flow
//! ```text
//! Writes:
//!     caller (raw id, e.g. "memory-7f3a")
//!     → registry.rs (derive key "memory", find or create channel)
//!     → channel.rs (threshold check, lock, format)
//!     → mcp-memory.log + stdout
//!
//! Retention:
//!     hourly tick (retention.rs)
//!     → channel lock
//!     → scan directory for files owned by the channel's stem
//!     → delete those older than now - retention
//! ```
//!
//! # Design Decisions
//! - One file per server name; session suffixes never fragment storage
//! - Channels live until process shutdown, then close exactly once
//! - Logging never fails the caller; only construction and close return errors
//! - A process-wide accessor exists (global.rs) but nothing in the core depends on it

pub mod channel;
pub mod duration;
pub mod error;
pub mod global;
pub mod level;
pub mod registry;
pub mod retention;

pub use channel::{dated_path, ChannelKind, ChannelOptions, LogChannel, PRUNE_INTERVAL};
pub use duration::{parse_duration, parse_retention, DurationError, RetentionWindow};
pub use error::{LogError, LogResult};
pub use level::Level;
pub use registry::{ChannelIdentity, ChannelRegistry, RegistrySettings};
