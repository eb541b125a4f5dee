//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! servers.json / servers.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → environment (MCP_DOMAIN/DOMAIN, PORT)
//!     → ProxyConfig (validated, immutable)
//!
//! environment (LOG_LEVEL_*, LOG_RETENTION_*, LOG_DIR)
//!     → loader.rs (defaults for unset or empty variables)
//!     → LoggingConfig (raw strings)
//!     → logs::RegistrySettings (parsed levels and retention windows)
//! ```
//!
//! # Design Decisions
//! - Only the server names are interpreted here; launch details pass through untouched
//! - Empty environment variables count as unset
//! - Environment lookups are injectable so tests never mutate process state

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{LoggingConfig, ProxyConfig, ServerConfig};
pub use validation::ValidationError;
