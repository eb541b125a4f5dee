//! Log management for a multi-server MCP proxy.
//!
//! One system log plus one log per backend server, created on demand, each
//! with its own threshold and retention, pruned in the background. Also
//! provides the `{server}.mcp.{domain}` host check the routing layer uses.

pub mod config;
pub mod lifecycle;
pub mod logs;
pub mod observability;
pub mod routing;

pub use config::ProxyConfig;
pub use logs::{ChannelRegistry, Level, LogChannel, LogError};
pub use routing::SubdomainValidator;
