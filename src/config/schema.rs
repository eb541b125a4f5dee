//! Configuration schema definitions.
//!
//! The server list comes from the proxy's JSON config file (`mcpServers`).
//! Domain, port and logging settings come from the environment.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ProxyConfig {
    /// Backend MCP servers keyed by name. The name is also the subdomain label.
    #[serde(rename = "mcpServers", default)]
    pub servers: HashMap<String, ServerConfig>,

    /// Base domain for subdomain routing (`MCP_DOMAIN` or `DOMAIN`).
    #[serde(skip, default = "default_domain")]
    pub domain: String,

    /// HTTP listen port (`PORT`).
    #[serde(skip, default = "default_port")]
    pub port: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            servers: HashMap::new(),
            domain: default_domain(),
            port: default_port(),
        }
    }
}

impl ProxyConfig {
    /// Names of all configured servers, sorted.
    pub fn server_names(&self) -> BTreeSet<String> {
        self.servers.keys().cloned().collect()
    }
}

fn default_domain() -> String {
    "localhost".to_string()
}

fn default_port() -> String {
    "8080".to_string()
}

/// How to launch one backend MCP server.
///
/// Only the name matters to this crate; command, args and env are carried
/// for the process supervisor.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
pub struct ServerConfig {
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// Raw logging settings, before level and retention parsing.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Threshold for the system channel (`LOG_LEVEL_SYSTEM`).
    pub level_system: String,

    /// Threshold for per-server channels (`LOG_LEVEL_MCP`).
    pub level_mcp: String,

    /// Retention for the system log (`LOG_RETENTION_SYSTEM`), e.g. "24h" or "7d".
    pub retention_system: String,

    /// Retention for per-server logs (`LOG_RETENTION_MCP`).
    pub retention_mcp: String,

    /// Directory holding every log file (`LOG_DIR`).
    pub log_dir: PathBuf,

    /// Append the open date to file names, `mcp-memory-2024-03-09.log`
    /// (`LOG_DATED_FILES`).
    pub dated_files: bool,
}

impl LoggingConfig {
    pub const DEFAULT_LOG_DIR: &'static str = "/app/logs";
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level_system: "INFO".to_string(),
            level_mcp: "DEBUG".to_string(),
            retention_system: "24h".to_string(),
            retention_mcp: "12h".to_string(),
            log_dir: PathBuf::from(Self::DEFAULT_LOG_DIR),
            dated_files: false,
        }
    }
}
