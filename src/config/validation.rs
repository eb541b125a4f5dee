//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A semantic problem in an otherwise well-formed config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no MCP servers configured")]
    NoServers,

    #[error("server {0}: command cannot be empty")]
    EmptyCommand(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.servers.is_empty() {
        errors.push(ValidationError::NoServers);
    }

    let mut names: Vec<&String> = config.servers.keys().collect();
    names.sort();
    for name in names {
        if config.servers[name].command.is_empty() {
            errors.push(ValidationError::EmptyCommand(name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
