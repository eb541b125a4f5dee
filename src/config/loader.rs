//! Configuration loading from disk and the environment.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::{LoggingConfig, ProxyConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Toml(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read config file: {}", e),
            ConfigError::Json(e) => write!(f, "failed to parse config file: {}", e),
            ConfigError::Toml(e) => write!(f, "failed to parse config file: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "invalid configuration: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Json(e) => Some(e),
            ConfigError::Toml(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

/// Load, validate and apply environment overrides to a config file.
///
/// Files ending in `.toml` are parsed as TOML, everything else as JSON.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;

    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let mut config: ProxyConfig = if is_toml {
        toml::from_str(&content).map_err(ConfigError::Toml)?
    } else {
        serde_json::from_str(&content).map_err(ConfigError::Json)?
    };

    validate_config(&config).map_err(ConfigError::Validation)?;
    apply_environment(&mut config);

    tracing::info!(
        path = %path.display(),
        servers = config.servers.len(),
        domain = %config.domain,
        "Configuration loaded"
    );

    Ok(config)
}

/// Set domain and port from `MCP_DOMAIN`/`DOMAIN` and `PORT`.
pub fn apply_environment(config: &mut ProxyConfig) {
    apply_environment_with(config, env_var);
}

/// Same as [`apply_environment`] with an injectable variable lookup.
pub fn apply_environment_with<F>(config: &mut ProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    config.domain = lookup("MCP_DOMAIN")
        .or_else(|| lookup("DOMAIN"))
        .unwrap_or_else(|| "localhost".to_string());
    config.port = lookup("PORT").unwrap_or_else(|| "8080".to_string());
}

/// Read logging settings from the environment, with defaults for anything unset.
pub fn logging_from_env() -> LoggingConfig {
    logging_from_lookup(env_var)
}

/// Same as [`logging_from_env`] with an injectable variable lookup.
pub fn logging_from_lookup<F>(lookup: F) -> LoggingConfig
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = LoggingConfig::default();
    LoggingConfig {
        level_system: lookup("LOG_LEVEL_SYSTEM").unwrap_or(defaults.level_system),
        level_mcp: lookup("LOG_LEVEL_MCP").unwrap_or(defaults.level_mcp),
        retention_system: lookup("LOG_RETENTION_SYSTEM").unwrap_or(defaults.retention_system),
        retention_mcp: lookup("LOG_RETENTION_MCP").unwrap_or(defaults.retention_mcp),
        log_dir: lookup("LOG_DIR").map(PathBuf::from).unwrap_or(defaults.log_dir),
        dated_files: lookup("LOG_DATED_FILES")
            .map(|v| is_truthy(&v))
            .unwrap_or(defaults.dated_files),
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Empty variables count as unset.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
