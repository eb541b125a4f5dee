//! Process-wide registry accessor.
//!
//! A thin convenience over [`ChannelRegistry`] for call sites that cannot
//! have a registry injected. The registry is built from the environment on
//! first access and never rebuilt: if that fails, the process keeps a
//! degraded registry holding whatever settings parsed, with no system
//! channel, and system logging becomes a silent no-op.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::runtime::Handle;

use super::channel::LogChannel;
use super::error::{LogError, LogResult};
use super::level::Level;
use super::registry::{ChannelRegistry, RegistrySettings};
use crate::config::loader::logging_from_env;

static REGISTRY: OnceLock<ChannelRegistry> = OnceLock::new();
static SHUT_DOWN: AtomicBool = AtomicBool::new(false);

/// The process-wide registry, initialized on first call.
///
/// Call this from inside a Tokio runtime the first time so retention
/// sweepers have somewhere to run.
pub fn registry() -> &'static ChannelRegistry {
    REGISTRY.get_or_init(initialize)
}

fn initialize() -> ChannelRegistry {
    let runtime = Handle::try_current().ok();

    let (settings, error) = RegistrySettings::from_config_partial(&logging_from_env());
    if let Some(e) = error {
        report_failure(&e);
        return ChannelRegistry::degraded(settings, runtime);
    }

    match ChannelRegistry::with_runtime(settings.clone(), runtime.clone()) {
        Ok(registry) => registry,
        Err(e) => {
            report_failure(&e);
            ChannelRegistry::degraded(settings, runtime)
        }
    }
}

fn report_failure(error: &LogError) {
    tracing::error!(error = %error, "Failed to initialize log registry, system logging disabled");
    eprintln!("Failed to initialize logger manager: {}", error);
}

/// The system channel, or `None` if logging is unavailable.
pub fn system() -> Option<Arc<LogChannel>> {
    registry().system().cloned()
}

/// Write to the system channel; does nothing if it is unavailable.
pub fn system_log(level: Level, message: impl fmt::Display) {
    if let Some(channel) = registry().system() {
        channel.log(level, message);
    }
}

/// Resolve a server channel through the process-wide registry.
pub fn server(raw_id: &str) -> LogResult<Arc<LogChannel>> {
    registry().resolve(raw_id)
}

/// Close the process-wide registry. Only the first call does any work, and
/// only if the registry was ever initialized.
pub async fn shutdown() -> LogResult<()> {
    if SHUT_DOWN.swap(true, Ordering::SeqCst) {
        return Ok(());
    }
    match REGISTRY.get() {
        Some(registry) => registry.shutdown().await,
        None => Ok(()),
    }
}
