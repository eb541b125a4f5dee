//! OS signal handling.

/// Wait for Ctrl-C (SIGINT).
///
/// If the handler cannot be installed the future never resolves, so callers
/// keep running until their other exit condition (EOF, completion) fires.
pub async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Interrupt received, shutting down"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    }
}
