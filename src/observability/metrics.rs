//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mcp_log_lines_total` (counter): lines written, by channel kind and level
//! - `mcp_log_write_failures_total` (counter): failed writes, by sink
//! - `mcp_log_files_pruned_total` (counter): files removed by retention sweeps
//! - `mcp_log_channels_active` (gauge): open per-server channels

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::logs::{ChannelKind, Level};

pub fn record_line_written(kind: ChannelKind, level: Level) {
    ::metrics::counter!(
        "mcp_log_lines_total",
        "channel" => kind.as_str(),
        "level" => level.as_str()
    )
    .increment(1);
}

pub fn record_write_failure(sink: &'static str) {
    ::metrics::counter!("mcp_log_write_failures_total", "sink" => sink).increment(1);
}

pub fn record_pruned(count: usize) {
    if count > 0 {
        ::metrics::counter!("mcp_log_files_pruned_total").increment(count as u64);
    }
}

pub fn record_active_channels(count: usize) {
    ::metrics::gauge!("mcp_log_channels_active").set(count as f64);
}

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics exporter"),
    }
}
