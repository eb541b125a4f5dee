//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Log channels and the registry produce:
//!     → logging.rs (process diagnostics via tracing, on stderr)
//!     → metrics.rs (lines written, write failures, files pruned, open channels)
//!
//! Consumers:
//!     → Operator terminal / container log driver (stderr)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Channel lines are product output, not diagnostics; they never go through tracing
//! - Diagnostics go to stderr so they never mix with channel lines on stdout
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
