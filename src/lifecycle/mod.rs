//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Channel open:
//!     LogChannel::open → StopSignal::new → subscribe → spawn retention sweeper
//!
//! Channel close:
//!     StopSignal::trigger → sweeper leaves its loop → JoinHandle awaited → file released
//!
//! Process teardown (signals.rs):
//!     SIGINT → CLI stops feeding channels → ChannelRegistry::shutdown
//! ```
//!
//! # Design Decisions
//! - Stop signals are one-shot: the first trigger wins, later ones are no-ops
//! - Long-running tasks subscribe before they are spawned, so a trigger is never missed
//! - Shutdown awaits every task it stops

pub mod shutdown;
pub mod signals;

pub use shutdown::StopSignal;
