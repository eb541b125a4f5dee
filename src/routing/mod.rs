//! Subdomain routing helpers.
//!
//! # Data Flow
//! ```text
//! Incoming Host header ("memory.mcp.example.com:8443")
//!     → subdomain.rs (strip port, check ".mcp.<domain>" suffix)
//!     → server name lookup against the configured set
//!     → Some("memory") or None
//! ```
//!
//! # Design Decisions
//! - Pure functions over immutable inputs; no shared state
//! - Suffix match is exact and case-sensitive
//! - A miss is a `None`, not an error

pub mod subdomain;

pub use subdomain::{validate_subdomain, ServerDirectory, SubdomainValidator, MCP_LABEL};
