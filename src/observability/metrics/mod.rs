//! # Metrics Module
//!
//! Prometheus metrics for monitoring sync runs.
//!
//! ## Sub-modules
//!
//! - `registry` - Metrics registry setup, registration and exposition
//! - `sync_metrics` - Sync run metrics (runs, fatal errors, operations, item failures)

pub mod registry;
pub mod sync_metrics;

pub use registry::*;
pub use sync_metrics::*;
