//! # Utility Modules
//!
//! Supporting utilities shared by the codec and the version gate.
//!
//! ## Components
//! - **Logging**: structured logging configuration
//! - **Metrics**: per-gate observability counters

pub mod logging;
pub mod metrics;

pub use metrics::{GateMetrics, GateSnapshot};
