//! # Utility Modules
//!
//! Supporting utilities shared by the codec and protocol layers.
//!
//! ## Components
//! - **Metrics**: Thread-safe counters for encode/decode throughput and
//!   failures, plus a drop-guard timer

pub mod metrics;

pub use metrics::{global_metrics, Metrics, MetricsSnapshot, Timer};
