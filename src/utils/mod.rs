//! # Utility Modules
//!
//! Supporting utilities shared by the library and the `protodec` binary.
//!
//! ## Components
//! - **Logging**: `tracing-subscriber` setup driven by [`LoggingConfig`](crate::config::LoggingConfig)
//! - **Metrics**: Thread-safe codec counters

pub mod logging;
pub mod metrics;

pub use metrics::{global_metrics, CodecMetrics, MetricsSnapshot, Timer};
