//! Prometheus metrics and structured logging for Moneta.
//!
//! - operation outcome and refusal counters, pause gauge
//! - structured logging with tracing (JSON in production)
//! - end-of-session statistics summary

pub mod error;
pub mod logging;
pub mod metrics;
pub mod session_stats;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
pub use session_stats::{OperationStats, SessionStatsReporter};
