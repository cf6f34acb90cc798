//! Telemetry error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Logging initialization failed: {0}")]
    LoggingInit(String),

    #[error("Metrics error: {0}")]
    Metrics(String),

    #[error("Stats serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type TelemetryResult<T> = Result<T, TelemetryError>;
