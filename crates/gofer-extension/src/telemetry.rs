//! Logging initialization.

use crate::config::LogFormat;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Invalid log level '{level}': {reason}")]
    InvalidLevel { level: String, reason: String },
    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `level` when it is set.
pub fn init_logging(level: &str, format: LogFormat) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).map_err(|e| TelemetryError::InvalidLevel {
            level: level.to_string(),
            reason: e.to_string(),
        })?,
    };

    let result = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };

    result.map_err(|e| TelemetryError::Init(e.to_string()))
}
