use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log level/filter '{value}': unable to build EnvFilter")]
    EnvFilter { value: String, source: ParseError },

    #[error("telemetry error: {0}")]
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|source| {
            TelemetryError::EnvFilter {
                value: config.log_level.clone(),
                source,
            }
        })?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(TelemetryError::Subscriber)
}
