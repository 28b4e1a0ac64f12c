//! Tracing subscriber setup for the binary.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{AppError, AppResult};

/// Build the filter: `RUST_LOG` wins over the configured level.
fn filter(config: &LoggingConfig) -> AppResult<EnvFilter> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.is_empty() => EnvFilter::try_new(directives),
        _ => EnvFilter::try_new(&config.level),
    }
    .map_err(|e| AppError::Logging(e.to_string()))
}

/// Install the global subscriber. Logs go to stderr so stdout stays data-only.
pub fn init(config: &LoggingConfig) -> AppResult<()> {
    let filter = filter(config)?;
    let registry = tracing_subscriber::registry();

    let result = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr).with_filter(filter))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr).with_filter(filter))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr).with_filter(filter))
            .try_init(),
    };

    result.map_err(|e| AppError::Logging(e.to_string()))
}
