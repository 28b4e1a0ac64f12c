//! Configuration error types for the config module.

use std::path::PathBuf;
use thiserror::Error;

use crate::port::InvalidValue;

/// Errors that can occur while loading, overriding or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read configuration file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or holds an illegal line setting
    #[error("Failed to parse configuration file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Failed to serialize config
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Failed to write config file
    #[error("Failed to write configuration file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An override names a value outside the legal set
    #[error("Invalid value in '{var}': {source}")]
    InvalidValue {
        var: String,
        #[source]
        source: InvalidValue,
    },

    /// Environment variable could not be parsed at all
    #[error("Failed to parse environment variable '{var}': {message}")]
    EnvParse { var: String, message: String },

    /// No device path configured
    #[error("No serial device configured; set `serial.device` or ASYNC_SERIAL_DEVICE")]
    MissingDevice,

    /// Read chunk size beyond what a stream will allocate
    #[error("Chunk size {size} exceeds the maximum of {max} bytes")]
    ChunkTooLarge { size: usize, max: usize },
}

impl ConfigError {
    /// Create an env parse error
    pub fn env_parse<V: Into<String>, M: Into<String>>(var: V, message: M) -> Self {
        Self::EnvParse {
            var: var.into(),
            message: message.into(),
        }
    }

    /// Wrap an illegal value coming from `var`
    pub fn invalid_value(var: impl Into<String>, source: InvalidValue) -> Self {
        Self::InvalidValue {
            var: var.into(),
            source,
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
