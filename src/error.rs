use std::fmt;

use crate::config::ConfigError;
use crate::port::TransportError;

/// A specialized `Result` type for the command line application.
pub type AppResult<T> = Result<T, AppError>;

/// Unified application error type.
///
/// Library calls keep their own error types; this only gathers them for the
/// binary so `main` can report one message and pick an exit code.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Transport(TransportError),
    Serial(serialport::Error),
    Io(std::io::Error),
    Logging(String),
}

impl AppError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Transport(_) => 3,
            Self::Serial(_) | Self::Io(_) => 4,
            Self::Logging(_) => 5,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Transport(e) => write!(f, "Serial port error: {e}"),
            Self::Serial(e) => write!(f, "Unable to enumerate serial ports: {e}"),
            Self::Io(e) => write!(f, "An I/O error occurred: {e}"),
            Self::Logging(details) => write!(f, "Unable to initialize logging: {details}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Transport(e) => Some(e),
            Self::Serial(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Logging(_) => None,
        }
    }
}

// Implement `From` conversions to allow the `?` operator to work seamlessly.
impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<TransportError> for AppError {
    fn from(err: TransportError) -> Self {
        AppError::Transport(err)
    }
}

impl From<serialport::Error> for AppError {
    fn from(err: serialport::Error) -> Self {
        AppError::Serial(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err)
    }
}
