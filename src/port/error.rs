//! Port-specific error types.
//!
//! Synchronous failures are returned as [`TransportError`] from the call that
//! detects them. Failures of the running stream are never returned; they are
//! delivered to the event handler as [`StreamError`].

use std::io;
use thiserror::Error;

/// Errors returned by [`AsyncSerialPort`](super::AsyncSerialPort) operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Attempted to open a port that's already open.
    #[error("Device already opened")]
    AlreadyOpen,

    /// Attempted to use a port that's not open.
    #[error("Port is not open")]
    NotOpen,

    /// The device path does not exist or cannot be read by this process.
    #[error("Device [{0}] is not readable")]
    DeviceUnreadable(String),

    /// The platform tag matches neither the POSIX nor the Windows dialect.
    #[error("Unknown platform {0}")]
    UnsupportedPlatform(String),

    /// The device passed the readability check but could not be opened for read/write.
    #[error("Can not open resource [{device}]: {source}")]
    OpenFailed {
        device: String,
        #[source]
        source: io::Error,
    },

    /// The line configuration command failed and strict configuration is enabled.
    #[error("Configuration command `{command}` failed: {source}")]
    ConfigureFailed {
        command: String,
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    /// Create a DeviceUnreadable error from a device path.
    pub fn device_unreadable(device: impl Into<String>) -> Self {
        Self::DeviceUnreadable(device.into())
    }

    /// Create an UnsupportedPlatform error from the offending tag.
    pub fn unsupported_platform(platform: impl Into<String>) -> Self {
        Self::UnsupportedPlatform(platform.into())
    }

    /// Create an OpenFailed error from a device path and the underlying cause.
    pub fn open_failed(device: impl Into<String>, source: io::Error) -> Self {
        Self::OpenFailed {
            device: device.into(),
            source,
        }
    }
}

/// Errors raised by a running [`DuplexStream`](super::DuplexStream).
#[derive(Debug, Error)]
pub enum StreamError {
    /// Reading from the device failed. The stream closes afterwards.
    #[error("Unable to read from stream: {0}")]
    Read(#[source] io::Error),

    /// Writing to the device failed. The stream closes afterwards.
    #[error("Unable to write to stream: {0}")]
    Write(#[source] io::Error),
}

impl StreamError {
    /// The underlying I/O error.
    pub fn io_error(&self) -> &io::Error {
        match self {
            Self::Read(e) | Self::Write(e) => e,
        }
    }
}
