//! Async Serial Port Library
//!
//! Event-driven serial (tty) transport for Tokio. A port is bound to a
//! [`SerialPortConfiguration`] and a runtime handle; opening it configures the
//! line through a platform command (`stty` or `mode`) and then reports all
//! stream activity to a single event handler.
//!
//! # Modules
//!
//! - `port`: configuration types, command synthesis and the transport
//! - `config`: TOML configuration with environment overrides
//! - `error`: application-level error type for the command line tool
//! - `logging`: tracing subscriber setup

pub mod config;
pub mod error;
pub mod logging;
pub mod port;

// Re-export commonly used types for convenience
pub use error::{AppError, AppResult};
pub use port::{
    synthesize, AsyncSerialPort, BaudRate, DataBits, EventHandler, EventKind, Parity,
    SerialPortConfiguration, StopBits, StreamError, TransportError, TransportEvent,
};
