//! Configuration module for async-serial-port.
//!
//! TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `ASYNC_SERIAL_CONFIG` environment variable (explicit path)
//! 2. `./async-serial.toml` (current directory)
//! 3. `async-serial.toml` in the per-user config directory
//!    (`~/.config/async-serial-port/` on Linux, `%APPDATA%\async-serial-port\config\` on Windows)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Line settings and logging can be overridden with `ASYNC_SERIAL_<KEY>`:
//! `DEVICE`, `PLATFORM`, `BAUD`, `PARITY`, `DATA_BITS`, `STOP_BITS`,
//! `CHUNK_SIZE`, `XON`, `OCTS`, `RTS`, `DTR`, `STRICT_CONFIGURE`,
//! `LOG_LEVEL`, `LOG_FORMAT`.
//!
//! # Example
//!
//! ```toml
//! [serial]
//! device = "/dev/ttyUSB0"
//! platform = "linux"
//! baud = 9600
//! octs = true
//!
//! [logging]
//! level = "debug"
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{Config, LogFormat, LoggingConfig, OutputConfig, TransportConfig};
