//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use serde::{Deserialize, Serialize};

use crate::port::{SerialPortConfiguration, DEFAULT_WRITE_SOFT_LIMIT};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial line settings
    pub serial: SerialPortConfiguration,
    /// Transport behavior
    pub transport: TransportConfig,
    /// Monitor output settings
    pub output: OutputConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Transport behavior section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Fail to open when the stty/mode command fails
    pub strict_configure: bool,
    /// Pending-write size in bytes at which writes report backpressure
    pub write_soft_limit: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            strict_configure: false,
            write_soft_limit: DEFAULT_WRITE_SOFT_LIMIT,
        }
    }
}

/// Monitor output section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Print events as JSON lines instead of raw data
    pub json: bool,
    /// Prefix output with local timestamps
    pub timestamps: bool,
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{BaudRate, Parity};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.serial.baud, BaudRate::Baud115200);
        assert_eq!(config.transport.write_soft_limit, 65536);
        assert_eq!(config.logging.level, "info");
        assert!(!config.output.json);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[serial]"));
        assert!(toml_str.contains("[logging]"));
        assert!(toml_str.contains("baud = 115200"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [serial]
            device = "/dev/ttyACM0"
            platform = "linux"
            baud = 9600
            parity = "even"
            octs = true

            [logging]
            format = "compact"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.serial.device, "/dev/ttyACM0");
        assert_eq!(config.serial.baud, BaudRate::Baud9600);
        assert_eq!(config.serial.parity, Parity::Even);
        assert!(config.serial.octs);
        assert_eq!(config.logging.format, LogFormat::Compact);
        // Defaults should still work
        assert_eq!(config.serial.chunk_size.get(), 256);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_baud_is_rejected() {
        let toml_str = r#"
            [serial]
            baud = 300
        "#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }
}
