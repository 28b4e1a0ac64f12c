//! Configuration loader with file resolution and environment override support.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use directories::ProjectDirs;

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, LogFormat};
use crate::port::{BaudRate, DataBits, InvalidValue, Parity, StopBits, MAX_CHUNK_SIZE};

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "ASYNC_SERIAL";

/// Config file name
const CONFIG_FILE_NAME: &str = "async-serial.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "ASYNC_SERIAL_CONFIG";

/// Application name used for the per-user config directory
const APP_NAME: &str = "async-serial-port";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `ASYNC_SERIAL_CONFIG` environment variable (explicit path)
    /// 2. `./async-serial.toml` (current directory)
    /// 3. `async-serial.toml` in the per-user config directory
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables override any file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };

        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file, environment still applies).
    pub fn with_defaults() -> ConfigResult<Self> {
        let mut config = Config::default();
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: None,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a mutable reference to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Check the settings the transport cannot open without.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.config.serial.device.trim().is_empty() {
            return Err(ConfigError::MissingDevice);
        }
        let size = self.config.serial.chunk_size.get();
        if size > MAX_CHUNK_SIZE {
            return Err(ConfigError::ChunkTooLarge {
                size,
                max: MAX_CHUNK_SIZE,
            });
        }
        Ok(())
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    get_default_config_path().filter(|path| path.exists())
}

/// Get the per-user config directory for this application.
pub fn get_default_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn env_var(key: &str) -> (String, Option<String>) {
    let name = format!("{}_{}", ENV_PREFIX, key);
    let value = std::env::var(&name).ok();
    (name, value)
}

fn parse_env<T: FromStr>(name: &str, value: &str, what: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse(name, format!("Invalid {what}")))
}

fn parse_flag(name: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(ConfigError::env_parse(name, "Expected a boolean")),
    }
}

fn checked<T>(name: &str, result: Result<T, InvalidValue>) -> ConfigResult<T> {
    result.map_err(|e| ConfigError::invalid_value(name, e))
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern `ASYNC_SERIAL_<KEY>`, e.g.
/// `ASYNC_SERIAL_DEVICE=/dev/ttyUSB1` or `ASYNC_SERIAL_BAUD=9600`.
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    let serial = &mut config.serial;

    if let (_, Some(val)) = env_var("DEVICE") {
        serial.device = val;
    }
    if let (_, Some(val)) = env_var("PLATFORM") {
        serial.platform = val;
    }
    if let (name, Some(val)) = env_var("BAUD") {
        let rate: u32 = parse_env(&name, &val, "baud rate")?;
        serial.baud = checked(&name, BaudRate::try_from(rate))?;
    }
    if let (name, Some(val)) = env_var("PARITY") {
        serial.parity = checked(&name, val.trim().parse::<Parity>())?;
    }
    if let (name, Some(val)) = env_var("DATA_BITS") {
        let bits: u8 = parse_env(&name, &val, "data bits")?;
        serial.data_bits = checked(&name, DataBits::try_from(bits))?;
    }
    if let (name, Some(val)) = env_var("STOP_BITS") {
        let bits: u8 = parse_env(&name, &val, "stop bits")?;
        serial.stop_bits = checked(&name, StopBits::try_from(bits))?;
    }
    if let (name, Some(val)) = env_var("CHUNK_SIZE") {
        serial.chunk_size = parse_env::<NonZeroUsize>(&name, &val, "chunk size")?;
    }
    for (key, flag) in [
        ("XON", &mut serial.xon),
        ("OCTS", &mut serial.octs),
        ("RTS", &mut serial.rts),
        ("DTR", &mut serial.dtr),
    ] {
        if let (name, Some(val)) = env_var(key) {
            *flag = parse_flag(&name, &val)?;
        }
    }

    if let (name, Some(val)) = env_var("STRICT_CONFIGURE") {
        config.transport.strict_configure = parse_flag(&name, &val)?;
    }

    if let (_, Some(val)) = env_var("LOG_LEVEL") {
        config.logging.level = val;
    }
    if let (name, Some(val)) = env_var("LOG_FORMAT") {
        config.logging.format = val
            .parse::<LogFormat>()
            .map_err(|message| ConfigError::env_parse(name, message))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_default_loader() {
        let loader = ConfigLoader::with_defaults().unwrap();
        assert_eq!(loader.config().serial.baud, BaudRate::Baud115200);
        assert!(matches!(loader.validate(), Err(ConfigError::MissingDevice)));
    }

    #[test]
    #[serial]
    fn test_env_override() {
        env::set_var("ASYNC_SERIAL_DEVICE", "/dev/ttyUSB7");
        env::set_var("ASYNC_SERIAL_BAUD", "57600");
        env::set_var("ASYNC_SERIAL_PARITY", "odd");
        env::set_var("ASYNC_SERIAL_RTS", "on");

        let loader = ConfigLoader::with_defaults().unwrap();
        let serial = &loader.config().serial;
        assert_eq!(serial.device, "/dev/ttyUSB7");
        assert_eq!(serial.baud, BaudRate::Baud57600);
        assert_eq!(serial.parity, Parity::Odd);
        assert!(serial.rts);
        assert!(loader.validate().is_ok());

        env::remove_var("ASYNC_SERIAL_DEVICE");
        env::remove_var("ASYNC_SERIAL_BAUD");
        env::remove_var("ASYNC_SERIAL_PARITY");
        env::remove_var("ASYNC_SERIAL_RTS");
    }

    #[test]
    #[serial]
    fn test_illegal_env_value() {
        env::set_var("ASYNC_SERIAL_STOP_BITS", "3");

        let err = ConfigLoader::with_defaults().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert!(err.to_string().contains("ASYNC_SERIAL_STOP_BITS"));

        env::remove_var("ASYNC_SERIAL_STOP_BITS");
    }

    #[test]
    #[serial]
    fn test_unparsable_env_value() {
        env::set_var("ASYNC_SERIAL_CHUNK_SIZE", "0");

        let err = ConfigLoader::with_defaults().unwrap_err();
        assert!(matches!(err, ConfigError::EnvParse { .. }));

        env::remove_var("ASYNC_SERIAL_CHUNK_SIZE");
    }

    #[test]
    #[serial]
    fn test_oversized_chunk_size_fails_validation() {
        env::set_var("ASYNC_SERIAL_DEVICE", "/dev/ttyUSB0");
        env::set_var("ASYNC_SERIAL_CHUNK_SIZE", (MAX_CHUNK_SIZE + 1).to_string());

        let loader = ConfigLoader::with_defaults().unwrap();
        assert!(matches!(
            loader.validate(),
            Err(ConfigError::ChunkTooLarge { size, max })
                if size == MAX_CHUNK_SIZE + 1 && max == MAX_CHUNK_SIZE
        ));

        env::set_var("ASYNC_SERIAL_CHUNK_SIZE", MAX_CHUNK_SIZE.to_string());
        assert!(ConfigLoader::with_defaults().unwrap().validate().is_ok());

        env::remove_var("ASYNC_SERIAL_DEVICE");
        env::remove_var("ASYNC_SERIAL_CHUNK_SIZE");
    }

    #[test]
    #[serial]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut loader = ConfigLoader::with_defaults().unwrap();
        loader.config_mut().serial.device = "COM4".to_string();
        loader.config_mut().serial.platform = "windows".to_string();
        loader.save_to(&path).unwrap();

        let reloaded = ConfigLoader::load_from(&path).unwrap();
        assert_eq!(reloaded.config(), loader.config());
        assert_eq!(reloaded.config_path.as_deref(), Some(path.as_path()));
    }

    #[test]
    #[serial]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[serial]\nbaud = 42\n").unwrap();

        let err = ConfigLoader::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }
}
