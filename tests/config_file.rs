//! Loading port settings from TOML files and environment overrides.

use std::io::Write;

use async_serial_port::config::{ConfigError, ConfigLoader, LogFormat};
use async_serial_port::port::{synthesize, BaudRate, DataBits, Parity, StopBits};
use pretty_assertions::assert_eq;
use serial_test::serial;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write config");
    file
}

#[test]
#[serial]
fn test_partial_file_keeps_defaults() {
    let file = write_config(
        r#"
[serial]
device = "/dev/ttyUSB3"
platform = "linux"
baud = 9600
octs = true

[logging]
format = "json"
"#,
    );

    let loader = ConfigLoader::load_from(file.path()).unwrap();
    loader.validate().unwrap();
    let config = loader.config();

    assert_eq!(config.serial.device, "/dev/ttyUSB3");
    assert_eq!(config.serial.baud, BaudRate::Baud9600);
    assert_eq!(config.serial.parity, Parity::None);
    assert_eq!(config.serial.data_bits, DataBits::Eight);
    assert_eq!(config.serial.stop_bits, StopBits::One);
    assert_eq!(config.serial.chunk_size.get(), 256);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.logging.level, "info");

    assert_eq!(
        synthesize(&config.serial.platform, &config.serial).unwrap(),
        "/bin/stty -F /dev/ttyUSB3 9600 raw -echo -echoe -echok -clocal cs8 crtscts"
    );
}

#[test]
#[serial]
fn test_windows_file_settings() {
    let file = write_config(
        r#"
[serial]
device = "COM5"
platform = "Windows_NT"
parity = "mark"
data_bits = 9
stop_bits = 2
dtr = true
"#,
    );

    let loader = ConfigLoader::load_from(file.path()).unwrap();
    let serial = &loader.config().serial;

    assert_eq!(
        synthesize(&serial.platform, serial).unwrap(),
        "mode COM5 BAUD=115200 PARITY=m DATA=9 STOP=2 xon=off octs=off rts=off dtr=on"
    );
}

#[test]
#[serial]
fn test_environment_beats_file() {
    let file = write_config("[serial]\ndevice = \"/dev/ttyS0\"\nbaud = 9600\n");
    std::env::set_var("ASYNC_SERIAL_BAUD", "230400");
    std::env::set_var("ASYNC_SERIAL_LOG_FORMAT", "compact");

    let result = ConfigLoader::load_from(file.path());

    std::env::remove_var("ASYNC_SERIAL_BAUD");
    std::env::remove_var("ASYNC_SERIAL_LOG_FORMAT");

    let config = result.unwrap().into_config();
    assert_eq!(config.serial.device, "/dev/ttyS0");
    assert_eq!(config.serial.baud, BaudRate::Baud230400);
    assert_eq!(config.logging.format, LogFormat::Compact);
}

#[test]
#[serial]
fn test_illegal_values_are_rejected() {
    for contents in [
        "[serial]\nbaud = 4800\n",
        "[serial]\nparity = \"sometimes\"\n",
        "[serial]\ndata_bits = 7\n",
        "[serial]\nchunk_size = 0\n",
    ] {
        let file = write_config(contents);
        let err = ConfigLoader::load_from(file.path()).unwrap_err();
        assert!(
            matches!(err, ConfigError::Parse { .. }),
            "{contents:?} gave {err:?}"
        );
    }
}

#[test]
#[serial]
fn test_missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConfigLoader::load_from(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}
