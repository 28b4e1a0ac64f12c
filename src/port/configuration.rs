//! Line configuration for a serial device.
//!
//! The enumerations only admit the values the configuration commands can
//! express, so a [`SerialPortConfiguration`] is valid by construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use thiserror::Error;

use super::command::Platform;

/// Default read chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// Largest read buffer a stream allocates, whatever `chunk_size` says.
pub const MAX_CHUNK_SIZE: usize = 1 << 20;

/// A configuration value outside the legal set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {field}: {value}")]
pub struct InvalidValue {
    /// Which setting was rejected.
    pub field: &'static str,
    /// The rejected input, as given.
    pub value: String,
}

impl InvalidValue {
    fn new(field: &'static str, value: impl fmt::Display) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

/// Standard baud rates accepted by both command dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum BaudRate {
    Baud9600,
    Baud14400,
    Baud19200,
    Baud38400,
    Baud56000,
    Baud57600,
    Baud115200,
    Baud128000,
    Baud230400,
    Baud256000,
}

impl BaudRate {
    /// Every legal rate, slowest first.
    pub const ALL: [BaudRate; 10] = [
        BaudRate::Baud9600,
        BaudRate::Baud14400,
        BaudRate::Baud19200,
        BaudRate::Baud38400,
        BaudRate::Baud56000,
        BaudRate::Baud57600,
        BaudRate::Baud115200,
        BaudRate::Baud128000,
        BaudRate::Baud230400,
        BaudRate::Baud256000,
    ];

    /// Bits per second.
    pub const fn value(self) -> u32 {
        match self {
            BaudRate::Baud9600 => 9600,
            BaudRate::Baud14400 => 14400,
            BaudRate::Baud19200 => 19200,
            BaudRate::Baud38400 => 38400,
            BaudRate::Baud56000 => 56000,
            BaudRate::Baud57600 => 57600,
            BaudRate::Baud115200 => 115200,
            BaudRate::Baud128000 => 128000,
            BaudRate::Baud230400 => 230400,
            BaudRate::Baud256000 => 256000,
        }
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = InvalidValue;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        BaudRate::ALL
            .into_iter()
            .find(|rate| rate.value() == value)
            .ok_or_else(|| InvalidValue::new("baud rate", value))
    }
}

impl From<BaudRate> for u32 {
    fn from(rate: BaudRate) -> Self {
        rate.value()
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Even,
    Odd,
    Mark,
    Space,
}

impl Parity {
    /// Every parity mode.
    pub const ALL: [Parity; 5] = [
        Parity::None,
        Parity::Even,
        Parity::Odd,
        Parity::Mark,
        Parity::Space,
    ];

    /// Single-letter code used by `mode PARITY=`.
    pub const fn code(self) -> char {
        match self {
            Parity::None => 'n',
            Parity::Even => 'e',
            Parity::Odd => 'o',
            Parity::Mark => 'm',
            Parity::Space => 's',
        }
    }
}

impl TryFrom<char> for Parity {
    type Error = InvalidValue;

    fn try_from(code: char) -> Result<Self, Self::Error> {
        let lower = code.to_ascii_lowercase();
        Parity::ALL
            .into_iter()
            .find(|parity| parity.code() == lower)
            .ok_or_else(|| InvalidValue::new("parity", code))
    }
}

impl FromStr for Parity {
    type Err = InvalidValue;

    /// Accepts either the full name (`even`) or the command code (`e`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Parity::None),
            "even" => Ok(Parity::Even),
            "odd" => Ok(Parity::Odd),
            "mark" => Ok(Parity::Mark),
            "space" => Ok(Parity::Space),
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(code), None) => Parity::try_from(code),
                    _ => Err(InvalidValue::new("parity", s)),
                }
            }
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Parity::None => "none",
            Parity::Even => "even",
            Parity::Odd => "odd",
            Parity::Mark => "mark",
            Parity::Space => "space",
        };
        f.write_str(name)
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DataBits {
    Eight,
    Nine,
}

impl DataBits {
    pub const fn value(self) -> u8 {
        match self {
            DataBits::Eight => 8,
            DataBits::Nine => 9,
        }
    }
}

impl TryFrom<u8> for DataBits {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            8 => Ok(DataBits::Eight),
            9 => Ok(DataBits::Nine),
            other => Err(InvalidValue::new("data bits", other)),
        }
    }
}

impl From<DataBits> for u8 {
    fn from(bits: DataBits) -> Self {
        bits.value()
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StopBits {
    One,
    Two,
}

impl StopBits {
    pub const fn value(self) -> u8 {
        match self {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}

impl TryFrom<u8> for StopBits {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            other => Err(InvalidValue::new("stop bits", other)),
        }
    }
}

impl From<StopBits> for u8 {
    fn from(bits: StopBits) -> Self {
        bits.value()
    }
}

/// Everything needed to configure and open one serial device.
///
/// A transport borrows the configuration and reads it on every `open()`, so
/// changes made between open/close cycles take effect on the next open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialPortConfiguration {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM3`.
    pub device: String,

    /// Platform tag selecting the command dialect (`linux...` or `windows...`).
    pub platform: String,

    pub baud: BaudRate,
    pub parity: Parity,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,

    /// Software flow control (XON/XOFF).
    pub xon: bool,
    /// Output CTS handshaking; maps to `crtscts` on POSIX.
    pub octs: bool,
    pub rts: bool,
    pub dtr: bool,

    /// Maximum number of bytes read from the device at once.
    pub chunk_size: NonZeroUsize,
}

impl SerialPortConfiguration {
    /// Configuration for `device` with 115200 8N1 and no flow control.
    pub fn new(device: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            platform: platform.into(),
            ..Default::default()
        }
    }

    /// Same as [`new`](Self::new) with the platform tag of the host OS.
    pub fn for_host(device: impl Into<String>) -> Self {
        Self::new(device, Platform::host_tag())
    }

    pub fn with_baud(mut self, baud: BaudRate) -> Self {
        self.baud = baud;
        self
    }

    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub fn with_data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    /// Set the four flow-control flags at once.
    pub fn with_flow_control(mut self, xon: bool, octs: bool, rts: bool, dtr: bool) -> Self {
        self.xon = xon;
        self.octs = octs;
        self.rts = rts;
        self.dtr = dtr;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: NonZeroUsize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

impl Default for SerialPortConfiguration {
    fn default() -> Self {
        Self {
            device: String::new(),
            platform: Platform::host_tag().to_string(),
            baud: BaudRate::Baud115200,
            parity: Parity::None,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            xon: false,
            octs: false,
            rts: false,
            dtr: false,
            chunk_size: NonZeroUsize::new(DEFAULT_CHUNK_SIZE).unwrap_or(NonZeroUsize::MIN),
        }
    }
}
