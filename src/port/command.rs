//! Line configuration commands.
//!
//! The line is configured out-of-band by running the platform's own tool
//! (`stty` on POSIX, `mode` on Windows) before the device is opened.
//! [`synthesize`] builds that command; a [`CommandExecutor`] runs it.
//! Commands are split on whitespace, so device paths may not contain spaces.

use std::fmt;
use std::io;
use std::process::{Command, Stdio};

use tracing::debug;

use super::configuration::SerialPortConfiguration;
use super::error::TransportError;

/// Path of the `stty` binary used by the POSIX dialect.
pub const STTY_PATH: &str = "/bin/stty";

/// Command dialect selected from a platform tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// `stty -F <device> ...`
    Posix,
    /// `mode <device> ...`
    Windows,
}

impl Platform {
    /// Match a platform tag by case-insensitive prefix.
    ///
    /// Tags starting with `linux` select [`Platform::Posix`], tags starting
    /// with `windows` select [`Platform::Windows`].
    ///
    /// ```
    /// use async_serial_port::port::Platform;
    ///
    /// assert_eq!(Platform::detect("Linux-x86_64"), Some(Platform::Posix));
    /// assert_eq!(Platform::detect("WINDOWS NT"), Some(Platform::Windows));
    /// assert_eq!(Platform::detect("darwin"), None);
    /// ```
    pub fn detect(tag: &str) -> Option<Self> {
        if has_prefix_ignore_case(tag, "linux") {
            Some(Platform::Posix)
        } else if has_prefix_ignore_case(tag, "windows") {
            Some(Platform::Windows)
        } else {
            None
        }
    }

    /// Platform tag describing the OS this crate was compiled for.
    pub fn host_tag() -> &'static str {
        std::env::consts::OS
    }

    /// Render the configuration command for `config` in this dialect.
    pub fn render(self, config: &SerialPortConfiguration) -> String {
        match self {
            Platform::Posix => format!(
                "{} -F {} {} raw -echo -echoe -echok -clocal cs8 {}",
                STTY_PATH,
                config.device,
                config.baud,
                if config.octs { "crtscts" } else { "-crtscts" },
            ),
            Platform::Windows => format!(
                "mode {} BAUD={} PARITY={} DATA={} STOP={} xon={} octs={} rts={} dtr={}",
                config.device,
                config.baud,
                config.parity.code(),
                config.data_bits.value(),
                config.stop_bits.value(),
                on_off(config.xon),
                on_off(config.octs),
                on_off(config.rts),
                on_off(config.dtr),
            ),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Posix => f.write_str("posix"),
            Platform::Windows => f.write_str("windows"),
        }
    }
}

/// Build the command that configures the line described by `config`, using
/// the dialect selected by `platform`.
///
/// # Example
/// ```
/// use async_serial_port::port::{synthesize, BaudRate, SerialPortConfiguration};
///
/// let config = SerialPortConfiguration::new("/dev/ttyUSB0", "linux").with_baud(BaudRate::Baud9600);
/// assert_eq!(
///     synthesize("linux", &config).unwrap(),
///     "/bin/stty -F /dev/ttyUSB0 9600 raw -echo -echoe -echok -clocal cs8 -crtscts"
/// );
/// ```
pub fn synthesize(
    platform: &str,
    config: &SerialPortConfiguration,
) -> Result<String, TransportError> {
    Platform::detect(platform)
        .map(|dialect| dialect.render(config))
        .ok_or_else(|| TransportError::unsupported_platform(platform))
}

fn has_prefix_ignore_case(tag: &str, prefix: &str) -> bool {
    tag.as_bytes()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// Runs a synthesized configuration command against the host.
pub trait CommandExecutor: Send + Sync + fmt::Debug {
    /// Run `command` to completion.
    ///
    /// Returns an error if the command could not be started or exited
    /// unsuccessfully.
    fn execute(&self, command: &str) -> io::Result<()>;
}

/// Executes commands by running the named tool directly.
///
/// The command is split on ASCII whitespace into a program and its
/// arguments. No shell is involved, so nothing in the device path is
/// expanded.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn execute(&self, command: &str) -> io::Result<()> {
        let mut parts = command.split_ascii_whitespace();
        let program = parts.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "empty configuration command")
        })?;

        let mut tool = Command::new(program);
        tool.args(parts);

        let output = tool
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(%command, status = %output.status, stderr = %stderr.trim(), "Command failed");
        Err(io::Error::other(format!(
            "exited with {}: {}",
            output.status,
            stderr.trim()
        )))
    }
}
