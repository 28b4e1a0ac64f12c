//! Test doubles for the transport's seams.
//!
//! [`MockDeviceOpener`] hands out in-memory devices built on
//! [`tokio::io::duplex`] and keeps the far end of each one, so a test can
//! play the role of the attached hardware. [`RecordingExecutor`] records
//! configuration commands instead of running them.

use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::io;
use std::sync::Arc;

use super::command::CommandExecutor;
use super::traits::{Device, DeviceOpener};

/// Default capacity of each in-memory pipe direction.
const DEFAULT_PIPE_CAPACITY: usize = 4096;

/// The hardware side of a mock device.
pub type MockPeer = tokio::io::DuplexStream;

/// Inner state of the mock opener.
#[derive(Debug, Default)]
struct MockOpenerState {
    /// Paths reported as unreadable.
    unreadable: HashSet<String>,
    /// Paths whose open call fails with the stored error kind.
    failing: Vec<(String, io::ErrorKind)>,
    /// Every path successfully opened, in order.
    opened: Vec<String>,
    /// Far ends of opened devices not yet claimed by the test.
    peers: VecDeque<MockPeer>,
}

/// Opener producing in-memory devices.
///
/// # Example
/// ```
/// use async_serial_port::port::{DeviceOpener, MockDeviceOpener};
///
/// let opener = MockDeviceOpener::new();
/// opener.set_unreadable("/dev/ttyGONE");
/// assert!(opener.is_readable("/dev/ttyMOCK0"));
/// assert!(!opener.is_readable("/dev/ttyGONE"));
/// ```
#[derive(Debug, Clone)]
pub struct MockDeviceOpener {
    capacity: usize,
    state: Arc<Mutex<MockOpenerState>>,
}

impl MockDeviceOpener {
    /// Every path is readable and opens successfully.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_PIPE_CAPACITY)
    }

    /// Like [`new`](Self::new), with `capacity` bytes of buffering per direction.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            state: Arc::new(Mutex::new(MockOpenerState::default())),
        }
    }

    /// Report `path` as unreadable.
    pub fn set_unreadable(&self, path: impl Into<String>) {
        self.state.lock().unreadable.insert(path.into());
    }

    /// Make opening `path` fail with `kind` (the readability check still passes).
    pub fn fail_open(&self, path: impl Into<String>, kind: io::ErrorKind) {
        self.state.lock().failing.push((path.into(), kind));
    }

    /// Claim the hardware end of the oldest unclaimed device.
    pub fn take_peer(&self) -> Option<MockPeer> {
        self.state.lock().peers.pop_front()
    }

    /// Paths opened so far.
    pub fn opened_paths(&self) -> Vec<String> {
        self.state.lock().opened.clone()
    }
}

impl Default for MockDeviceOpener {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceOpener for MockDeviceOpener {
    fn is_readable(&self, path: &str) -> bool {
        !path.is_empty() && !self.state.lock().unreadable.contains(path)
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Device>> {
        let mut state = self.state.lock();

        if let Some((_, kind)) = state.failing.iter().find(|(p, _)| p == path) {
            return Err(io::Error::new(*kind, format!("mock open failure for {path}")));
        }

        let (device, peer) = tokio::io::duplex(self.capacity);
        state.opened.push(path.to_string());
        state.peers.push_back(peer);
        Ok(Box::new(device))
    }
}

/// Executor that records commands and optionally fails them.
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    commands: Arc<Mutex<Vec<String>>>,
    failure: Option<io::ErrorKind>,
}

impl RecordingExecutor {
    /// Executor whose commands all succeed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor whose commands are recorded and then fail with `kind`.
    pub fn failing(kind: io::ErrorKind) -> Self {
        Self {
            failure: Some(kind),
            ..Self::default()
        }
    }

    /// Commands executed so far, oldest first.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }
}

impl CommandExecutor for RecordingExecutor {
    fn execute(&self, command: &str) -> io::Result<()> {
        self.commands.lock().push(command.to_string());
        match self.failure {
            Some(kind) => Err(io::Error::new(kind, "mock command failure")),
            None => Ok(()),
        }
    }
}
