//! Shared test utilities for the transport integration tests.
//!
//! - [`Harness`]: a mock opener and recording executor wired into a port
//! - [`EventLog`]: collects transport events delivered to the handler
//! - [`FailingReadOpener`]: devices whose reads fail, to drive the error path

#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_serial_port::port::{
    AsyncSerialPort, Device, DeviceOpener, EventHandler, MockDeviceOpener, MockPeer,
    RecordingExecutor, SerialPortConfiguration, TransportEvent,
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Device path used by the mock-backed tests.
pub const DEVICE: &str = "/dev/ttyMOCK0";

/// How long to wait for an event that must arrive.
const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration for the mock device on a POSIX platform tag.
pub fn mock_config() -> SerialPortConfiguration {
    SerialPortConfiguration::new(DEVICE, "linux")
}

/// Receives every event passed to the handler returned by [`event_log`].
pub struct EventLog {
    rx: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Create a handler and the log it feeds.
pub fn event_log() -> (EventHandler, EventLog) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler: EventHandler = Arc::new(move |event| {
        let _ = tx.send(event);
    });
    (handler, EventLog { rx })
}

impl EventLog {
    /// Wait for the next event, panicking after a timeout.
    pub async fn next(&mut self) -> TransportEvent {
        tokio::time::timeout(EVENT_TIMEOUT, self.rx.recv())
            .await
            .expect("timed out waiting for transport event")
            .expect("event handler dropped")
    }

    /// The next event, if one arrives within `wait`.
    pub async fn next_within(&mut self, wait: Duration) -> Option<TransportEvent> {
        tokio::time::timeout(wait, self.rx.recv()).await.ok().flatten()
    }

    /// Events already delivered, without waiting.
    pub fn drain(&mut self) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Assert nothing is delivered for a short while.
    pub async fn assert_quiet(&mut self) {
        if let Some(event) = self.next_within(Duration::from_millis(100)).await {
            panic!("Expected no events, got: {:?}", event);
        }
    }

    /// Collect data events until `expected` bytes have arrived.
    ///
    /// Returns the individual chunks.
    pub async fn collect_data(&mut self, expected: usize) -> Vec<Vec<u8>> {
        let mut chunks = Vec::new();
        let mut total = 0;
        while total < expected {
            match self.next().await {
                TransportEvent::Data(chunk) => {
                    total += chunk.len();
                    chunks.push(chunk);
                }
                other => panic!("Expected data, got: {:?}", other),
            }
        }
        chunks
    }
}

/// Mock devices and command recording for one test.
#[derive(Debug, Clone, Default)]
pub struct Harness {
    pub opener: MockDeviceOpener,
    pub executor: RecordingExecutor,
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Harness whose pipes buffer only `capacity` bytes per direction.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            opener: MockDeviceOpener::with_capacity(capacity),
            executor: RecordingExecutor::new(),
        }
    }

    /// A port on the current runtime using the harness mocks.
    pub fn port<'a>(
        &self,
        config: &'a SerialPortConfiguration,
        handler: EventHandler,
    ) -> AsyncSerialPort<'a> {
        AsyncSerialPort::new(config, Handle::current())
            .with_device_opener(Arc::new(self.opener.clone()))
            .with_command_executor(Arc::new(self.executor.clone()))
            .with_handler(handler)
    }

    /// The hardware end of the most recently unclaimed device.
    pub fn peer(&self) -> MockPeer {
        self.opener.take_peer().expect("no device was opened")
    }
}

/// Opens devices whose reads fail with `kind` and whose writes are discarded.
#[derive(Debug, Clone, Copy)]
pub struct FailingReadOpener {
    pub kind: io::ErrorKind,
}

impl DeviceOpener for FailingReadOpener {
    fn is_readable(&self, _path: &str) -> bool {
        true
    }

    fn open(&self, _path: &str) -> io::Result<Box<dyn Device>> {
        Ok(Box::new(FailingReadDevice { kind: self.kind }))
    }
}

struct FailingReadDevice {
    kind: io::ErrorKind,
}

impl AsyncRead for FailingReadDevice {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(self.kind, "line fault")))
    }
}

impl AsyncWrite for FailingReadDevice {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
