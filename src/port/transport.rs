//! Asynchronous serial transport.
//!
//! [`AsyncSerialPort`] owns at most one [`DuplexStream`] at a time and turns
//! its activity into [`TransportEvent`]s for a single handler.
//!
//! ```text
//!            open()                      close() / stream close / drop
//!   Closed ───────────► Open ─────────────────────────────────────► Closed
//! ```
//!
//! Every method is synchronous and takes `&self`, so a handler may call back
//! into the transport (e.g. `close()` on an error). Stream activity is
//! forwarded by a task on the bound runtime.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::command::{synthesize, CommandExecutor, SystemCommandExecutor};
use super::configuration::SerialPortConfiguration;
use super::device::FileDeviceOpener;
use super::error::TransportError;
use super::event::{EventHandler, TransportEvent};
use super::stream::{DuplexStream, StreamEvent, DEFAULT_WRITE_SOFT_LIMIT};
use super::traits::{Device, DeviceOpener};

/// The stream of the current open/close cycle.
#[derive(Debug)]
struct OpenStream {
    id: u64,
    stream: DuplexStream,
    forwarder: JoinHandle<()>,
}

impl OpenStream {
    fn is_active(&self) -> bool {
        self.stream.is_readable() || self.stream.is_writable()
    }
}

/// State shared with the forwarding task.
struct Shared {
    slot: Mutex<Option<OpenStream>>,
    /// Serializes event delivery; reentrant so handlers can call back in.
    gate: ReentrantMutex<()>,
    handler: RwLock<Option<EventHandler>>,
    next_id: AtomicU64,
}

impl Shared {
    fn emit(&self, event: TransportEvent) {
        let handler = self.handler.read().clone();
        if let Some(handler) = handler {
            handler(event);
        }
    }

    fn is_open(&self) -> bool {
        self.slot.lock().as_ref().is_some_and(OpenStream::is_active)
    }

    fn is_current(&self, id: u64) -> bool {
        self.slot.lock().as_ref().is_some_and(|open| open.id == id)
    }

    /// Close whatever stream occupies the slot.
    fn close(&self) {
        let _gate = self.gate.lock();
        let taken = self.slot.lock().take();
        if let Some(open) = taken {
            self.finish(open);
        }
    }

    /// Close the slot only if it still holds stream `id`.
    fn close_stream(&self, id: u64) {
        let _gate = self.gate.lock();
        let taken = {
            let mut slot = self.slot.lock();
            match slot.as_ref() {
                Some(open) if open.id == id => slot.take(),
                _ => None,
            }
        };
        if let Some(open) = taken {
            self.finish(open);
        }
    }

    fn finish(&self, open: OpenStream) {
        open.stream.close();
        open.forwarder.abort();
        info!(stream = open.id, "Serial port closed");
        self.emit(TransportEvent::Close);
    }

    /// Deliver one stream event. Returns `false` once the stream is finished.
    fn deliver(&self, id: u64, event: StreamEvent) -> bool {
        match event {
            StreamEvent::Close => {
                self.close_stream(id);
                false
            }
            StreamEvent::Data(chunk) => {
                let _gate = self.gate.lock();
                if !self.is_current(id) {
                    return false;
                }
                trace!(bytes = chunk.len(), "Forwarding data");
                self.emit(TransportEvent::Data(chunk));
                true
            }
            StreamEvent::Error(error) => {
                let _gate = self.gate.lock();
                if !self.is_current(id) {
                    return false;
                }
                warn!(%error, "Stream error");
                self.emit(TransportEvent::Error(error));
                true
            }
        }
    }
}

async fn forward_events(
    shared: Weak<Shared>,
    id: u64,
    mut events: mpsc::UnboundedReceiver<StreamEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        if !shared.deliver(id, event) {
            break;
        }
    }
}

/// Event-driven serial port bound to a configuration and a Tokio runtime.
///
/// # Example
/// ```no_run
/// use async_serial_port::port::{AsyncSerialPort, SerialPortConfiguration, TransportEvent};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SerialPortConfiguration::new("/dev/ttyUSB0", "linux");
/// let port = AsyncSerialPort::new(&config, tokio::runtime::Handle::current())
///     .on_event(|event| {
///         if let TransportEvent::Data(bytes) = event {
///             println!("{}", String::from_utf8_lossy(&bytes));
///         }
///     });
///
/// port.open()?;
/// port.write(b"AT\r\n")?;
/// # Ok(())
/// # }
/// ```
pub struct AsyncSerialPort<'a> {
    config: &'a SerialPortConfiguration,
    runtime: Handle,
    shared: Arc<Shared>,
    opener: Arc<dyn DeviceOpener>,
    executor: Arc<dyn CommandExecutor>,
    write_soft_limit: usize,
    strict_configure: bool,
}

impl<'a> AsyncSerialPort<'a> {
    /// Create a closed transport without an event handler.
    pub fn new(config: &'a SerialPortConfiguration, runtime: Handle) -> Self {
        Self {
            config,
            runtime,
            shared: Arc::new(Shared {
                slot: Mutex::new(None),
                gate: ReentrantMutex::new(()),
                handler: RwLock::new(None),
                next_id: AtomicU64::new(0),
            }),
            opener: Arc::new(FileDeviceOpener),
            executor: Arc::new(SystemCommandExecutor),
            write_soft_limit: DEFAULT_WRITE_SOFT_LIMIT,
            strict_configure: false,
        }
    }

    /// Register the event handler, replacing any previous one.
    pub fn on_event<F>(self, handler: F) -> Self
    where
        F: Fn(TransportEvent) + Send + Sync + 'static,
    {
        self.with_handler(Arc::new(handler))
    }

    /// Register an already shared event handler, replacing any previous one.
    pub fn with_handler(self, handler: EventHandler) -> Self {
        *self.shared.handler.write() = Some(handler);
        self
    }

    pub fn with_device_opener(mut self, opener: Arc<dyn DeviceOpener>) -> Self {
        self.opener = opener;
        self
    }

    pub fn with_command_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Pending-write size at which `write` starts returning `false`.
    pub fn with_write_soft_limit(mut self, bytes: usize) -> Self {
        self.write_soft_limit = bytes;
        self
    }

    /// Fail `open()` when the configuration command fails.
    ///
    /// Off by default: the command is fire-and-forget and a failure is only logged.
    pub fn require_configure_success(mut self, strict: bool) -> Self {
        self.strict_configure = strict;
        self
    }

    pub fn configuration(&self) -> &'a SerialPortConfiguration {
        self.config
    }

    pub fn device(&self) -> &str {
        &self.config.device
    }

    /// Whether a stream is held and can still read or write.
    pub fn is_open(&self) -> bool {
        self.shared.is_open()
    }

    /// Configure the line and open the device.
    ///
    /// No `Open` event is emitted.
    pub fn open(&self) -> Result<(), TransportError> {
        let _gate = self.shared.gate.lock();
        if self.is_open() {
            return Err(TransportError::AlreadyOpen);
        }
        // A stream that degraded without its close being delivered yet
        // still ends its cycle before the next one starts.
        self.shared.close();

        let config = self.config;
        if !self.opener.is_readable(&config.device) {
            return Err(TransportError::device_unreadable(&config.device));
        }

        let command = synthesize(&config.platform, config)?;
        debug!(%command, "Configuring tty");
        if let Err(source) = self.executor.execute(&command) {
            warn!(%command, error = %source, "Configuration command failed");
            if self.strict_configure {
                return Err(TransportError::ConfigureFailed { command, source });
            }
        }

        let device = {
            let _context = self.runtime.enter();
            self.opener.open(&config.device)
        }
        .map_err(|source| TransportError::open_failed(&config.device, source))?;

        self.attach(device, config.chunk_size);
        info!(device = %config.device, baud = %config.baud, "Serial port opened");
        Ok(())
    }

    fn attach(&self, device: Box<dyn Device>, chunk_size: NonZeroUsize) {
        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        let (stream, events) =
            DuplexStream::spawn(device, chunk_size, self.write_soft_limit, &self.runtime);

        // Hold the slot while spawning so the forwarder cannot observe an empty slot.
        let mut slot = self.shared.slot.lock();
        let forwarder = self
            .runtime
            .spawn(forward_events(Arc::downgrade(&self.shared), id, events));
        *slot = Some(OpenStream {
            id,
            stream,
            forwarder,
        });
    }

    /// Queue `data` on the open stream.
    ///
    /// Emits one `Write` event carrying the result before returning it:
    /// `true` if the write buffer is below its soft limit, `false` if the
    /// caller should wait before writing more.
    pub fn write(&self, data: &[u8]) -> Result<bool, TransportError> {
        let _gate = self.shared.gate.lock();
        let flushed = {
            let slot = self.shared.slot.lock();
            match slot.as_ref() {
                Some(open) if open.is_active() => open.stream.write(data),
                _ => return Err(TransportError::NotOpen),
            }
        };

        self.shared.emit(TransportEvent::Write(flushed));
        Ok(flushed)
    }

    /// Close the stream and emit `Close`. Does nothing if already closed.
    pub fn close(&self) {
        self.shared.close();
    }
}

impl Drop for AsyncSerialPort<'_> {
    fn drop(&mut self) {
        self.shared.close();
    }
}

impl std::fmt::Debug for AsyncSerialPort<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncSerialPort")
            .field("device", &self.config.device)
            .field("platform", &self.config.platform)
            .field("open", &self.is_open())
            .field("has_handler", &self.shared.handler.read().is_some())
            .finish()
    }
}
