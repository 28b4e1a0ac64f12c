//! Duplex stream adapter.
//!
//! Wraps a [`Device`] as a non-blocking readable/writable stream. Two tasks
//! are spawned on the runtime: a reader that turns device input into
//! [`StreamEvent::Data`] chunks, and a writer that drains the write buffer.
//! Both close the stream on EOF or a fatal I/O error, which is reported once
//! as [`StreamEvent::Close`].

use std::io;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use super::configuration::MAX_CHUNK_SIZE;
use super::error::StreamError;
use super::traits::Device;

/// Default pending-write size at which [`DuplexStream::write`] signals backpressure.
pub const DEFAULT_WRITE_SOFT_LIMIT: usize = 65536;

/// Notifications emitted by a running stream, in delivery order.
#[derive(Debug)]
pub enum StreamEvent {
    Data(Vec<u8>),
    Error(StreamError),
    /// Emitted once, after which no further events follow.
    Close,
}

#[derive(Debug)]
struct StreamState {
    readable: AtomicBool,
    writable: AtomicBool,
    closed: AtomicBool,
    buffered: AtomicUsize,
}

impl StreamState {
    /// Mark the stream closed. Returns `true` for the first caller only.
    fn shut_down(&self) -> bool {
        self.readable.store(false, Ordering::SeqCst);
        self.writable.store(false, Ordering::SeqCst);
        !self.closed.swap(true, Ordering::SeqCst)
    }
}

/// A device wrapped as an event-emitting duplex stream.
///
/// Dropping the stream closes it.
#[derive(Debug)]
pub struct DuplexStream {
    state: Arc<StreamState>,
    outgoing: mpsc::UnboundedSender<Vec<u8>>,
    soft_limit: usize,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl DuplexStream {
    /// Start pumping `device` on `runtime`.
    ///
    /// Returns the stream and the receiving end of its event channel.
    pub fn spawn(
        device: Box<dyn Device>,
        chunk_size: NonZeroUsize,
        soft_limit: usize,
        runtime: &Handle,
    ) -> (Self, mpsc::UnboundedReceiver<StreamEvent>) {
        let state = Arc::new(StreamState {
            readable: AtomicBool::new(true),
            writable: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            buffered: AtomicUsize::new(0),
        });

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (read_half, write_half) = tokio::io::split(device);

        let reader = runtime.spawn(read_loop(
            read_half,
            chunk_size,
            Arc::clone(&state),
            events_tx.clone(),
        ));
        let writer = runtime.spawn(write_loop(
            write_half,
            outgoing_rx,
            Arc::clone(&state),
            events_tx,
        ));

        let stream = Self {
            state,
            outgoing: outgoing_tx,
            soft_limit,
            reader,
            writer,
        };
        (stream, events_rx)
    }

    pub fn is_readable(&self) -> bool {
        self.state.readable.load(Ordering::SeqCst)
    }

    pub fn is_writable(&self) -> bool {
        self.state.writable.load(Ordering::SeqCst)
    }

    /// Bytes queued but not yet written to the device.
    pub fn buffered(&self) -> usize {
        self.state.buffered.load(Ordering::SeqCst)
    }

    /// Queue `data` for writing.
    ///
    /// Returns `false` if the stream is not writable, or if the pending buffer
    /// has reached the soft limit and the caller should hold off. The data is
    /// queued in the latter case.
    pub fn write(&self, data: &[u8]) -> bool {
        if !self.is_writable() {
            return false;
        }
        if data.is_empty() {
            return self.buffered() < self.soft_limit;
        }

        let pending = self.state.buffered.fetch_add(data.len(), Ordering::SeqCst) + data.len();
        if self.outgoing.send(data.to_vec()).is_err() {
            self.state.buffered.fetch_sub(data.len(), Ordering::SeqCst);
            return false;
        }

        pending < self.soft_limit
    }

    /// Stop both pump tasks and release the device. Pending writes are discarded.
    pub fn close(&self) {
        self.state.shut_down();
        self.reader.abort();
        self.writer.abort();
    }
}

impl Drop for DuplexStream {
    fn drop(&mut self) {
        self.close();
    }
}

async fn read_loop(
    mut device: ReadHalf<Box<dyn Device>>,
    chunk_size: NonZeroUsize,
    state: Arc<StreamState>,
    events: mpsc::UnboundedSender<StreamEvent>,
) {
    let mut buffer = vec![0u8; chunk_size.get().min(MAX_CHUNK_SIZE)];

    loop {
        match device.read(&mut buffer).await {
            Ok(0) => {
                trace!("End of stream");
                break;
            }
            Ok(n) => {
                trace!(bytes = n, "Read chunk");
                if events.send(StreamEvent::Data(buffer[..n].to_vec())).is_err() {
                    break;
                }
            }
            Err(e) if is_transient(&e) => continue,
            Err(e) => {
                warn!(error = %e, "Read failed");
                let _ = events.send(StreamEvent::Error(StreamError::Read(e)));
                break;
            }
        }
    }

    if state.shut_down() {
        let _ = events.send(StreamEvent::Close);
    }
}

async fn write_loop(
    mut device: WriteHalf<Box<dyn Device>>,
    mut outgoing: mpsc::UnboundedReceiver<Vec<u8>>,
    state: Arc<StreamState>,
    events: mpsc::UnboundedSender<StreamEvent>,
) {
    while let Some(chunk) = outgoing.recv().await {
        let result = match device.write_all(&chunk).await {
            Ok(()) => device.flush().await,
            Err(e) => Err(e),
        };
        state.buffered.fetch_sub(chunk.len(), Ordering::SeqCst);

        if let Err(e) = result {
            warn!(error = %e, "Write failed");
            let _ = events.send(StreamEvent::Error(StreamError::Write(e)));
            if state.shut_down() {
                let _ = events.send(StreamEvent::Close);
            }
            return;
        }
    }
}

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}
