//! Lifecycle events delivered to the transport's handler.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::error::StreamError;

/// Name of a lifecycle notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Data,
    Error,
    /// Part of the vocabulary, but `open()` does not emit it.
    Open,
    Close,
    Write,
}

impl EventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            EventKind::Data => "data",
            EventKind::Error => "error",
            EventKind::Open => "open",
            EventKind::Close => "close",
            EventKind::Write => "write",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lifecycle event together with its payload.
#[derive(Debug)]
pub enum TransportEvent {
    /// A chunk of at most `chunk_size` bytes read from the device.
    Data(Vec<u8>),
    /// The stream failed. The stream closes right after a read or write failure.
    Error(StreamError),
    Open,
    /// The transport went from open to closed.
    Close,
    /// A write was queued; `true` unless the write buffer reached its soft limit.
    Write(bool),
}

impl TransportEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TransportEvent::Data(_) => EventKind::Data,
            TransportEvent::Error(_) => EventKind::Error,
            TransportEvent::Open => EventKind::Open,
            TransportEvent::Close => EventKind::Close,
            TransportEvent::Write(_) => EventKind::Write,
        }
    }
}

/// The single observer registered on a transport.
///
/// Handlers run on whichever thread delivers the event: the caller's thread
/// for `Write` and explicit `Close`, a runtime worker for everything else.
pub type EventHandler = Arc<dyn Fn(TransportEvent) + Send + Sync>;
