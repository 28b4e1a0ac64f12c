//! Core traits for device abstraction.
//!
//! The transport never touches the filesystem directly; it goes through a
//! [`DeviceOpener`], so real ttys and in-memory mocks are interchangeable.

use std::fmt;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};

/// A bidirectional byte device usable from the Tokio reactor.
pub trait Device: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> Device for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Opens devices by path.
///
/// `open` is called from within the transport's runtime context, so
/// implementations may register the device with the reactor.
pub trait DeviceOpener: Send + Sync + fmt::Debug {
    /// Whether the path names something this process may read.
    fn is_readable(&self, path: &str) -> bool;

    /// Open the device for simultaneous reading and writing.
    fn open(&self, path: &str) -> io::Result<Box<dyn Device>>;
}
