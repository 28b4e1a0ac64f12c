//! Port layer for event-driven serial communication.
//!
//! Configuration types, command synthesis, the duplex stream adapter and the
//! [`AsyncSerialPort`] transport, plus mocks for testing without hardware.

pub mod command;
pub mod configuration;
pub mod device;
pub mod error;
pub mod event;
pub mod mock;
pub mod stream;
pub mod traits;
pub mod transport;

pub use command::{synthesize, CommandExecutor, Platform, SystemCommandExecutor, STTY_PATH};
pub use configuration::{
    BaudRate, DataBits, InvalidValue, Parity, SerialPortConfiguration, StopBits,
    DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE,
};
pub use device::FileDeviceOpener;
pub use error::{StreamError, TransportError};
pub use event::{EventHandler, EventKind, TransportEvent};
pub use mock::{MockDeviceOpener, MockPeer, RecordingExecutor};
pub use stream::{DuplexStream, StreamEvent, DEFAULT_WRITE_SOFT_LIMIT};
pub use traits::{Device, DeviceOpener};
pub use transport::AsyncSerialPort;
