//! Drives the transport over a real pseudo-terminal.
//!
//! The slave side stands in for the serial device; the test holds the master
//! side and plays the attached hardware.

#![cfg(target_os = "linux")]

mod common;

use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::sync::Arc;
use std::time::Duration;

use async_serial_port::port::{AsyncSerialPort, RecordingExecutor, TransportEvent};
use async_serial_port::SerialPortConfiguration;
use common::event_log;
use pretty_assertions::assert_eq;
use tokio::runtime::Handle;

struct Pty {
    master: File,
    // Held open so the master does not see a hangup before the port opens.
    _slave: OwnedFd,
    slave_path: String,
}

fn open_pty() -> Pty {
    let mut master = -1;
    let mut slave = -1;
    // SAFETY: both out-pointers are valid; name, termios and winsize may be null.
    let rc = unsafe {
        libc::openpty(
            &mut master,
            &mut slave,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
        )
    };
    assert_eq!(rc, 0, "openpty failed: {}", std::io::Error::last_os_error());

    // SAFETY: openpty returned two fresh descriptors that we now own.
    let (master, slave) = unsafe { (File::from_raw_fd(master), OwnedFd::from_raw_fd(slave)) };

    // Raw mode on the slave, as `stty raw -echo` would set it.
    // SAFETY: `slave` is an open terminal and `termios` is fully initialized by tcgetattr.
    unsafe {
        let mut termios: libc::termios = std::mem::zeroed();
        assert_eq!(libc::tcgetattr(slave.as_raw_fd(), &mut termios), 0);
        libc::cfmakeraw(&mut termios);
        assert_eq!(libc::tcsetattr(slave.as_raw_fd(), libc::TCSANOW, &termios), 0);
    }

    let slave_path = std::fs::read_link(format!("/proc/self/fd/{}", slave.as_raw_fd()))
        .expect("Failed to resolve pty slave path")
        .to_string_lossy()
        .into_owned();

    Pty {
        master,
        _slave: slave,
        slave_path,
    }
}

#[tokio::test]
async fn test_pty_round_trip() {
    let mut pty = open_pty();
    let config = SerialPortConfiguration::new(pty.slave_path.clone(), "linux");
    let executor = RecordingExecutor::new();
    let (handler, mut log) = event_log();

    // The default opener, so the slave goes through the non-blocking tty path.
    let port = AsyncSerialPort::new(&config, Handle::current())
        .with_command_executor(Arc::new(executor.clone()))
        .with_handler(handler);

    port.open().unwrap();
    assert!(port.is_open());
    assert_eq!(executor.commands().len(), 1);
    assert!(executor.commands()[0].contains(&pty.slave_path));

    pty.master.write_all(b"hello").unwrap();
    assert_eq!(log.collect_data(5).await.concat(), b"hello");

    assert!(port.write(b"world").unwrap());
    let mut master = pty.master.try_clone().unwrap();
    let echoed = tokio::time::timeout(
        Duration::from_secs(2),
        tokio::task::spawn_blocking(move || {
            let mut received = [0u8; 5];
            master.read_exact(&mut received).map(|_| received)
        }),
    )
    .await
    .expect("timed out reading from pty master")
    .unwrap()
    .unwrap();
    assert_eq!(&echoed, b"world");

    port.close();
    let events = log.drain();
    assert!(matches!(
        events.as_slice(),
        [TransportEvent::Write(true), TransportEvent::Close]
    ));
}

#[tokio::test]
async fn test_pty_reopen_after_close() {
    let mut pty = open_pty();
    let config = SerialPortConfiguration::new(pty.slave_path.clone(), "linux");
    let (handler, mut log) = event_log();
    let port = AsyncSerialPort::new(&config, Handle::current())
        .with_command_executor(Arc::new(RecordingExecutor::new()))
        .with_handler(handler);

    port.open().unwrap();
    port.close();
    assert!(matches!(log.next().await, TransportEvent::Close));
    assert!(!port.is_open());

    port.open().unwrap();
    pty.master.write_all(b"again").unwrap();
    assert_eq!(log.collect_data(5).await.concat(), b"again");
}
