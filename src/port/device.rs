//! Filesystem-backed devices.
//!
//! On unix, character devices are opened non-blocking and driven by the
//! reactor through [`AsyncFd`](tokio::io::unix::AsyncFd). Anything else
//! (regular files, non-unix hosts) falls back to [`tokio::fs::File`].

use std::io;

use super::traits::{Device, DeviceOpener};

/// Opens device paths on the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileDeviceOpener;

impl DeviceOpener for FileDeviceOpener {
    fn is_readable(&self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }

        #[cfg(unix)]
        {
            unix::is_readable(path)
        }

        #[cfg(not(unix))]
        {
            std::fs::File::open(path).is_ok()
        }
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Device>> {
        #[cfg(unix)]
        {
            unix::open(path)
        }

        #[cfg(not(unix))]
        {
            let file = std::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .open(path)?;
            Ok(Box::new(tokio::fs::File::from_std(file)))
        }
    }
}

#[cfg(unix)]
mod unix {
    use std::fs::{File, OpenOptions};
    use std::io::{self, Read, Write};
    use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
    use std::pin::Pin;
    use std::task::{ready, Context, Poll};

    use tokio::io::unix::AsyncFd;
    use tokio::io::{AsyncRead, AsyncWrite, Interest, ReadBuf};

    use super::Device;

    /// A read-only open that neither blocks on carrier detect nor makes the
    /// device our controlling terminal. The handle is dropped right away.
    pub(super) fn is_readable(path: &str) -> bool {
        OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK | libc::O_NOCTTY)
            .open(path)
            .is_ok()
    }

    pub(super) fn open(path: &str) -> io::Result<Box<dyn Device>> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK | libc::O_NOCTTY)
            .open(path)?;

        if file.metadata()?.file_type().is_char_device() {
            Ok(Box::new(TtyDevice::new(file)?))
        } else {
            Ok(Box::new(tokio::fs::File::from_std(file)))
        }
    }

    /// A non-blocking character device registered with the reactor.
    #[derive(Debug)]
    pub(super) struct TtyDevice {
        inner: AsyncFd<File>,
    }

    impl TtyDevice {
        fn new(file: File) -> io::Result<Self> {
            Ok(Self {
                inner: AsyncFd::with_interest(file, Interest::READABLE | Interest::WRITABLE)?,
            })
        }
    }

    impl AsyncRead for TtyDevice {
        fn poll_read(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            loop {
                let mut guard = ready!(self.inner.poll_read_ready(cx))?;
                let unfilled = buf.initialize_unfilled();

                match guard.try_io(|inner| {
                    let mut file: &File = inner.get_ref();
                    file.read(unfilled)
                }) {
                    Ok(Ok(len)) => {
                        buf.advance(len);
                        return Poll::Ready(Ok(()));
                    }
                    Ok(Err(err)) => return Poll::Ready(Err(err)),
                    Err(_would_block) => continue,
                }
            }
        }
    }

    impl AsyncWrite for TtyDevice {
        fn poll_write(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            loop {
                let mut guard = ready!(self.inner.poll_write_ready(cx))?;

                match guard.try_io(|inner| {
                    let mut file: &File = inner.get_ref();
                    file.write(buf)
                }) {
                    Ok(result) => return Poll::Ready(result),
                    Err(_would_block) => continue,
                }
            }
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }
}
