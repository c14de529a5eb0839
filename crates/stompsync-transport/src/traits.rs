use std::io;

use crate::error::Result;

/// Readiness the owner of a transport can ask to be told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interest {
    /// Bytes are available to read (or the peer hung up).
    Readable,
    /// The transport will accept at least one more byte.
    Writable,
}

/// A duplex, non-blocking byte channel.
///
/// `read` and `write` follow `std::io` conventions: `ErrorKind::WouldBlock`
/// means "not now", `Ok(0)` from `read` means the peer closed the stream.
///
/// Watches are one-shot from the caller's point of view. After the owner is
/// told about a readiness event it must call [`Transport::watch`] again to
/// hear about the next one. [`Transport::unwatch`] drops every watch; no
/// further readiness is reported for this transport afterwards.
pub trait Transport {
    /// Read up to `buf.len()` bytes without blocking.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write a prefix of `buf` without blocking, returning how much was accepted.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Ask to be notified the next time `interest` becomes ready.
    fn watch(&mut self, interest: Interest) -> Result<()>;

    /// Cancel every outstanding watch.
    fn unwatch(&mut self);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn watch(&mut self, interest: Interest) -> Result<()> {
        (**self).watch(interest)
    }

    fn unwatch(&mut self) {
        (**self).unwatch()
    }
}
