use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::time::Duration;

use mio::{Registry, Token};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{Interest, Transport};

/// TCP transport registered with a `mio` poller.
///
/// Connecting is blocking (bounded by a timeout); once connected the socket is
/// switched to non-blocking mode and every read and write is readiness-driven.
/// mio delivers edge-triggered events, so the one-shot watch contract is
/// enforced by the owner: it drains until `WouldBlock` and only then re-arms.
pub struct TcpTransport {
    stream: mio::net::TcpStream,
    registry: Registry,
    token: Token,
    registered: Option<mio::Interest>,
    peer: SocketAddr,
}

impl TcpTransport {
    /// Connect to `addr` and prepare the stream for registration under `token`.
    pub fn connect(
        addr: SocketAddr,
        timeout: Duration,
        registry: &Registry,
        token: Token,
    ) -> Result<Self> {
        let stream = std::net::TcpStream::connect_timeout(&addr, timeout)
            .map_err(|source| TransportError::Connect { addr, source })?;
        info!(%addr, "connected");
        Self::from_std(stream, registry, token)
    }

    /// Adopt an already-connected standard TCP stream.
    pub fn from_std(
        stream: std::net::TcpStream,
        registry: &Registry,
        token: Token,
    ) -> Result<Self> {
        let peer = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        stream.set_nonblocking(true)?;
        let registry = registry.try_clone().map_err(TransportError::Register)?;

        Ok(Self {
            stream: mio::net::TcpStream::from_std(stream),
            registry,
            token,
            registered: None,
            peer,
        })
    }

    /// Token readiness events for this transport are delivered under.
    pub fn token(&self) -> Token {
        self.token
    }

    /// Address of the connected peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

fn to_mio(interest: Interest) -> mio::Interest {
    match interest {
        Interest::Readable => mio::Interest::READABLE,
        Interest::Writable => mio::Interest::WRITABLE,
    }
}

impl Transport for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn watch(&mut self, interest: Interest) -> Result<()> {
        let wanted = to_mio(interest);
        match self.registered {
            Some(current) => {
                let merged = current.add(wanted);
                if merged == current {
                    return Ok(());
                }
                self.registry
                    .reregister(&mut self.stream, self.token, merged)
                    .map_err(TransportError::Register)?;
                self.registered = Some(merged);
            }
            None => {
                self.registry
                    .register(&mut self.stream, self.token, wanted)
                    .map_err(TransportError::Register)?;
                self.registered = Some(wanted);
            }
        }
        debug!(token = self.token.0, ?interest, "watch armed");
        Ok(())
    }

    fn unwatch(&mut self) {
        if self.registered.take().is_some() {
            if let Err(err) = self.registry.deregister(&mut self.stream) {
                debug!(error = %err, "deregister failed");
            }
        }
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("peer", &self.peer)
            .field("token", &self.token.0)
            .field("registered", &self.registered)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{ErrorKind, Write as _};
    use std::net::TcpListener;

    use mio::{Events, Poll};

    use super::*;

    const CLIENT: Token = Token(7);

    fn connected_pair(poll: &Poll) -> (TcpTransport, std::net::TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let transport =
            TcpTransport::connect(addr, Duration::from_secs(2), poll.registry(), CLIENT).unwrap();
        let (server, _) = listener.accept().unwrap();
        (transport, server)
    }

    fn wait_for(poll: &mut Poll, events: &mut Events, readable: bool) -> bool {
        for _ in 0..50 {
            poll.poll(events, Some(Duration::from_millis(100))).unwrap();
            for event in events.iter() {
                if event.token() == CLIENT
                    && ((readable && event.is_readable()) || (!readable && event.is_writable()))
                {
                    return true;
                }
            }
        }
        false
    }

    #[test]
    fn read_would_block_until_peer_writes() {
        let mut poll = Poll::new().unwrap();
        let mut events = Events::with_capacity(8);
        let (mut transport, mut server) = connected_pair(&poll);

        let mut buf = [0u8; 16];
        let err = transport.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WouldBlock);

        transport.watch(Interest::Readable).unwrap();
        server.write_all(b"RECEIPT\n").unwrap();
        assert!(wait_for(&mut poll, &mut events, true));

        let n = transport.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"RECEIPT\n");
    }

    #[test]
    fn writable_watch_reports_space() {
        let mut poll = Poll::new().unwrap();
        let mut events = Events::with_capacity(8);
        let (mut transport, _server) = connected_pair(&poll);

        transport.watch(Interest::Readable).unwrap();
        transport.watch(Interest::Writable).unwrap();
        assert!(wait_for(&mut poll, &mut events, false));
        assert_eq!(transport.write(b"\n").unwrap(), 1);
    }

    #[test]
    fn repeated_watch_is_idempotent_and_unwatch_clears() {
        let poll = Poll::new().unwrap();
        let (mut transport, _server) = connected_pair(&poll);

        transport.watch(Interest::Readable).unwrap();
        transport.watch(Interest::Readable).unwrap();
        assert_eq!(transport.registered, Some(mio::Interest::READABLE));

        transport.unwatch();
        assert!(transport.registered.is_none());
        transport.unwatch();
    }

    #[test]
    fn connect_refused_reports_address() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let poll = Poll::new().unwrap();
        let err = TcpTransport::connect(addr, Duration::from_millis(500), poll.registry(), CLIENT)
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect { addr: a, .. } if a == addr));
    }
}
