use std::io;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::{BufMut, Bytes, BytesMut};
use stompsync_frame::{
    commands, encode_unterminated, headers, Frame, FrameError, FrameParser, LineEnding, SENTINEL,
};
use stompsync_transport::{Interest, Scheduler, Timer, Transport};
use tracing::{debug, info, trace, warn};

use crate::config::ClientConfig;
use crate::delegate::Delegate;
use crate::error::{ClientError, Result};
use crate::heartbeat::Heartbeat;
use crate::queue::OutgoingQueue;

/// Where a session is in its lifecycle.
///
/// States only move forward: `Idle → Connecting → Subscribing → Connected`,
/// and any of them may jump to `Closed`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Built but not yet started.
    Idle,
    /// CONNECT sent; waiting for CONNECTED.
    Connecting,
    /// SUBSCRIBE sent; waiting for its RECEIPT.
    Subscribing,
    /// Subscribed; invalidations flow to the delegate.
    Connected,
    /// Finished. Nothing is read, written, or delivered any more.
    Closed,
}

/// What CONNECTED told us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Server-assigned session id, kept verbatim.
    pub id: String,
    /// Negotiated heartbeat intervals.
    pub heartbeat: Heartbeat,
    /// Line ending the server uses; our later frames follow it.
    pub line_ending: LineEnding,
}

/// One STOMP sync session over a non-blocking transport.
///
/// The owner reports readiness through [`on_readable`](Self::on_readable) and
/// [`on_writable`](Self::on_writable), and timer expiry through
/// [`on_timer`](Self::on_timer). Each watch the client arms is one-shot: a
/// readiness callback is honored only if the client asked for it, and the
/// client drains the transport until `WouldBlock` before asking again.
///
/// Every failure funnels into a single close routine that disarms the
/// transport, stops both timers, and notifies the delegate exactly once.
pub struct ConnectionClient<T: Transport, S: Scheduler, D: Delegate> {
    transport: T,
    scheduler: S,
    delegate: D,
    config: ClientConfig,
    state: ConnectionState,
    parser: FrameParser,
    read_buf: Vec<u8>,
    queue: OutgoingQueue,
    session: Option<Session>,
    writable: bool,
    read_armed: bool,
    write_armed: bool,
    close_reason: Option<ClientError>,
}

impl<T: Transport, S: Scheduler, D: Delegate> ConnectionClient<T, S, D> {
    /// Wrap an established transport. Nothing is sent until [`start`](Self::start).
    pub fn new(transport: T, scheduler: S, delegate: D, config: ClientConfig) -> Self {
        Self {
            transport,
            scheduler,
            delegate,
            parser: FrameParser::with_config(config.frame),
            read_buf: vec![0; config.read_chunk_size.max(1)],
            config,
            state: ConnectionState::Idle,
            queue: OutgoingQueue::new(),
            session: None,
            writable: true,
            read_armed: false,
            write_armed: false,
            close_reason: None,
        }
    }

    /// Send CONNECT and start listening for the reply.
    pub fn start(&mut self) {
        if self.state != ConnectionState::Idle {
            warn!(state = ?self.state, "start called twice; ignoring");
            return;
        }

        let connect = Frame::new(commands::STOMP)
            .with_header(headers::ACCEPT_VERSION, self.config.protocol_version.as_str())
            .with_header(headers::HOST, self.delegate.vhost())
            .with_header(headers::LOGIN, self.delegate.login())
            .with_header(
                headers::HEART_BEAT,
                Heartbeat::proposal(self.config.min_heartbeat),
            );

        self.state = ConnectionState::Connecting;
        info!(
            version = %self.config.protocol_version,
            "connecting"
        );
        self.send_frame(&connect);
        self.arm(Interest::Readable);
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == ConnectionState::Closed
    }

    /// Parameters from CONNECTED, once received.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Why the session closed, if it has.
    pub fn close_reason(&self) -> Option<&ClientError> {
        self.close_reason.as_ref()
    }

    /// Take the close reason out of the client.
    pub fn take_close_reason(&mut self) -> Option<ClientError> {
        self.close_reason.take()
    }

    /// Number of messages still waiting to be fully written.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn delegate_mut(&mut self) -> &mut D {
        &mut self.delegate
    }

    /// Queue `message` followed by the frame sentinel.
    pub fn send(&mut self, message: &[u8]) {
        let mut buf = BytesMut::with_capacity(message.len() + 1);
        buf.put_slice(message);
        buf.put_u8(SENTINEL);
        self.enqueue(buf.freeze());
    }

    /// Queue `bytes` exactly as given (heartbeats).
    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.enqueue(Bytes::copy_from_slice(bytes));
    }

    /// Encode and queue a frame using the session's line ending.
    pub fn send_frame(&mut self, frame: &Frame) {
        let mut buf = BytesMut::new();
        encode_unterminated(frame, self.line_ending(), &mut buf);
        buf.put_u8(SENTINEL);
        self.enqueue(buf.freeze());
    }

    /// The transport reported readable data.
    pub fn on_readable(&mut self) {
        if !self.read_armed || self.is_closed() {
            trace!("unrequested readable event ignored");
            return;
        }
        self.read_armed = false;

        loop {
            match self.transport.read(&mut self.read_buf) {
                Ok(0) => return self.close(ClientError::Eof),
                Ok(n) => {
                    trace!(bytes = n, "read");
                    self.scheduler.reset(Timer::InboundHeartbeat);
                    if !self.parser.process_incoming(&self.read_buf[..n]) {
                        let err = self.parser.take_error().unwrap_or(FrameError::Poisoned);
                        return self.close(err.into());
                    }
                    self.drain_frames();
                    if self.is_closed() {
                        return;
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    return self.arm(Interest::Readable);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return self.close(err.into()),
            }
        }
    }

    /// The transport reported room to write.
    pub fn on_writable(&mut self) {
        if !self.write_armed || self.is_closed() {
            trace!("unrequested writable event ignored");
            return;
        }
        self.write_armed = false;
        self.writable = true;
        self.flush();
    }

    /// A timer armed through the scheduler fired.
    pub fn on_timer(&mut self, timer: Timer) {
        if self.is_closed() {
            return;
        }
        let Some(heartbeat) = self.session.as_ref().map(|s| s.heartbeat) else {
            debug!(?timer, "timer fired before CONNECTED; ignoring");
            return;
        };

        match (timer, heartbeat.inbound, heartbeat.outbound) {
            (Timer::InboundHeartbeat, Some(limit), _) => {
                self.close(ClientError::HeartbeatTimeout(limit));
            }
            (Timer::OutboundHeartbeat, _, Some(interval)) => {
                trace!("sending heartbeat");
                self.send_raw(self.line_ending().as_bytes());
                if !self.is_closed() {
                    self.scheduler.start(Timer::OutboundHeartbeat, interval);
                }
            }
            _ => debug!(?timer, "timer for disabled heartbeat direction; ignoring"),
        }
    }

    /// End the session. The delegate is notified if it has not been already.
    pub fn shutdown(&mut self) {
        self.close(ClientError::Shutdown);
    }

    fn line_ending(&self) -> LineEnding {
        self.session
            .as_ref()
            .map_or(LineEnding::Lf, |session| session.line_ending)
    }

    fn enqueue(&mut self, bytes: Bytes) {
        if self.is_closed() {
            debug!(bytes = bytes.len(), "dropping write on closed session");
            return;
        }
        self.queue.push(bytes);
        if self.writable {
            self.flush();
        } else {
            self.arm(Interest::Writable);
        }
    }

    fn flush(&mut self) {
        while let Some(pending) = self.queue.front() {
            match self.transport.write(pending) {
                Ok(0) => {
                    return self.close(io::Error::from(io::ErrorKind::WriteZero).into());
                }
                Ok(n) => {
                    trace!(bytes = n, "wrote");
                    self.queue.consume(n);
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    trace!(queued = self.queue.len(), "write would block");
                    self.writable = false;
                    return self.arm(Interest::Writable);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return self.close(err.into()),
            }
        }
    }

    fn arm(&mut self, interest: Interest) {
        let armed = match interest {
            Interest::Readable => &mut self.read_armed,
            Interest::Writable => &mut self.write_armed,
        };
        if *armed || self.state == ConnectionState::Closed {
            return;
        }
        *armed = true;

        if let Err(err) = self.transport.watch(interest) {
            self.close(err.into());
        }
    }

    fn drain_frames(&mut self) {
        while !self.is_closed() {
            let Some(frame) = self.parser.take_next_frame() else {
                break;
            };
            if let Err(err) = self.handle_frame(frame) {
                self.close(err);
            }
        }
    }

    fn handle_frame(&mut self, frame: Frame) -> Result<()> {
        debug!(command = frame.command(), state = ?self.state, "frame received");
        match frame.command() {
            commands::CONNECTED => self.handle_connected(&frame),
            commands::RECEIPT => self.handle_receipt(&frame),
            commands::MESSAGE => self.handle_message(&frame),
            commands::ERROR => Err(ClientError::Server(error_message(&frame))),
            other => Err(ClientError::Protocol(format!(
                "unexpected {other} frame while {:?}",
                self.state
            ))),
        }
    }

    fn handle_connected(&mut self, frame: &Frame) -> Result<()> {
        if self.state != ConnectionState::Connecting {
            return Err(ClientError::Protocol(format!(
                "CONNECTED while {:?}",
                self.state
            )));
        }

        let version = frame
            .header(headers::VERSION)
            .ok_or_else(|| ClientError::Protocol("CONNECTED without version".into()))?;
        if version != self.config.protocol_version {
            return Err(ClientError::Protocol(format!(
                "server speaks version {version}, expected {}",
                self.config.protocol_version
            )));
        }
        let id = frame
            .header(headers::SESSION)
            .ok_or_else(|| ClientError::Protocol("CONNECTED without session".into()))?;
        let heartbeat = Heartbeat::negotiate(
            frame.header(headers::HEART_BEAT),
            self.config.min_heartbeat,
            self.config.heartbeat_grace,
        )?;
        let line_ending = self.parser.line_ending().unwrap_or(LineEnding::Lf);

        if let Some(limit) = heartbeat.inbound {
            self.scheduler.start(Timer::InboundHeartbeat, limit);
        }
        if let Some(interval) = heartbeat.outbound {
            self.scheduler.start(Timer::OutboundHeartbeat, interval);
        }
        info!(session = id, ?heartbeat, ?line_ending, "connected; subscribing");

        self.session = Some(Session {
            id: id.to_string(),
            heartbeat,
            line_ending,
        });
        self.state = ConnectionState::Subscribing;

        let subscribe = Frame::new(commands::SUBSCRIBE)
            .with_header(headers::ID, self.config.subscription_id.as_str())
            .with_header(headers::DESTINATION, self.delegate.channel())
            .with_header(headers::RECEIPT, self.config.receipt_token.as_str());
        self.send_frame(&subscribe);
        Ok(())
    }

    fn handle_receipt(&mut self, frame: &Frame) -> Result<()> {
        if self.state != ConnectionState::Subscribing {
            return Err(ClientError::Protocol(format!(
                "RECEIPT while {:?}",
                self.state
            )));
        }
        let receipt = frame.header(headers::RECEIPT_ID);
        if receipt != Some(self.config.receipt_token.as_str()) {
            debug!(?receipt, "ignoring unrelated receipt");
            return Ok(());
        }

        self.state = ConnectionState::Connected;
        info!("subscribed");
        self.delegate.on_connected();
        Ok(())
    }

    /// MESSAGE framing does not depend on the handshake, so payloads are
    /// delivered in whatever state they arrive.
    fn handle_message(&mut self, frame: &Frame) -> Result<()> {
        let body = frame.body().map_or(&[][..], |body| body.as_ref());
        let payload = STANDARD.decode(body)?;
        debug!(bytes = payload.len(), "invalidation received");
        self.delegate.on_invalidation(payload);
        Ok(())
    }

    fn close(&mut self, reason: ClientError) {
        if self.state == ConnectionState::Closed {
            return;
        }
        let previous = self.state;
        self.state = ConnectionState::Closed;
        self.read_armed = false;
        self.write_armed = false;
        self.writable = false;

        self.transport.unwatch();
        self.scheduler.stop(Timer::InboundHeartbeat);
        self.scheduler.stop(Timer::OutboundHeartbeat);
        self.queue.clear();

        match reason {
            ClientError::Shutdown => info!(state = ?previous, "session shut down"),
            ref err => warn!(error = %err, state = ?previous, "session closed"),
        }
        self.close_reason = Some(reason);
        self.delegate.on_closed();
    }
}

impl<T: Transport, S: Scheduler, D: Delegate> Drop for ConnectionClient<T, S, D> {
    fn drop(&mut self) {
        if self.state != ConnectionState::Closed {
            self.transport.unwatch();
            self.scheduler.stop(Timer::InboundHeartbeat);
            self.scheduler.stop(Timer::OutboundHeartbeat);
        }
    }
}

impl<T: Transport, S: Scheduler, D: Delegate> std::fmt::Debug for ConnectionClient<T, S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionClient")
            .field("state", &self.state)
            .field("session", &self.session)
            .field("queued", &self.queue.len())
            .field("read_armed", &self.read_armed)
            .field("write_armed", &self.write_armed)
            .finish()
    }
}

fn error_message(frame: &Frame) -> String {
    if let Some(message) = frame.header(headers::MESSAGE) {
        return message.to_string();
    }
    match frame.body() {
        Some(body) if !body.is_empty() => String::from_utf8_lossy(body).into_owned(),
        _ => "no detail".to_string(),
    }
}
