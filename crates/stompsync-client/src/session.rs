use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use mio::{Events, Poll, Token};
use stompsync_transport::{DeadlineTimers, TcpTransport};
use tracing::{debug, info};

use crate::client::ConnectionClient;
use crate::config::ClientConfig;
use crate::delegate::Delegate;
use crate::error::{ClientError, Result};

const CLIENT: Token = Token(0);

/// Upper bound on a single poll wait, so a cleared `running` flag is noticed
/// promptly even when no timer is armed.
const MAX_POLL_WAIT: Duration = Duration::from_millis(250);

/// Connect to `addr` and drive one session until it closes.
///
/// Returns `Ok(())` when the session ended because `running` was cleared, and
/// the close reason otherwise. The delegate sees `on_closed` in both cases.
pub fn run_session<D: Delegate>(
    addr: SocketAddr,
    delegate: D,
    config: ClientConfig,
    running: &AtomicBool,
) -> Result<()> {
    let mut poll = Poll::new()?;
    let mut events = Events::with_capacity(16);
    let transport = TcpTransport::connect(addr, config.connect_timeout, poll.registry(), CLIENT)?;
    info!(%addr, "session starting");

    let mut client = ConnectionClient::new(transport, DeadlineTimers::new(), delegate, config);
    client.start();

    while !client.is_closed() {
        if !running.load(Ordering::SeqCst) {
            client.shutdown();
            break;
        }

        let wait = client
            .scheduler()
            .next_deadline()
            .map_or(MAX_POLL_WAIT, |deadline| {
                deadline
                    .saturating_duration_since(Instant::now())
                    .min(MAX_POLL_WAIT)
            });

        if let Err(err) = poll.poll(&mut events, Some(wait)) {
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err.into());
        }

        for event in events.iter() {
            if event.token() != CLIENT {
                continue;
            }
            if event.is_readable() || event.is_read_closed() || event.is_error() {
                client.on_readable();
            }
            if event.is_writable() {
                client.on_writable();
            }
        }

        for timer in client.scheduler_mut().take_expired(Instant::now()) {
            debug!(?timer, "timer expired");
            client.on_timer(timer);
        }
    }

    match client.take_close_reason() {
        None | Some(ClientError::Shutdown) => Ok(()),
        Some(reason) => Err(reason),
    }
}
