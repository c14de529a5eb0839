use std::time::Duration;

use crate::error::{ClientError, Result};

/// Negotiated heartbeat intervals, from the client's point of view.
///
/// `None` disables a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    /// How long the peer may stay silent before the session is declared dead.
    pub inbound: Option<Duration>,
    /// How often the client sends a heartbeat of its own.
    pub outbound: Option<Duration>,
}

impl Heartbeat {
    /// No heartbeating in either direction.
    pub const DISABLED: Heartbeat = Heartbeat {
        inbound: None,
        outbound: None,
    };

    /// The `heart-beat` header value offered in CONNECT: `min` both ways.
    pub fn proposal(min: Duration) -> String {
        let ms = min.as_millis();
        format!("{ms},{ms}")
    }

    /// Negotiate from the CONNECTED `heart-beat` header.
    ///
    /// The header reads `<in>,<out>` in milliseconds: how often the server
    /// will send, then how often it wants to hear from us. Zero disables that
    /// direction. Each non-zero interval is raised to at least `min`; the
    /// inbound one additionally gets `grace`. A missing header disables both.
    pub fn negotiate(header: Option<&str>, min: Duration, grace: Duration) -> Result<Self> {
        let Some(value) = header else {
            return Ok(Self::DISABLED);
        };
        let (server_sends, server_wants) = parse(value)?;

        Ok(Self {
            inbound: (server_sends > 0)
                .then(|| Duration::from_millis(server_sends).max(min) + grace),
            outbound: (server_wants > 0).then(|| Duration::from_millis(server_wants).max(min)),
        })
    }
}

fn parse(value: &str) -> Result<(u64, u64)> {
    let invalid = || ClientError::Protocol(format!("invalid heart-beat header '{value}'"));
    let (first, second) = value.split_once(',').ok_or_else(invalid)?;
    let first = first.trim().parse().map_err(|_| invalid())?;
    let second = second.trim().parse().map_err(|_| invalid())?;
    Ok((first, second))
}
