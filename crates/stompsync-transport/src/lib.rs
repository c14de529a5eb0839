//! Non-blocking transport and timer abstractions.
//!
//! This is the lowest layer of stompsync. A STOMP session is driven entirely
//! by readiness notifications: the [`Transport`] reports "data available" and
//! "space available", and the [`Scheduler`] fires one-shot heartbeat timers.
//! Nothing in here ever blocks the caller once a connection is established.
//!
//! [`TcpTransport`] adapts a `mio` TCP stream; [`DeadlineTimers`] is an
//! `Instant`-based scheduler suitable for a poll loop.

pub mod error;
pub mod tcp;
pub mod timer;
pub mod traits;

pub use error::{Result, TransportError};
pub use tcp::TcpTransport;
pub use timer::{DeadlineTimers, Scheduler, Timer};
pub use traits::{Interest, Transport};
