//! Non-blocking STOMP session for sync invalidations.
//!
//! [`ConnectionClient`] owns one transport end to end: it sends CONNECT,
//! negotiates heartbeats, subscribes to the delegate's channel, and hands
//! every decoded MESSAGE payload to the [`Delegate`]. All work happens inside
//! readiness and timer callbacks; nothing blocks.
//!
//! [`run_session`] drives a client over TCP with a `mio` poll loop.

pub mod client;
pub mod config;
pub mod delegate;
pub mod error;
pub mod heartbeat;
pub mod queue;
pub mod session;

pub use client::{ConnectionClient, ConnectionState, Session};
pub use config::{
    ClientConfig, DEFAULT_HEARTBEAT_GRACE, DEFAULT_MIN_HEARTBEAT, PROTOCOL_VERSION, RECEIPT_TOKEN,
    SUBSCRIPTION_ID,
};
pub use delegate::Delegate;
pub use error::{ClientError, Result};
pub use heartbeat::Heartbeat;
pub use queue::OutgoingQueue;
pub use session::run_session;
