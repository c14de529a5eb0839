//! STOMP sync-invalidation client.
//!
//! stompsync subscribes to a single STOMP destination and hands every
//! base64-encoded invalidation it receives to the caller, without ever
//! blocking the thread that drives it.
//!
//! # Crate Structure
//!
//! - [`transport`]: non-blocking byte transport and one-shot timer abstractions
//! - [`frame`]: incremental STOMP frame parser and encoder
//! - [`client`]: the connection state machine and a `mio` session driver

/// Re-export transport types.
pub mod transport {
    pub use stompsync_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use stompsync_frame::*;
}

/// Re-export client types.
pub mod client {
    pub use stompsync_client::*;
}
