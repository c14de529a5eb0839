use std::time::Duration;

use stompsync_frame::FrameConfig;

/// STOMP protocol version spoken and required of the server.
pub const PROTOCOL_VERSION: &str = "1.2";

/// Shortest heartbeat interval this client agrees to, in either direction.
pub const DEFAULT_MIN_HEARTBEAT: Duration = Duration::from_secs(10);

/// Slack added to the peer's heartbeat interval before declaring it dead.
pub const DEFAULT_HEARTBEAT_GRACE: Duration = Duration::from_secs(5);

/// Subscription id sent with SUBSCRIBE.
pub const SUBSCRIPTION_ID: &str = "sync";

/// Receipt token requested with SUBSCRIBE; its RECEIPT completes the handshake.
pub const RECEIPT_TOKEN: &str = "sync-subscribed";

const DEFAULT_READ_CHUNK_SIZE: usize = 4 * 1024;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for a [`ConnectionClient`](crate::ConnectionClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Version sent in `accept-version` and required in CONNECTED.
    pub protocol_version: String,
    /// Local minimum heartbeat interval.
    pub min_heartbeat: Duration,
    /// Grace added to the inbound heartbeat deadline.
    pub heartbeat_grace: Duration,
    pub subscription_id: String,
    pub receipt_token: String,
    /// Bytes requested from the transport per read.
    pub read_chunk_size: usize,
    /// Timeout for establishing the TCP connection in [`run_session`](crate::run_session).
    pub connect_timeout: Duration,
    /// Decoder size bounds.
    pub frame: FrameConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            min_heartbeat: DEFAULT_MIN_HEARTBEAT,
            heartbeat_grace: DEFAULT_HEARTBEAT_GRACE,
            subscription_id: SUBSCRIPTION_ID.to_string(),
            receipt_token: RECEIPT_TOKEN.to_string(),
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            frame: FrameConfig::default(),
        }
    }
}
