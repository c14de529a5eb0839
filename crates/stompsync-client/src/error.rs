use std::time::Duration;

/// Reasons a session ends.
///
/// The delegate never sees these; it only learns that the session closed.
/// They are logged and kept on the client for diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error (connect, readiness registration).
    #[error("transport error: {0}")]
    Transport(#[from] stompsync_transport::TransportError),

    /// Read or write failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the stream.
    #[error("connection closed by peer")]
    Eof,

    /// The byte stream could not be decoded into frames.
    #[error("frame error: {0}")]
    Frame(#[from] stompsync_frame::FrameError),

    /// A frame arrived that the session state does not allow, or a required
    /// header was missing or invalid.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server sent an ERROR frame.
    #[error("server error: {0}")]
    Server(String),

    /// Nothing arrived from the peer within the negotiated window.
    #[error("no data from peer within {0:?}")]
    HeartbeatTimeout(Duration),

    /// A MESSAGE body was not valid base64.
    #[error("invalid invalidation payload: {0}")]
    Payload(#[from] base64::DecodeError),

    /// The owner asked for the session to end.
    #[error("session shut down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, ClientError>;
