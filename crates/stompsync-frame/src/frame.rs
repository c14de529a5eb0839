use bytes::Bytes;

/// STOMP commands this crate knows about.
pub mod commands {
    /// Client connect request (the STOMP 1.2 spelling of CONNECT).
    pub const STOMP: &str = "STOMP";
    pub const CONNECTED: &str = "CONNECTED";
    pub const SUBSCRIBE: &str = "SUBSCRIBE";
    pub const RECEIPT: &str = "RECEIPT";
    pub const MESSAGE: &str = "MESSAGE";
    pub const ERROR: &str = "ERROR";

    /// Returns true for the server commands that carry a body.
    pub fn has_body(command: &str) -> bool {
        command == MESSAGE || command == ERROR
    }
}

/// Header names used by the sync session.
pub mod headers {
    pub const ACCEPT_VERSION: &str = "accept-version";
    pub const HOST: &str = "host";
    pub const LOGIN: &str = "login";
    pub const HEART_BEAT: &str = "heart-beat";
    pub const VERSION: &str = "version";
    pub const SESSION: &str = "session";
    pub const ID: &str = "id";
    pub const DESTINATION: &str = "destination";
    pub const RECEIPT: &str = "receipt";
    pub const RECEIPT_ID: &str = "receipt-id";
    pub const CONTENT_LENGTH: &str = "content-length";
    pub const MESSAGE: &str = "message";
}

/// Line terminator convention of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    /// `\n`
    Lf,
    /// `\r\n`
    CrLf,
}

impl LineEnding {
    /// The terminator itself. A lone terminator on the wire is a heartbeat.
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            LineEnding::Lf => b"\n",
            LineEnding::CrLf => b"\r\n",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }

    /// The blank line separating headers from the body.
    pub fn separator(self) -> &'static [u8] {
        match self {
            LineEnding::Lf => b"\n\n",
            LineEnding::CrLf => b"\r\n\r\n",
        }
    }
}

/// A decoded (or to-be-encoded) STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    command: String,
    headers: Vec<(String, String)>,
    body: Option<Bytes>,
}

impl Frame {
    /// Create a frame with no headers and no body.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Append a header. Duplicates are kept in insertion order.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Value of the first header named exactly `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// All headers in wire order.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// The body; present only on MESSAGE and ERROR frames.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub(crate) fn push_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    pub(crate) fn set_body(&mut self, body: Bytes) {
        self.body = Some(body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_returns_first_match() {
        let frame = Frame::new(commands::MESSAGE)
            .with_header("destination", "/a")
            .with_header("destination", "/b");

        assert_eq!(frame.header("destination"), Some("/a"));
        assert_eq!(frame.header("Destination"), None);
        assert_eq!(frame.headers().count(), 2);
    }

    #[test]
    fn body_bearing_commands() {
        assert!(commands::has_body(commands::MESSAGE));
        assert!(commands::has_body(commands::ERROR));
        assert!(!commands::has_body(commands::CONNECTED));
        assert!(!commands::has_body(commands::RECEIPT));
    }

    #[test]
    fn separator_is_doubled_terminator() {
        for eol in [LineEnding::Lf, LineEnding::CrLf] {
            assert_eq!(eol.separator(), [eol.as_bytes(), eol.as_bytes()].concat());
            assert_eq!(eol.as_str().as_bytes(), eol.as_bytes());
        }
    }
}
