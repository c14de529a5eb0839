/// Errors that can occur while decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The header block grew past the configured bound.
    #[error("header block too large ({size} bytes, max {max})")]
    HeaderTooLarge { size: usize, max: usize },

    /// The body grew past the configured bound.
    #[error("body too large ({size} bytes, max {max})")]
    BodyTooLarge { size: usize, max: usize },

    /// The `content-length` header is not a non-negative integer.
    #[error("invalid content-length '{0}'")]
    InvalidContentLength(String),

    /// A length-delimited body was not followed by the NUL sentinel.
    #[error("expected NUL after {length}-byte body, found 0x{found:02x}")]
    MissingSentinel { length: usize, found: u8 },

    /// A header line has no `:` separator.
    #[error("malformed header line '{0}'")]
    MalformedHeader(String),

    /// The command or a header is not valid UTF-8.
    #[error("frame header is not valid UTF-8")]
    InvalidUtf8,

    /// The parser already failed; no further frames come out of this chain.
    #[error("parser chain already failed")]
    Poisoned,

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
