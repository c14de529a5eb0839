//! Incremental STOMP 1.2 framing.
//!
//! Every frame on the wire looks like:
//! - a command line
//! - zero or more `name:value` header lines
//! - a blank line
//! - an optional body, terminated by a NUL sentinel
//!
//! Lines end in either `\n` or `\r\n`; whichever the first frame uses is
//! fixed for the rest of the connection. Bodies are NUL-delimited unless a
//! `content-length` header gives their exact size.
//!
//! [`FrameParser`] accepts bytes in whatever chunks the transport delivers
//! and never holds more than the configured header and body bounds.

pub mod codec;
pub mod error;
pub mod frame;
pub mod parser;

#[cfg(feature = "async")]
pub mod stomp_codec;

pub use codec::{
    encode_frame, encode_unterminated, FrameConfig, DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_HEADER_SIZE,
    SENTINEL,
};
pub use error::{FrameError, Result};
pub use frame::{commands, headers, Frame, LineEnding};
pub use parser::FrameParser;

#[cfg(feature = "async")]
pub use stomp_codec::StompCodec;
