//! `tokio_util::codec` adapter over [`FrameParser`].

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::frame::{Frame, LineEnding};
use crate::parser::FrameParser;

/// Decodes STOMP frames from, and encodes them onto, an async byte stream.
///
/// Decoding follows [`FrameParser`] exactly: the line ending is learned from
/// the first frame and heartbeats are swallowed. Encoding uses the line
/// ending passed to [`StompCodec::with_line_ending`] (default `\n`).
#[derive(Debug)]
pub struct StompCodec {
    parser: FrameParser,
    line_ending: LineEnding,
}

impl StompCodec {
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            parser: FrameParser::with_config(config),
            line_ending: LineEnding::Lf,
        }
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }
}

impl Default for StompCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for StompCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if let Some(frame) = self.parser.take_next_frame() {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            return Ok(None);
        }

        let chunk = src.split();
        if !self.parser.process_incoming(&chunk) {
            return Err(self.parser.take_error().unwrap_or(FrameError::Poisoned));
        }
        Ok(self.parser.take_next_frame())
    }
}

impl Encoder<Frame> for StompCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        encode_frame(&item, self.line_ending, dst);
        Ok(())
    }
}
