use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::codec::{FrameConfig, SENTINEL};
use crate::error::{FrameError, Result};
use crate::frame::{commands, headers, Frame, LineEnding};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    ReceivingHeader,
    ReceivingBody { content_length: Option<usize> },
    FrameComplete,
    Failed,
}

/// Incremental decoder for one frame, linked to the decoder of the next.
///
/// Feed transport bytes with [`FrameParser::process_incoming`]. When a frame
/// completes, a successor parser is created on the spot, inherits the line
/// ending, and receives every byte left over from the same chunk, so several
/// frames arriving in one read are all decoded in one call. Drain the chain
/// with [`FrameParser::take_next_frame`]: each call yields the completed
/// frame and moves the successor into this parser's place.
///
/// ```
/// use stompsync_frame::FrameParser;
///
/// let mut parser = FrameParser::new();
/// assert!(parser.process_incoming(b"RECEIPT\nreceipt-id:a\n\nRECEIPT\nreceipt-id:b\n\n"));
///
/// let first = parser.take_next_frame().unwrap();
/// let second = parser.take_next_frame().unwrap();
/// assert_eq!(first.header("receipt-id"), Some("a"));
/// assert_eq!(second.header("receipt-id"), Some("b"));
/// assert!(parser.take_next_frame().is_none());
/// ```
pub struct FrameParser {
    config: FrameConfig,
    line_ending: Option<LineEnding>,
    state: ParseState,
    buf: BytesMut,
    frame: Option<Frame>,
    error: Option<FrameError>,
    next: Option<Box<FrameParser>>,
}

impl FrameParser {
    /// Create a parser with default size bounds.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a parser with explicit size bounds.
    pub fn with_config(config: FrameConfig) -> Self {
        Self::successor(config, None)
    }

    fn successor(config: FrameConfig, line_ending: Option<LineEnding>) -> Self {
        Self {
            config,
            line_ending,
            state: ParseState::ReceivingHeader,
            buf: BytesMut::new(),
            frame: None,
            error: None,
            next: None,
        }
    }

    /// Feed the next chunk of transport bytes.
    ///
    /// Returns `false` if the stream can no longer be decoded: a bound was
    /// exceeded or the framing is malformed. The caller must drop the
    /// connection; the whole chain is discarded and yields no more frames.
    /// Returns `true` otherwise, including when more bytes are needed.
    pub fn process_incoming(&mut self, data: &[u8]) -> bool {
        if self.state == ParseState::Failed {
            return false;
        }

        let tail = self.tail_mut();
        if tail.feed(data) {
            return true;
        }
        let err = tail.error.take().unwrap_or(FrameError::Poisoned);
        self.fail(err);
        false
    }

    /// The parser still filling, at the end of the undrained chain.
    fn tail_mut(&mut self) -> &mut FrameParser {
        let mut tail = self;
        loop {
            match tail.next {
                Some(ref mut next) => tail = &mut **next,
                None => return tail,
            }
        }
    }

    fn feed(&mut self, data: &[u8]) -> bool {
        if self.state == ParseState::Failed {
            return false;
        }

        self.buf.extend_from_slice(data);
        let mut leftover = match self.advance() {
            Ok(None) => return true,
            Ok(Some(rest)) => rest,
            Err(err) => {
                warn!(error = %err, "frame decoding failed");
                self.fail(err);
                return false;
            }
        };

        // Built iteratively and linked back to front, so one chunk packed with
        // many small frames does not recurse once per frame.
        let mut completed = Vec::new();
        let mut tail = Self::successor(self.config, self.line_ending);
        loop {
            tail.buf = leftover;
            match tail.advance() {
                Ok(None) => break,
                Ok(Some(rest)) => {
                    leftover = rest;
                    let next = Self::successor(self.config, tail.line_ending);
                    completed.push(std::mem::replace(&mut tail, next));
                }
                Err(err) => {
                    warn!(error = %err, "frame decoding failed");
                    self.fail(err);
                    return false;
                }
            }
        }

        let mut link = Box::new(tail);
        while let Some(mut parser) = completed.pop() {
            parser.next = Some(link);
            link = Box::new(parser);
        }
        self.next = Some(link);
        true
    }

    /// Whether this parser holds a complete frame.
    pub fn is_complete(&self) -> bool {
        self.state == ParseState::FrameComplete
    }

    /// The completed frame, if any, without consuming it.
    pub fn frame(&self) -> Option<&Frame> {
        if self.is_complete() {
            self.frame.as_ref()
        } else {
            None
        }
    }

    /// Take the completed frame and replace `self` with its successor.
    ///
    /// Returns `None` while the frame at the head of the chain is still
    /// filling. Call repeatedly after each feed to drain every frame in wire
    /// order.
    pub fn take_next_frame(&mut self) -> Option<Frame> {
        if !self.is_complete() {
            return None;
        }
        let next = self.next.take()?;
        let mut done = std::mem::replace(self, *next);
        done.frame.take()
    }

    /// Line ending fixed by the first frame, once known.
    pub fn line_ending(&self) -> Option<LineEnding> {
        self.line_ending
    }

    /// Why decoding failed, after `process_incoming` returned `false`.
    pub fn error(&self) -> Option<&FrameError> {
        self.error.as_ref()
    }

    /// Take ownership of the failure reason, leaving the parser poisoned.
    pub fn take_error(&mut self) -> Option<FrameError> {
        self.error.take()
    }

    fn fail(&mut self, err: FrameError) {
        self.state = ParseState::Failed;
        self.buf.clear();
        self.frame = None;
        self.next = None;
        self.error = Some(err);
    }

    /// Run the state machine over buffered bytes.
    ///
    /// Returns the unconsumed tail once the frame is complete.
    fn advance(&mut self) -> Result<Option<BytesMut>> {
        loop {
            let progressed = match self.state {
                ParseState::ReceivingHeader => self.advance_header()?,
                ParseState::ReceivingBody { content_length } => {
                    self.advance_body(content_length)?
                }
                ParseState::FrameComplete => return Ok(Some(std::mem::take(&mut self.buf))),
                ParseState::Failed => return Err(FrameError::Poisoned),
            };
            if !progressed {
                return Ok(None);
            }
        }
    }

    fn advance_header(&mut self) -> Result<bool> {
        let eol = match self.line_ending {
            Some(eol) => eol,
            None => match self.detect_line_ending()? {
                Some(eol) => eol,
                None => return Ok(false),
            },
        };

        self.skip_heartbeats(eol);

        let separator = eol.separator();
        let Some(pos) = find(&self.buf, separator) else {
            // A partly received separator is not part of the header block.
            let pending = partial_suffix(&self.buf, separator);
            self.check_header_size(self.buf.len() - pending)?;
            return Ok(false);
        };
        self.check_header_size(pos)?;

        let block = self.buf.split_to(pos);
        self.buf.advance(separator.len());
        let frame = parse_header_block(&block, eol)?;

        self.state = if commands::has_body(frame.command()) {
            ParseState::ReceivingBody {
                content_length: self.content_length(&frame)?,
            }
        } else {
            ParseState::FrameComplete
        };
        debug!(command = frame.command(), "frame headers decoded");
        self.frame = Some(frame);
        Ok(true)
    }

    fn detect_line_ending(&mut self) -> Result<Option<LineEnding>> {
        let stray = self.buf.iter().take_while(|&&b| b == SENTINEL).count();
        self.buf.advance(stray);

        let Some(pos) = self.buf.iter().position(|&b| b == b'\n') else {
            let pending = usize::from(self.buf.ends_with(b"\r"));
            self.check_header_size(self.buf.len() - pending)?;
            return Ok(None);
        };

        let eol = if pos > 0 && self.buf[pos - 1] == b'\r' {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        };
        debug!(?eol, "line ending fixed");
        self.line_ending = Some(eol);
        Ok(Some(eol))
    }

    /// Drop bare terminators (heartbeats) and stray sentinels ahead of a command.
    fn skip_heartbeats(&mut self, eol: LineEnding) {
        let terminator = eol.as_bytes();
        loop {
            if self.buf.starts_with(terminator) {
                trace!("heartbeat received");
                self.buf.advance(terminator.len());
            } else if self.buf.first() == Some(&SENTINEL) {
                self.buf.advance(1);
            } else {
                return;
            }
        }
    }

    fn check_header_size(&self, size: usize) -> Result<()> {
        if size > self.config.max_header_size {
            return Err(FrameError::HeaderTooLarge {
                size,
                max: self.config.max_header_size,
            });
        }
        Ok(())
    }

    fn check_body_size(&self, size: usize) -> Result<()> {
        if size > self.config.max_body_size {
            return Err(FrameError::BodyTooLarge {
                size,
                max: self.config.max_body_size,
            });
        }
        Ok(())
    }

    fn content_length(&self, frame: &Frame) -> Result<Option<usize>> {
        let Some(raw) = frame.header(headers::CONTENT_LENGTH) else {
            return Ok(None);
        };
        let length = raw
            .parse::<usize>()
            .map_err(|_| FrameError::InvalidContentLength(raw.to_string()))?;
        self.check_body_size(length)?;
        Ok(Some(length))
    }

    fn advance_body(&mut self, content_length: Option<usize>) -> Result<bool> {
        let body = match content_length {
            None => {
                let Some(pos) = self.buf.iter().position(|&b| b == SENTINEL) else {
                    self.check_body_size(self.buf.len())?;
                    return Ok(false);
                };
                self.check_body_size(pos)?;
                self.take_body(pos)
            }
            Some(length) => {
                if self.buf.len() <= length {
                    return Ok(false);
                }
                let found = self.buf[length];
                if found != SENTINEL {
                    return Err(FrameError::MissingSentinel { length, found });
                }
                self.take_body(length)
            }
        };

        if let Some(frame) = self.frame.as_mut() {
            frame.set_body(body);
        }
        self.state = ParseState::FrameComplete;
        Ok(true)
    }

    fn take_body(&mut self, length: usize) -> Bytes {
        let body = self.buf.split_to(length).freeze();
        self.buf.advance(1);
        body
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FrameParser {
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(mut parser) = next {
            next = parser.next.take();
        }
    }
}

impl std::fmt::Debug for FrameParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameParser")
            .field("state", &self.state)
            .field("line_ending", &self.line_ending)
            .field("buffered", &self.buf.len())
            .field("has_next", &self.next.is_some())
            .finish()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Length of the longest proper prefix of `needle` that ends `haystack`.
fn partial_suffix(haystack: &[u8], needle: &[u8]) -> usize {
    (1..needle.len())
        .rev()
        .find(|&len| haystack.ends_with(&needle[..len]))
        .unwrap_or(0)
}

fn parse_header_block(block: &[u8], eol: LineEnding) -> Result<Frame> {
    let text = std::str::from_utf8(block).map_err(|_| FrameError::InvalidUtf8)?;
    let mut lines = text.split(eol.as_str());

    let command = lines.next().unwrap_or_default();
    debug_assert!(
        !command.is_empty(),
        "heartbeat skipping leaves a non-empty command line"
    );

    let mut frame = Frame::new(command);
    for line in lines {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| FrameError::MalformedHeader(line.to_string()))?;
        frame.push_header(name, value);
    }
    Ok(frame)
}
