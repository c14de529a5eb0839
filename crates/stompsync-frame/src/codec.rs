use bytes::{BufMut, BytesMut};

use crate::frame::{Frame, LineEnding};

/// Body terminator.
pub const SENTINEL: u8 = 0;

/// Default bound on a frame's header block: 2 KiB.
///
/// Invalidation frames carry a handful of short headers.
pub const DEFAULT_MAX_HEADER_SIZE: usize = 2 * 1024;

/// Default bound on a frame's body: 4 KiB.
///
/// Invalidation payloads are well under a kilobyte once encoded.
pub const DEFAULT_MAX_BODY_SIZE: usize = 4 * 1024;

/// Size bounds applied while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Maximum header block size in bytes (command line included).
    pub max_header_size: usize,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// Encode a frame without its trailing sentinel.
///
/// Wire format:
/// ```text
/// COMMAND<eol>
/// name:value<eol>   (zero or more)
/// <eol>
/// [body]
/// ```
pub fn encode_unterminated(frame: &Frame, eol: LineEnding, dst: &mut BytesMut) {
    let eol = eol.as_bytes();
    let body_len = frame.body().map_or(0, |body| body.len());
    dst.reserve(frame.command().len() + body_len + 64);

    dst.put_slice(frame.command().as_bytes());
    dst.put_slice(eol);
    for (name, value) in frame.headers() {
        dst.put_slice(name.as_bytes());
        dst.put_u8(b':');
        dst.put_slice(value.as_bytes());
        dst.put_slice(eol);
    }
    dst.put_slice(eol);
    if let Some(body) = frame.body() {
        dst.put_slice(body);
    }
}

/// Encode a complete frame, sentinel included.
pub fn encode_frame(frame: &Frame, eol: LineEnding, dst: &mut BytesMut) {
    encode_unterminated(frame, eol, dst);
    dst.put_u8(SENTINEL);
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::frame::commands;

    #[test]
    fn encodes_headers_in_order() {
        let frame = Frame::new(commands::SUBSCRIBE)
            .with_header("id", "sync")
            .with_header("destination", "/topic/a")
            .with_header("receipt", "sync-subscribed");

        let mut buf = BytesMut::new();
        encode_frame(&frame, LineEnding::Lf, &mut buf);

        assert_eq!(
            buf.as_ref(),
            b"SUBSCRIBE\nid:sync\ndestination:/topic/a\nreceipt:sync-subscribed\n\n\0"
        );
    }

    #[test]
    fn unterminated_omits_sentinel_and_honors_crlf() {
        let frame = Frame::new(commands::MESSAGE)
            .with_header("content-length", "3")
            .with_body(Bytes::from_static(b"a\0b"));

        let mut buf = BytesMut::new();
        encode_unterminated(&frame, LineEnding::CrLf, &mut buf);

        assert_eq!(buf.as_ref(), b"MESSAGE\r\ncontent-length:3\r\n\r\na\0b");
    }

    #[test]
    fn default_bounds_are_a_few_kilobytes() {
        let cfg = FrameConfig::default();
        assert_eq!(cfg.max_header_size, 2048);
        assert_eq!(cfg.max_body_size, 4096);
    }
}
