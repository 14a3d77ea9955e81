use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// The byte that terminates every frame on the wire (ASCII `;`).
pub const DELIMITER: u8 = b';';

/// Reserved payload announcing a graceful close of the sending side.
pub const DISCONNECT: &[u8] = b"disconnect";

/// Default number of bytes requested from the socket per read.
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Default upper bound on a single frame: 16 MiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Returns true if the payload is the disconnect sentinel.
pub fn is_disconnect(payload: &[u8]) -> bool {
    payload == DISCONNECT
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌─────────────────────────────┬───────────┐
/// │ Payload (any bytes but ';') │ ';' (1B)  │
/// └─────────────────────────────┴───────────┘
/// ```
///
/// A payload containing the delimiter would silently split into two frames
/// on the receiving side, so it is rejected before anything is written.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if let Some(offset) = payload.iter().position(|&b| b == DELIMITER) {
        return Err(FrameError::DelimiterInPayload { offset });
    }
    dst.reserve(payload.len() + 1);
    dst.put_slice(payload);
    dst.put_u8(DELIMITER);
    Ok(())
}

/// Decode one frame from the front of a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a delimiter yet. On
/// success the frame bytes and their delimiter are consumed from `src`; the
/// delimiter appears in neither the returned frame nor the remaining buffer.
pub fn decode_frame(src: &mut BytesMut, max_frame_size: usize) -> Result<Option<Bytes>> {
    match src.iter().position(|&b| b == DELIMITER) {
        Some(end) if end > max_frame_size => Err(FrameError::FrameTooLarge {
            size: end,
            max: max_frame_size,
        }),
        Some(end) => {
            let frame = src.split_to(end).freeze();
            src.advance(1);
            Ok(Some(frame))
        }
        None if src.len() > max_frame_size => Err(FrameError::FrameTooLarge {
            size: src.len(),
            max: max_frame_size,
        }),
        None => Ok(None),
    }
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Bytes requested per socket read. Default: 512.
    pub chunk_size: usize,
    /// Maximum frame size in bytes. Default: 16 MiB.
    pub max_frame_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_appends_single_delimiter() {
        let mut buf = BytesMut::new();
        encode_frame(b"PING", &mut buf).unwrap();
        assert_eq!(buf.as_ref(), b"PING;");
    }

    #[test]
    fn test_encode_rejects_embedded_delimiter() {
        let mut buf = BytesMut::new();
        let result = encode_frame(b"a;b", &mut buf);
        assert!(matches!(
            result,
            Err(FrameError::DelimiterInPayload { offset: 1 })
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_without_delimiter_needs_more() {
        let mut buf = BytesMut::from(&b"PIN"[..]);
        assert!(decode_frame(&mut buf, DEFAULT_MAX_FRAME_SIZE)
            .unwrap()
            .is_none());
        assert_eq!(buf.as_ref(), b"PIN");
    }

    #[test]
    fn test_decode_strips_delimiter_from_both_sides() {
        let mut buf = BytesMut::from(&b"PING;PONG;"[..]);

        let first = decode_frame(&mut buf, DEFAULT_MAX_FRAME_SIZE)
            .unwrap()
            .unwrap();
        assert_eq!(first.as_ref(), b"PING");
        assert_eq!(buf.as_ref(), b"PONG;");

        let second = decode_frame(&mut buf, DEFAULT_MAX_FRAME_SIZE)
            .unwrap()
            .unwrap();
        assert_eq!(second.as_ref(), b"PONG");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_keeps_partial_tail() {
        let mut buf = BytesMut::from(&b"one;tw"[..]);
        let frame = decode_frame(&mut buf, DEFAULT_MAX_FRAME_SIZE)
            .unwrap()
            .unwrap();
        assert_eq!(frame.as_ref(), b"one");
        assert_eq!(buf.as_ref(), b"tw");
    }

    #[test]
    fn test_empty_frames_are_valid() {
        let mut buf = BytesMut::from(&b";;x;"[..]);
        let mut frames = Vec::new();
        while let Some(frame) = decode_frame(&mut buf, DEFAULT_MAX_FRAME_SIZE).unwrap() {
            frames.push(frame);
        }
        assert_eq!(frames.len(), 3);
        assert!(frames[0].is_empty());
        assert!(frames[1].is_empty());
        assert_eq!(frames[2].as_ref(), b"x");
    }

    #[test]
    fn test_decode_enforces_max_frame_size() {
        let mut unterminated = BytesMut::from(&b"0123456789"[..]);
        assert!(matches!(
            decode_frame(&mut unterminated, 8),
            Err(FrameError::FrameTooLarge { size: 10, max: 8 })
        ));

        let mut terminated = BytesMut::from(&b"0123456789;"[..]);
        assert!(matches!(
            decode_frame(&mut terminated, 8),
            Err(FrameError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn test_disconnect_sentinel() {
        assert!(is_disconnect(b"disconnect"));
        assert!(!is_disconnect(b"disconnected"));
        assert!(!is_disconnect(b""));
    }
}
