//! `tokio_util::codec` adapter for the same wire format.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, DEFAULT_MAX_FRAME_SIZE};
use crate::error::{FrameError, Result};

/// Delimiter codec for use with `Framed`, `FramedRead` and `FramedWrite`.
#[derive(Debug, Clone)]
pub struct DelimitedCodec {
    max_frame_size: usize,
}

impl DelimitedCodec {
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for DelimitedCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for DelimitedCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        decode_frame(src, self.max_frame_size)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::ConnectionClosed),
        }
    }
}

impl Encoder<&[u8]> for DelimitedCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<()> {
        if item.len() > self.max_frame_size {
            return Err(FrameError::FrameTooLarge {
                size: item.len(),
                max: self.max_frame_size,
            });
        }
        encode_frame(item, dst)
    }
}

impl Encoder<Bytes> for DelimitedCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        Encoder::<&[u8]>::encode(self, item.as_ref(), dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_frames_split_across_buffers() {
        let mut codec = DelimitedCodec::new();
        let mut buf = BytesMut::from(&b"PI"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"NG;PONG;");
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().as_ref(), b"PING");
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().as_ref(), b"PONG");
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn eof_with_partial_frame_is_an_error() {
        let mut codec = DelimitedCodec::new();
        let mut buf = BytesMut::from(&b"dangling"[..]);
        assert!(matches!(
            codec.decode_eof(&mut buf),
            Err(FrameError::ConnectionClosed)
        ));

        let mut empty = BytesMut::new();
        assert!(codec.decode_eof(&mut empty).unwrap().is_none());
    }

    #[test]
    fn encodes_with_size_limit() {
        let mut codec = DelimitedCodec::with_max_frame_size(3);
        let mut dst = BytesMut::new();
        codec.encode(Bytes::from_static(b"abc"), &mut dst).unwrap();
        assert_eq!(dst.as_ref(), b"abc;");

        let err = codec.encode(&b"abcd"[..], &mut dst).unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { .. }));
    }
}
