use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use leadcomm_transport::NetStream;

use crate::codec::{decode_frame, FrameConfig, DELIMITER};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Bytes read past the end of a frame are kept as the remainder and served
/// first on the next call, so a single read carrying several frames is
/// drained one frame per call.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    scratch: Vec<u8>,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            scratch: Vec::new(),
            config,
        }
    }

    /// Seed the remainder with bytes read from the stream by someone else.
    pub fn with_remainder(mut self, remainder: &[u8]) -> Self {
        self.buf.extend_from_slice(remainder);
        self
    }

    /// Take the next frame already sitting in the remainder, if any.
    ///
    /// Never touches the underlying stream.
    pub fn buffered_frame(&mut self) -> Result<Option<Bytes>> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        decode_frame(&mut self.buf, self.config.max_frame_size)
    }

    /// Read the next complete frame (blocking), using the configured chunk size.
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        self.read_frame_chunked(self.config.chunk_size)
    }

    /// Read the next complete frame (blocking), requesting at most
    /// `chunk_size` bytes per read from the stream.
    pub fn read_frame_chunked(&mut self, chunk_size: usize) -> Result<Bytes> {
        if let Some(frame) = self.buffered_frame()? {
            return Ok(frame);
        }

        self.scratch.resize(chunk_size.max(1), 0);
        loop {
            let read = match self.inner.read(&mut self.scratch) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            let chunk = &self.scratch[..read];
            self.buf.extend_from_slice(chunk);

            // Only the new chunk can hold the first delimiter; earlier bytes were already scanned.
            if chunk.contains(&DELIMITER) {
                if let Some(frame) = decode_frame(&mut self.buf, self.config.max_frame_size)? {
                    return Ok(frame);
                }
            } else if self.buf.len() > self.config.max_frame_size {
                return Err(FrameError::FrameTooLarge {
                    size: self.buf.len(),
                    max: self.config.max_frame_size,
                });
            }
        }
    }

    /// Bytes read from the stream but not yet returned as part of a frame.
    pub fn remainder(&self) -> &[u8] {
        &self.buf
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<NetStream> {
    /// Create a frame reader for `NetStream` and apply read timeout from config.
    pub fn with_config_net(inner: NetStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: leadcomm_transport::TransportError) -> FrameError {
    match err {
        leadcomm_transport::TransportError::Io(io)
        | leadcomm_transport::TransportError::Accept(io) => FrameError::Io(io),
        leadcomm_transport::TransportError::Bind { source, .. }
        | leadcomm_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
