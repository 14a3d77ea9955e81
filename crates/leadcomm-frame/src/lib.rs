//! Delimiter-terminated message framing over a byte stream.
//!
//! Every message on the wire is an opaque payload followed by exactly one
//! delimiter byte (`;`). The payload itself must never contain that byte;
//! there is no escaping. The literal payload `disconnect` is reserved as the
//! graceful-close sentinel.
//!
//! [`FrameReader`] turns an arbitrary `Read` into a sequence of frames and
//! keeps whatever it over-read for the next call; [`FrameWriter`] emits one
//! frame per logical write.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod tokio_codec;

pub use codec::{
    decode_frame, encode_frame, is_disconnect, FrameConfig, DEFAULT_CHUNK_SIZE,
    DEFAULT_MAX_FRAME_SIZE, DELIMITER, DISCONNECT,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use tokio_codec::DelimitedCodec;
