/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload contains the delimiter byte, which cannot be escaped.
    #[error("payload contains the frame delimiter at offset {offset}")]
    DelimiterInPayload { offset: usize },

    /// A frame, incoming or outgoing, exceeds the configured maximum.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete frame was received.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_too_large_message_fits_both_directions() {
        let err = FrameError::FrameTooLarge { size: 10, max: 8 };
        assert_eq!(err.to_string(), "frame too large (10 bytes, max 8)");
    }
}
