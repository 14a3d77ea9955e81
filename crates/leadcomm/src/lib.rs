//! Threaded TCP services exchanging delimiter-framed messages.
//!
//! # Crate Structure
//!
//! - [`transport`]: Blocking TCP listener and stream
//! - [`frame`]: `;`-terminated message framing and the `disconnect` sentinel
//! - [`service`]: Service lifecycle, connections, callbacks and entities
//!   (behind the default `service` feature)

/// Re-export transport types.
pub mod transport {
    pub use leadcomm_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use leadcomm_frame::*;
}

/// Re-export service types (requires `service` feature).
#[cfg(feature = "service")]
pub mod service {
    pub use leadcomm_service::*;
}
