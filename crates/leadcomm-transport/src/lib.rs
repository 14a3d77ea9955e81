//! Blocking TCP transport for leadcomm services.
//!
//! This is the lowest layer of leadcomm. It owns sockets and nothing else:
//! a [`TcpTransport`] listens and accepts, a [`NetStream`] is one connected
//! byte stream. Framing lives one layer up.

pub mod error;
pub mod stream;
pub mod tcp;

pub use error::{Result, TransportError};
pub use stream::NetStream;
pub use tcp::TcpTransport;
