/// Errors that can occur in TCP transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The listener has been shut down.
    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    pub(crate) fn bind(addr: impl std::fmt::Debug, source: std::io::Error) -> Self {
        Self::Bind {
            addr: format!("{addr:?}"),
            source,
        }
    }

    pub(crate) fn connect(addr: impl std::fmt::Debug, source: std::io::Error) -> Self {
        Self::Connect {
            addr: format!("{addr:?}"),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
