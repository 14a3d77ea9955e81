/// Errors that can occur in service, connection and entity operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// `start` was called on a service that has already been started.
    #[error("service already running")]
    AlreadyRunning,

    /// The connection's socket has been closed.
    #[error("an open socket is required")]
    SocketNotOpen,

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] leadcomm_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] leadcomm_frame::FrameError),

    /// The worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(std::io::Error),

    /// The workflow body reported a failure.
    #[error("workflow failed: {0}")]
    Workflow(String),

    /// The workflow body panicked.
    #[error("workflow panicked: {0}")]
    Panicked(String),
}

impl ServiceError {
    /// Build a workflow failure from any displayable reason.
    pub fn workflow(reason: impl std::fmt::Display) -> Self {
        Self::Workflow(reason.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
