//! Threaded network services exchanging delimiter-framed messages.
//!
//! - [`Service`] / [`ServiceCore`]: one-shot start, blocking or on a
//!   dedicated worker thread, plus a deferred listening socket.
//! - [`Connection`]: one framed TCP stream with `receive`/`send`/`close`.
//! - [`Callback`]: no-op-by-default notification hooks.
//! - [`Entity`]: a service that reports to a callback and runs the
//!   per-connection dispatch loop; [`AcceptLoop`] is the stock workflow.

pub mod acceptor;
pub mod callback;
pub mod config;
pub mod connection;
pub mod entity;
pub mod error;
pub mod panic;
pub mod service;

pub use acceptor::AcceptLoop;
pub use callback::{Callback, NoopCallback};
pub use config::ServiceConfig;
pub use connection::Connection;
pub use entity::{Entity, Workflow};
pub use error::{Result, ServiceError};
pub use service::{Service, ServiceCore, ServiceState};
