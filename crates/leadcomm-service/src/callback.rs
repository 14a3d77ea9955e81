use std::sync::Arc;

use crate::connection::Connection;
use crate::error::ServiceError;
use crate::service::ServiceCore;

/// Lifecycle notifications delivered by an [`Entity`](crate::Entity).
///
/// Every hook defaults to doing nothing, so implementors override only what
/// they care about. `on_receive` may fire any number of times per
/// connection, including zero.
pub trait Callback: Send + Sync {
    /// The entity is about to run its workflow.
    fn on_initialize(&self, service: &ServiceCore) {
        let _ = service;
    }

    /// The workflow failed or panicked.
    fn on_fail(&self, service: &ServiceCore, error: &ServiceError) {
        let _ = (service, error);
    }

    /// A peer connected. Keep the `Arc` to send on this connection later.
    fn on_connect(&self, service: &ServiceCore, connection: &Arc<Connection>) {
        let _ = (service, connection);
    }

    /// A message arrived, in the order the peer sent it.
    fn on_receive(&self, service: &ServiceCore, message: &[u8]) {
        let _ = (service, message);
    }

    /// A connection ended, either by the disconnect sentinel or end of stream.
    fn on_disconnect(&self, service: &ServiceCore) {
        let _ = service;
    }
}

/// A callback that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCallback;

impl Callback for NoopCallback {}

impl<C: Callback + ?Sized> Callback for Arc<C> {
    fn on_initialize(&self, service: &ServiceCore) {
        (**self).on_initialize(service);
    }

    fn on_fail(&self, service: &ServiceCore, error: &ServiceError) {
        (**self).on_fail(service, error);
    }

    fn on_connect(&self, service: &ServiceCore, connection: &Arc<Connection>) {
        (**self).on_connect(service, connection);
    }

    fn on_receive(&self, service: &ServiceCore, message: &[u8]) {
        (**self).on_receive(service, message);
    }

    fn on_disconnect(&self, service: &ServiceCore) {
        (**self).on_disconnect(service);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_hooks_are_safe_to_invoke() {
        let core = ServiceCore::new(0);
        let callback: Box<dyn Callback> = Box::new(NoopCallback);

        callback.on_initialize(&core);
        callback.on_fail(&core, &ServiceError::AlreadyRunning);
        callback.on_receive(&core, b"ignored");
        callback.on_disconnect(&core);
    }

    #[test]
    fn shared_callback_forwards_to_inner() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        #[derive(Default)]
        struct Counting(AtomicUsize);

        impl Callback for Counting {
            fn on_receive(&self, _service: &ServiceCore, _message: &[u8]) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let inner = Arc::new(Counting::default());
        let shared: Box<dyn Callback> = Box::new(Arc::clone(&inner));
        let core = ServiceCore::new(0);
        shared.on_receive(&core, b"a");
        shared.on_receive(&core, b"b");
        assert_eq!(inner.0.load(Ordering::SeqCst), 2);
    }
}
