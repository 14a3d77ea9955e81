use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use leadcomm_frame::is_disconnect;
use tracing::{debug, error};

use crate::callback::Callback;
use crate::connection::Connection;
use crate::error::{Result, ServiceError};
use crate::panic::format_panic;
use crate::service::{Service, ServiceCore};

/// The body and teardown of an [`Entity`].
///
/// This is what a concrete entity supplies; the entity itself provides the
/// start discipline, failure reporting and the per-connection dispatch loop.
pub trait Workflow: Send + Sync + Sized + 'static {
    /// Arguments handed to [`Workflow::run`].
    type Args: Send + 'static;

    /// The workflow body, typically an accept loop calling [`Entity::stage`].
    fn run(&self, entity: &Entity<Self>, args: Self::Args) -> Result<()>;

    /// Tear the entity down.
    fn kill(&self, entity: &Entity<Self>) -> Result<()>;
}

/// A service whose events are reported to a [`Callback`].
///
/// Failures escaping the workflow, panics included, are handed to
/// [`Callback::on_fail`] instead of reaching the executing thread.
pub struct Entity<W> {
    core: Arc<ServiceCore>,
    callback: Box<dyn Callback>,
    workflow: W,
}

impl<W: Workflow> Entity<W> {
    pub fn new(core: Arc<ServiceCore>, callback: impl Callback + 'static, workflow: W) -> Self {
        Self {
            core,
            callback: Box::new(callback),
            workflow,
        }
    }

    pub fn callback(&self) -> &dyn Callback {
        self.callback.as_ref()
    }

    pub fn workflow(&self) -> &W {
        &self.workflow
    }

    /// Dispatch loop for one connection.
    ///
    /// Every received message goes to [`Callback::on_receive`] until the
    /// stream ends or the peer sends the disconnect sentinel. Then
    /// [`Callback::on_disconnect`] fires once, the connection is closed and
    /// the loop returns. The sentinel itself is never delivered.
    pub fn stage(&self, connection: &Connection) {
        let mut delivered = 0usize;
        loop {
            match connection.receive() {
                Some(message) if !is_disconnect(&message) => {
                    self.callback.on_receive(&self.core, &message);
                    delivered += 1;
                }
                ended => {
                    debug!(
                        peer = %connection,
                        delivered,
                        by_peer = ended.is_some(),
                        "connection finished"
                    );
                    self.callback.on_disconnect(&self.core);
                    connection.close();
                    return;
                }
            }
        }
    }
}

impl<W: Workflow> Service for Entity<W> {
    type Args = W::Args;

    fn core(&self) -> &Arc<ServiceCore> {
        &self.core
    }

    fn run(&self, args: W::Args) -> Result<()> {
        self.workflow.run(self, args)
    }

    fn kill(&self) -> Result<()> {
        self.workflow.kill(self)
    }

    fn execute(&self, args: W::Args) -> Result<()> {
        self.callback.on_initialize(&self.core);

        let failure = match panic::catch_unwind(AssertUnwindSafe(|| self.run(args))) {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(err)) => err,
            Err(panic) => ServiceError::Panicked(format_panic(panic).to_string()),
        };

        error!(service = %self.core, error = %failure, "entity workflow failed");
        self.callback.on_fail(&self.core, &failure);
        Ok(())
    }
}

impl<W> std::fmt::Debug for Entity<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity").field("core", &self.core).finish()
    }
}
