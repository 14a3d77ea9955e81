use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use leadcomm_transport::{TcpTransport, TransportError};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::panic::format_panic;

/// Lifecycle of a service instance. There is no way back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServiceState {
    /// Constructed, `start` not yet called.
    Idle = 0,
    /// `start` has been accepted; the workflow is running or has run.
    Running = 1,
}

impl ServiceState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            _ => Self::Running,
        }
    }
}

/// State every service shares regardless of what its workflow does: the
/// configured port, the one-shot start registration, the worker handle and
/// the (lazily bound) listening socket.
///
/// Connections keep an `Arc` to the core of the service that accepted them.
pub struct ServiceCore {
    config: ServiceConfig,
    state: AtomicU8,
    worker: Mutex<Option<JoinHandle<Result<()>>>>,
    listener: Mutex<Option<Arc<TcpTransport>>>,
    stopping: AtomicBool,
}

impl ServiceCore {
    /// Core for a service on `port` with default configuration.
    pub fn new(port: u16) -> Arc<Self> {
        Self::with_config(ServiceConfig::new(port))
    }

    pub fn with_config(config: ServiceConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            state: AtomicU8::new(ServiceState::Idle as u8),
            worker: Mutex::new(None),
            listener: Mutex::new(None),
            stopping: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The configured port (0 when an ephemeral port was requested).
    pub fn port(&self) -> u16 {
        self.config.port
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn state(&self) -> ServiceState {
        ServiceState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() == ServiceState::Running
    }

    /// Claim the single start of this service.
    ///
    /// Exactly one caller ever wins; every later or concurrent caller gets
    /// [`ServiceError::AlreadyRunning`] and the winner is unaffected.
    pub fn register(&self) -> Result<()> {
        self.state
            .compare_exchange(
                ServiceState::Idle as u8,
                ServiceState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(|_| ServiceError::AlreadyRunning)
    }

    /// Undo a registration whose worker never came into existence.
    fn release_registration(&self) {
        self.state
            .store(ServiceState::Idle as u8, Ordering::Release);
    }

    fn attach_worker(&self, handle: JoinHandle<Result<()>>) {
        *self.worker.lock() = Some(handle);
    }

    /// Wait for the parallel worker to finish and return its workflow result.
    ///
    /// Returns `Ok(())` immediately if no worker was spawned or it was
    /// already joined.
    pub fn join(&self) -> Result<()> {
        let Some(handle) = self.worker.lock().take() else {
            return Ok(());
        };
        match handle.join() {
            Ok(result) => result,
            Err(panic) => Err(ServiceError::Panicked(format_panic(panic).to_string())),
        }
    }

    /// Bind the configured address, or return the listener bound earlier.
    pub fn bind(&self) -> Result<Arc<TcpTransport>> {
        let mut slot = self.listener.lock();
        if self.is_stopping() {
            return Err(TransportError::Shutdown.into());
        }
        if let Some(listener) = slot.as_ref() {
            return Ok(Arc::clone(listener));
        }
        let listener = Arc::new(TcpTransport::bind(self.config.bind_addr())?);
        info!(service = %self, addr = %listener.local_addr(), "service bound");
        *slot = Some(Arc::clone(&listener));
        Ok(listener)
    }

    /// Address actually bound, once [`ServiceCore::bind`] has succeeded.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.lock().as_ref().map(|l| l.local_addr())
    }

    /// Release the listening socket and wake a thread blocked accepting on it.
    ///
    /// Idempotent. After this, [`ServiceCore::is_stopping`] is true and
    /// [`ServiceCore::bind`] refuses to bind again.
    pub fn stop_listening(&self) {
        let listener = {
            let mut slot = self.listener.lock();
            self.stopping.store(true, Ordering::Release);
            slot.take()
        };
        if let Some(listener) = listener {
            debug!(service = %self, "stop listening");
            listener.wake();
        }
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    fn thread_name(&self) -> String {
        format!("{}-worker", self.config.name)
    }
}

impl std::fmt::Display for ServiceCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.config.name, self.config.port)
    }
}

impl std::fmt::Debug for ServiceCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCore")
            .field("name", &self.config.name)
            .field("port", &self.config.port)
            .field("state", &self.state())
            .field("stopping", &self.is_stopping())
            .finish()
    }
}

/// A network service: a workflow body plus a teardown hook, started once.
///
/// Implementors supply [`Service::run`] (for example an accept loop) and
/// [`Service::kill`]; the start discipline is provided.
pub trait Service: Send + Sync + 'static {
    /// Arguments handed to the workflow body.
    type Args: Send + 'static;

    /// Shared lifecycle state.
    fn core(&self) -> &Arc<ServiceCore>;

    /// The workflow body.
    fn run(&self, args: Self::Args) -> Result<()>;

    /// Tear the service down. Distinct from the workflow returning normally.
    fn kill(&self) -> Result<()>;

    /// Layer between [`Service::start`] and [`Service::run`].
    ///
    /// The default runs the body and lets its failure reach whoever is
    /// executing it: the caller of a blocking start, or the worker thread's
    /// join result.
    fn execute(&self, args: Self::Args) -> Result<()> {
        self.run(args)
    }

    fn port(&self) -> u16 {
        self.core().port()
    }

    /// Start the service once.
    ///
    /// With `parallel == false` the workflow runs on the calling thread and
    /// this returns after it does. With `parallel == true` exactly one worker
    /// thread is spawned and this returns without waiting for it. A second
    /// call fails with [`ServiceError::AlreadyRunning`].
    fn start(self: Arc<Self>, parallel: bool, args: Self::Args) -> Result<Arc<Self>>
    where
        Self: Sized,
    {
        let core = Arc::clone(self.core());
        core.register()?;
        info!(service = %core, parallel, "starting service");

        if !parallel {
            self.execute(args)?;
            return Ok(self);
        }

        let worker = Arc::clone(&self);
        let spawned = thread::Builder::new()
            .name(core.thread_name())
            .spawn(move || {
                let result = worker.execute(args);
                if let Err(err) = &result {
                    error!(service = %worker.core(), error = %err, "workflow failed");
                }
                result
            });

        match spawned {
            Ok(handle) => {
                core.attach_worker(handle);
                Ok(self)
            }
            Err(err) => {
                core.release_registration();
                Err(ServiceError::Spawn(err))
            }
        }
    }
}
