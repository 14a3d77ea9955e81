use std::io;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use leadcomm_transport::TransportError;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::entity::{Entity, Workflow};
use crate::error::Result;
use crate::service::{Service, ServiceCore};

/// Pause before accepting again when the process is out of descriptors.
const EXHAUSTED_BACKOFF: Duration = Duration::from_millis(50);

/// Thread-per-connection accept loop.
///
/// Binds the entity's configured address, announces every accepted peer via
/// `on_connect` and stages it on its own scoped thread. `kill` stops
/// listening and closes every live connection, after which `run` returns
/// once all staging threads have finished.
#[derive(Default)]
pub struct AcceptLoop {
    live: Mutex<Live>,
}

#[derive(Default)]
struct Live {
    connections: Vec<Weak<Connection>>,
    closing: bool,
}

/// What the loop does after a failed `accept`.
#[derive(Debug, PartialEq, Eq)]
enum AcceptDisposition {
    /// Only the pending peer was lost; keep listening.
    Skip,
    /// Out of descriptors; back off, then keep listening.
    Backoff,
    /// The listener itself is unusable.
    Fatal,
}

fn classify_accept_error(err: &TransportError) -> AcceptDisposition {
    let TransportError::Accept(source) = err else {
        return AcceptDisposition::Fatal;
    };
    match source.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock
        | io::ErrorKind::TimedOut => AcceptDisposition::Skip,
        _ if descriptors_exhausted(source) => AcceptDisposition::Backoff,
        _ => AcceptDisposition::Fatal,
    }
}

// EMFILE / ENFILE.
#[cfg(unix)]
fn descriptors_exhausted(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(23 | 24))
}

// WSAEMFILE.
#[cfg(not(unix))]
fn descriptors_exhausted(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(10024))
}

impl AcceptLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of connections currently being staged.
    pub fn live_connections(&self) -> usize {
        self.live
            .lock()
            .connections
            .iter()
            .filter(|c| c.upgrade().is_some_and(|c| !c.closed()))
            .count()
    }

    /// Register a connection for `kill`. Once closing has begun the
    /// connection is closed on the spot and `false` is returned.
    fn track(&self, core: &ServiceCore, connection: &Arc<Connection>) -> bool {
        let mut live = self.live.lock();
        if live.closing || core.is_stopping() {
            drop(live);
            connection.close();
            return false;
        }
        live.connections.retain(|c| c.strong_count() > 0);
        live.connections.push(Arc::downgrade(connection));
        true
    }

    fn close_all(&self) {
        let connections = {
            let mut live = self.live.lock();
            live.closing = true;
            std::mem::take(&mut live.connections)
        };
        for connection in connections.iter().filter_map(Weak::upgrade) {
            connection.close();
        }
    }
}

impl Workflow for AcceptLoop {
    type Args = ();

    fn run(&self, entity: &Entity<Self>, _args: ()) -> Result<()> {
        let core = entity.core();
        let listener = core.bind()?;
        info!(service = %core, addr = %listener.local_addr(), "accepting connections");

        thread::scope(|scope| -> Result<()> {
            let mut accepted = 0u64;
            loop {
                let accept = listener.accept();
                if core.is_stopping() {
                    debug!(service = %core, "accept loop stopping");
                    break;
                }
                let (stream, address) = match accept {
                    Ok(pair) => pair,
                    Err(err) => match classify_accept_error(&err) {
                        AcceptDisposition::Skip => {
                            warn!(service = %core, error = %err, "accept failed, skipping peer");
                            continue;
                        }
                        AcceptDisposition::Backoff => {
                            warn!(service = %core, error = %err, "out of descriptors, backing off");
                            thread::sleep(EXHAUSTED_BACKOFF);
                            continue;
                        }
                        AcceptDisposition::Fatal => {
                            // Staged threads only finish once their connections close.
                            self.close_all();
                            return Err(err.into());
                        }
                    },
                };

                let connection = match Connection::accepted(Arc::clone(core), stream, address) {
                    Ok(connection) => Arc::new(connection),
                    Err(err) => {
                        warn!(service = %core, peer = %address, error = %err, "rejecting connection");
                        continue;
                    }
                };
                if !self.track(core, &connection) {
                    debug!(service = %core, peer = %address, "dropped connection accepted during kill");
                    break;
                }
                entity.callback().on_connect(core, &connection);

                accepted += 1;
                let staged = Arc::clone(&connection);
                let spawned = thread::Builder::new()
                    .name(format!("{}-conn-{accepted}", core.name()))
                    .spawn_scoped(scope, move || entity.stage(&staged));
                if let Err(err) = spawned {
                    warn!(service = %core, peer = %address, error = %err, "could not stage connection");
                    connection.close();
                }
            }
            Ok(())
        })
    }

    fn kill(&self, entity: &Entity<Self>) -> Result<()> {
        info!(service = %entity.core(), "killing entity");
        entity.core().stop_listening();
        self.close_all();
        Ok(())
    }
}
