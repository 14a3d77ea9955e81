use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;

use leadcomm_frame::FrameConfig;
use leadcomm_service::{
    AcceptLoop, Callback, Connection, Entity, Service, ServiceConfig, ServiceCore, ServiceError,
};
use tracing::info;

use crate::cmd::ServeArgs;
use crate::exit::{service_error, CliError, CliResult, INTERNAL, INTERRUPTED, SUCCESS};
use crate::output::{print_message, OutputFormat};

/// Why the foreground thread stopped waiting.
#[derive(Debug)]
enum Stop {
    Interrupted,
    CountReached,
    Failed(CliError),
}

/// Prints every message and signals the foreground thread when done.
struct Printer {
    format: OutputFormat,
    count: Option<usize>,
    printed: AtomicUsize,
    stop: Sender<Stop>,
}

impl Callback for Printer {
    fn on_initialize(&self, service: &ServiceCore) {
        info!(service = %service, "service starting");
    }

    fn on_fail(&self, _service: &ServiceCore, error: &ServiceError) {
        let _ = self.stop.send(Stop::Failed(service_error("serve failed", error)));
    }

    fn on_connect(&self, service: &ServiceCore, connection: &Arc<Connection>) {
        info!(service = %service, peer = %connection, "peer connected");
    }

    fn on_receive(&self, service: &ServiceCore, message: &[u8]) {
        let seen = self.printed.fetch_add(1, Ordering::SeqCst);
        match self.count {
            Some(count) if seen >= count => {}
            Some(count) => {
                print_message(message, service.name(), self.format);
                if seen + 1 == count {
                    let _ = self.stop.send(Stop::CountReached);
                }
            }
            None => print_message(message, service.name(), self.format),
        }
    }

    fn on_disconnect(&self, service: &ServiceCore) {
        info!(service = %service, "peer disconnected");
    }
}

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut config = ServiceConfig::new(args.port)
        .with_host(args.host)
        .with_frame_config(FrameConfig {
            chunk_size: args.chunk_size,
            max_frame_size: args.max_frame_size,
            ..FrameConfig::default()
        });
    if let Some(name) = args.name {
        config = config.with_name(name);
    }

    let (stop, stopped) = mpsc::channel();
    install_ctrlc_handler(stop.clone())?;

    let printer = Printer {
        format,
        count: args.count,
        printed: AtomicUsize::new(0),
        stop,
    };
    let entity = Arc::new(Entity::new(
        ServiceCore::with_config(config),
        printer,
        AcceptLoop::new(),
    ))
    .start(true, ())
    .map_err(|err| service_error("start failed", &err))?;

    // The printer holds a sender for the life of the entity, so this only
    // errors if the entity is gone.
    let reason = stopped.recv().unwrap_or(Stop::Interrupted);
    info!(service = %entity.core(), reason = ?reason, "stopping service");

    entity
        .kill()
        .map_err(|err| service_error("kill failed", &err))?;
    entity
        .core()
        .join()
        .map_err(|err| service_error("serve failed", &err))?;

    match reason {
        Stop::CountReached => Ok(SUCCESS),
        Stop::Interrupted => Ok(INTERRUPTED),
        Stop::Failed(err) => Err(err),
    }
}

fn install_ctrlc_handler(stop: Sender<Stop>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        let _ = stop.send(Stop::Interrupted);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
