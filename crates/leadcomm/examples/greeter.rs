//! Greets every peer and prints what it says until it disconnects.
//!
//! Run with:
//!   cargo run --example greeter
//!
//! In another terminal:
//!   cargo run --features cli -- send 127.0.0.1:7878 --data hello --wait

use std::sync::Arc;

use leadcomm::service::{
    AcceptLoop, Callback, Connection, Entity, Service, ServiceConfig, ServiceCore,
};

struct Greeter;

impl Callback for Greeter {
    fn on_connect(&self, service: &ServiceCore, connection: &Arc<Connection>) {
        eprintln!("{connection} connected to {service}");
        let _ = connection.send(b"welcome");
    }

    fn on_receive(&self, _service: &ServiceCore, message: &[u8]) {
        println!("{}", String::from_utf8_lossy(message));
    }

    fn on_disconnect(&self, _service: &ServiceCore) {
        eprintln!("peer left");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let core = ServiceCore::with_config(ServiceConfig::new(7878).with_name("greeter"));
    let entity = Arc::new(Entity::new(core, Greeter, AcceptLoop::new()));

    eprintln!("listening on port {}", entity.port());
    entity.start(false, ())?;
    Ok(())
}
