use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use leadcomm_frame::FrameConfig;

/// Service identity and listening configuration.
///
/// Binding is deferred: nothing here opens a socket until a workflow asks
/// the service to bind.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Name used for worker threads and log fields.
    pub name: String,
    /// Interface to listen on. Default: all IPv4 interfaces.
    pub host: IpAddr,
    /// Port to listen on. Port 0 binds an ephemeral port.
    pub port: u16,
    /// Framing and socket timeouts applied to accepted connections.
    pub frame: FrameConfig,
}

impl ServiceConfig {
    pub fn new(port: u16) -> Self {
        Self {
            name: format!("service-{port}"),
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port,
            frame: FrameConfig::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    pub fn with_frame_config(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }

    /// Socket address the service binds to.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_port() {
        let config = ServiceConfig::new(7000);
        assert_eq!(config.name, "service-7000");
        assert_eq!(config.bind_addr(), "0.0.0.0:7000".parse().unwrap());
        assert_eq!(config.frame.chunk_size, leadcomm_frame::DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn builders_override_fields() {
        let config = ServiceConfig::new(0)
            .with_name("relay")
            .with_host(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .with_frame_config(FrameConfig {
                chunk_size: 64,
                ..FrameConfig::default()
            });
        assert_eq!(config.name, "relay");
        assert_eq!(config.bind_addr(), "127.0.0.1:0".parse().unwrap());
        assert_eq!(config.frame.chunk_size, 64);
    }
}
