use std::fmt::Debug;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::NetStream;

/// TCP listening transport.
///
/// Provides bind/accept over a TCP listener plus the matching client-side
/// `connect`. Binding to port 0 picks an ephemeral port; [`TcpTransport::port`]
/// reports the one actually bound.
pub struct TcpTransport {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpTransport {
    /// Bind and listen on the given address.
    pub fn bind(addr: impl ToSocketAddrs + Debug) -> Result<Self> {
        let listener = TcpListener::bind(&addr).map_err(|e| TransportError::bind(&addr, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| TransportError::bind(&addr, e))?;

        info!(%local_addr, "listening on tcp socket");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<(NetStream, SocketAddr)> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(%peer, "accepted connection");
        Ok((NetStream::from(stream), peer))
    }

    /// Connect to a listening TCP socket (blocking).
    pub fn connect(addr: impl ToSocketAddrs + Debug) -> Result<NetStream> {
        let stream = TcpStream::connect(&addr).map_err(|e| TransportError::connect(&addr, e))?;
        debug!(?addr, "connected to tcp socket");
        Ok(NetStream::from(stream))
    }

    /// Connect with an upper bound on the time spent establishing the connection.
    pub fn connect_timeout(addr: SocketAddr, timeout: Duration) -> Result<NetStream> {
        let stream = TcpStream::connect_timeout(&reachable(addr), timeout)
            .map_err(|e| TransportError::connect(addr, e))?;
        debug!(%addr, "connected to tcp socket");
        Ok(NetStream::from(stream))
    }

    /// Unblock a thread parked in [`TcpTransport::accept`].
    ///
    /// Closing a listener does not interrupt a pending `accept` on every
    /// platform, so this opens and immediately drops a throwaway connection.
    /// The accepting side is expected to check its own stop flag first.
    pub fn wake(&self) {
        let target = reachable(self.local_addr);
        match TcpStream::connect_timeout(&target, Duration::from_millis(250)) {
            Ok(_) => debug!(%target, "woke pending accept"),
            Err(err) => debug!(%target, error = %err, "wake connection failed"),
        }
    }

    /// The address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The port this listener is bound to.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }
}

/// A wildcard bind address is not connectable everywhere; use loopback instead.
fn reachable(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), addr.port())
        }
        _ => addr,
    }
}
