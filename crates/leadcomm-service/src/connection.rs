use std::fmt;
use std::net::{Shutdown, SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use leadcomm_frame::{is_disconnect, FrameConfig, FrameError, FrameReader, FrameWriter, DISCONNECT};
use leadcomm_transport::{NetStream, TcpTransport};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Result, ServiceError};
use crate::service::ServiceCore;

/// One framed byte stream between this process and a peer.
///
/// Receiving and sending go through separate locks, so one thread may sit in
/// [`Connection::receive`] while another sends. [`Connection::close`] may be
/// called from any thread and wakes a blocked receive.
pub struct Connection {
    service: Option<Arc<ServiceCore>>,
    address: SocketAddr,
    reader: Mutex<FrameReader<NetStream>>,
    writer: Mutex<FrameWriter<NetStream>>,
    control: NetStream,
    closed: AtomicBool,
}

impl Connection {
    /// Wrap a stream accepted by `service` from the peer at `address`.
    pub fn accepted(
        service: Arc<ServiceCore>,
        stream: NetStream,
        address: SocketAddr,
    ) -> Result<Self> {
        let config = service.config().frame.clone();
        Self::from_parts(Some(service), stream, address, config)
    }

    /// Connect to a listening service as a client.
    ///
    /// The resulting connection has no owning service.
    pub fn connect(addr: impl ToSocketAddrs + fmt::Debug, config: FrameConfig) -> Result<Self> {
        let stream = TcpTransport::connect(addr)?;
        let address = stream.peer_addr()?;
        Self::from_parts(None, stream, address, config)
    }

    /// Like [`Connection::connect`], giving up after `timeout`.
    pub fn connect_timeout(addr: SocketAddr, timeout: Duration, config: FrameConfig) -> Result<Self> {
        let stream = TcpTransport::connect_timeout(addr, timeout)?;
        let address = stream.peer_addr()?;
        Self::from_parts(None, stream, address, config)
    }

    /// Assemble a connection from an already connected stream.
    pub fn from_parts(
        service: Option<Arc<ServiceCore>>,
        stream: NetStream,
        address: SocketAddr,
        config: FrameConfig,
    ) -> Result<Self> {
        if let Err(err) = stream.set_nodelay(true) {
            debug!(peer = %address, error = %err, "could not disable nagle");
        }
        let control = stream.try_clone()?;
        let reader = FrameReader::with_config_net(stream.try_clone()?, config.clone())?;
        let writer = FrameWriter::with_config_net(stream, config)?;

        debug!(peer = %address, "connection established");

        Ok(Self {
            service,
            address,
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            control,
            closed: AtomicBool::new(false),
        })
    }

    /// Seed the receive buffer with bytes already read from this stream.
    ///
    /// They are decoded before anything new is read from the socket.
    pub fn with_remainder(self, remainder: &[u8]) -> Self {
        let Self {
            service,
            address,
            reader,
            writer,
            control,
            closed,
        } = self;
        Self {
            service,
            address,
            reader: Mutex::new(reader.into_inner().with_remainder(remainder)),
            writer,
            control,
            closed,
        }
    }

    /// The service that accepted this connection, if any.
    pub fn service(&self) -> Option<&Arc<ServiceCore>> {
        self.service.as_ref()
    }

    /// Peer address.
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Whether [`Connection::close`] has been called. Never fails.
    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Fail with [`ServiceError::SocketNotOpen`] if the connection is closed.
    pub fn require_open(&self) -> Result<()> {
        if self.closed() {
            return Err(ServiceError::SocketNotOpen);
        }
        Ok(())
    }

    /// Next frame from the peer, delimiter stripped.
    ///
    /// Frames left over from an earlier over-read are served first. `None`
    /// means no frame is available any more: the connection is closed, the
    /// peer ended the stream, or the read failed. An empty frame is
    /// `Some` of an empty buffer.
    pub fn receive(&self) -> Option<Bytes> {
        let mut reader = self.reader.lock();
        let chunk_size = reader.config().chunk_size;
        self.receive_locked(&mut reader, chunk_size)
    }

    /// Like [`Connection::receive`], requesting `chunk_size` bytes per socket read.
    pub fn receive_chunked(&self, chunk_size: usize) -> Option<Bytes> {
        let mut reader = self.reader.lock();
        self.receive_locked(&mut reader, chunk_size)
    }

    fn receive_locked(
        &self,
        reader: &mut FrameReader<NetStream>,
        chunk_size: usize,
    ) -> Option<Bytes> {
        match reader.buffered_frame() {
            Ok(Some(frame)) => return Some(frame),
            Ok(None) => {}
            Err(err) => {
                debug!(peer = %self, error = %err, "buffered data unusable");
                return None;
            }
        }

        if self.closed() {
            debug!(peer = %self, "receive on closed connection");
            return None;
        }

        match reader.read_frame_chunked(chunk_size) {
            Ok(frame) => Some(frame),
            Err(FrameError::ConnectionClosed) => {
                debug!(peer = %self, "stream ended");
                None
            }
            Err(err) => {
                debug!(peer = %self, error = %err, "read failed");
                None
            }
        }
    }

    /// Send one message as a frame.
    ///
    /// Sending the disconnect sentinel closes this side right after the write.
    pub fn send(&self, message: &[u8]) -> Result<()> {
        self.require_open()?;
        self.writer.lock().send(message)?;
        if is_disconnect(message) {
            debug!(peer = %self, "disconnect sent");
            self.close();
        }
        Ok(())
    }

    /// Ask the peer to hang up and close this side.
    pub fn disconnect(&self) -> Result<()> {
        self.send(DISCONNECT)
    }

    /// Close the socket in both directions. Safe to call repeatedly.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(err) = self.control.shutdown(Shutdown::Both) {
            debug!(peer = %self, error = %err, "socket shutdown failed");
        }
        debug!(peer = %self, "connection closed");
    }

    /// Bytes received but not yet returned as part of a frame.
    pub fn remainder_len(&self) -> usize {
        self.reader.lock().remainder().len()
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address.ip(), self.address.port())
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.address)
            .field("service", &self.service.as_ref().map(|s| s.name().to_string()))
            .field("closed", &self.closed())
            .finish()
    }
}
