//! Tokio implementation of IoProvider for the bridge.
//!
//! This module provides `TokioIoProvider` which implements
//! `vsxlink_core::IoProvider` using tokio's sockets in a poll-based interface.
//!
//! Connects go through socket2 so the attempt can be bounded by a timeout
//! and TCP keepalive can be switched on; the connected stream is then handed
//! to tokio and used with `try_read`/`try_write` only.
//!
//! Tokio only learns that a fresh socket is writable once the reactor has
//! run. A write the poll loop makes before that goes straight to the socket
//! through `SockRef`.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{SocketAddr, SocketAddrV4};
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, SockRef, Socket, Type};
use tokio::net::TcpStream;
use vsxlink_core::io::{IoError, IoProvider, TcpSocketHandle};

use crate::config::DEFAULT_CONNECT_TIMEOUT_MS;

/// Internal state for a TCP socket
struct TcpSocketState {
    stream: Option<TcpStream>,
}

/// Tokio implementation of IoProvider for the bridge.
///
/// # Usage
///
/// ```rust,ignore
/// use vsxlink::tokio_io::TokioIoProvider;
/// use vsxlink_core::ReceiverEngine;
///
/// let mut io = TokioIoProvider::new();
/// let mut engine = ReceiverEngine::new();
///
/// // In your main loop:
/// let events = engine.poll(&mut io);
/// ```
pub struct TokioIoProvider {
    /// Next socket handle ID
    next_handle: i32,
    /// TCP sockets by handle
    tcp_sockets: HashMap<i32, TcpSocketState>,
    /// Start time for current_time_ms calculation
    start_time: Instant,
    connect_timeout: Duration,
}

impl TokioIoProvider {
    /// Create a new Tokio I/O provider.
    pub fn new() -> Self {
        Self::with_connect_timeout(Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS))
    }

    pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
        Self {
            next_handle: 1,
            tcp_sockets: HashMap::new(),
            start_time: Instant::now(),
            connect_timeout,
        }
    }

    fn alloc_handle(&mut self) -> i32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn stream(&self, socket: &TcpSocketHandle) -> Result<&TcpStream, IoError> {
        self.tcp_sockets
            .get(&socket.0)
            .ok_or_else(IoError::bad_handle)?
            .stream
            .as_ref()
            .ok_or_else(IoError::not_connected)
    }
}

impl Default for TokioIoProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a std I/O error onto the classification the core crate uses
fn map_io_error(e: std::io::Error, what: &str) -> IoError {
    match e.kind() {
        ErrorKind::WouldBlock => IoError::would_block(),
        ErrorKind::ConnectionRefused => IoError::connection_refused(),
        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => IoError::connection_reset(),
        ErrorKind::BrokenPipe | ErrorKind::UnexpectedEof => IoError::closed(),
        ErrorKind::NotConnected => IoError::not_connected(),
        _ => IoError::new(
            -e.raw_os_error().unwrap_or(1),
            format!("{} failed: {}", what, e),
        ),
    }
}

fn connect_stream(addr: SocketAddrV4, timeout: Duration) -> Result<TcpStream, IoError> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
        .map_err(|e| map_io_error(e, "Create socket"))?;
    socket
        .set_keepalive(true)
        .map_err(|e| map_io_error(e, "Set keepalive"))?;
    socket
        .connect_timeout(&SocketAddr::V4(addr).into(), timeout)
        .map_err(|e| map_io_error(e, "Connect"))?;
    socket
        .set_nodelay(true)
        .map_err(|e| map_io_error(e, "Set nodelay"))?;
    socket
        .set_nonblocking(true)
        .map_err(|e| map_io_error(e, "Set non-blocking"))?;

    let std_stream: std::net::TcpStream = socket.into();
    TcpStream::from_std(std_stream).map_err(|e| map_io_error(e, "Convert to tokio"))
}

impl IoProvider for TokioIoProvider {
    // -------------------------------------------------------------------------
    // TCP Operations
    // -------------------------------------------------------------------------

    fn tcp_create(&mut self) -> Result<TcpSocketHandle, IoError> {
        let handle = self.alloc_handle();
        self.tcp_sockets
            .insert(handle, TcpSocketState { stream: None });
        Ok(TcpSocketHandle(handle))
    }

    fn tcp_connect(&mut self, socket: &TcpSocketHandle, addr: SocketAddrV4) -> Result<(), IoError> {
        let timeout = self.connect_timeout;
        let state = self
            .tcp_sockets
            .get_mut(&socket.0)
            .ok_or_else(IoError::bad_handle)?;
        let stream = connect_stream(addr, timeout)?;
        log::debug!("Connected socket {} to {}", socket.0, addr);
        state.stream = Some(stream);
        Ok(())
    }

    fn tcp_is_connected(&self, socket: &TcpSocketHandle) -> bool {
        self.stream(socket)
            .map(|s| s.peer_addr().is_ok())
            .unwrap_or(false)
    }

    fn tcp_send(&mut self, socket: &TcpSocketHandle, data: &[u8]) -> Result<usize, IoError> {
        let stream = self.stream(socket)?;
        match stream.try_write(data) {
            Ok(n) => Ok(n),
            // Readiness not seen yet, ask the kernel directly
            Err(e) if e.kind() == ErrorKind::WouldBlock => SockRef::from(stream)
                .send(data)
                .map_err(|e| map_io_error(e, "Write")),
            Err(e) => Err(map_io_error(e, "Write")),
        }
    }

    fn tcp_recv_raw(&mut self, socket: &TcpSocketHandle, buf: &mut [u8]) -> Result<usize, IoError> {
        match self.stream(socket)?.try_read(buf) {
            Ok(0) => Err(IoError::closed()), // EOF
            Ok(n) => Ok(n),
            Err(e) => Err(map_io_error(e, "Read")),
        }
    }

    fn tcp_close(&mut self, socket: TcpSocketHandle) -> Result<(), IoError> {
        match self.tcp_sockets.remove(&socket.0) {
            Some(_) => Ok(()),
            None => Err(IoError::bad_handle()),
        }
    }

    // -------------------------------------------------------------------------
    // Utility
    // -------------------------------------------------------------------------

    fn current_time_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    fn debug(&self, msg: &str) {
        log::debug!("{}", msg);
    }

    fn info(&self, msg: &str) {
        log::info!("{}", msg);
    }

    fn warn(&self, msg: &str) {
        log::warn!("{}", msg);
    }

    fn error(&self, msg: &str) {
        log::error!("{}", msg);
    }
}
