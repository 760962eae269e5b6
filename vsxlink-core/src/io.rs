//! I/O abstraction for platform-independent receiver code.
//!
//! This module defines the trait that abstracts socket operations, so the
//! connection manager, controllers and engine can run against tokio sockets
//! in the bridge and against a scripted fake in tests.
//!
//! # Design
//!
//! The trait uses a **poll-based** interface (not async):
//! - the engine is driven by a fixed ~100ms tick
//! - "no data yet" is a normal outcome of every read, reported as
//!   [`IoError::would_block`] rather than by blocking
//!
//! # Example
//!
//! ```rust,ignore
//! use vsxlink_core::io::{IoProvider, IoProviderExt};
//! use std::net::{Ipv4Addr, SocketAddrV4};
//!
//! fn query_power<I: IoProvider>(io: &mut I) {
//!     let socket = io.tcp_create().unwrap();
//!     io.tcp_connect(&socket, SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 40), 8102))
//!         .unwrap();
//!     io.tcp_send(&socket, b"?P\r").unwrap();
//!
//!     // Later, on the next tick
//!     if let Ok(bytes) = io.tcp_recv_available(&socket) {
//!         // b"PWR0\r\n"
//!     }
//! }
//! ```

use core::fmt;
use std::net::SocketAddrV4;

// =============================================================================
// Error Types
// =============================================================================

/// I/O error type for socket operations.
///
/// Codes follow the negated POSIX errno convention so that every provider
/// can classify failures the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoError {
    /// Error code (negative values indicate errors)
    pub code: i32,
    /// Human-readable error message
    pub message: String,
}

impl IoError {
    const WOULD_BLOCK: i32 = -11;
    const NOT_CONNECTED: i32 = -107;
    const CONNECTION_REFUSED: i32 = -111;
    const CONNECTION_RESET: i32 = -104;
    const BROKEN_PIPE: i32 = -32;
    const BAD_HANDLE: i32 = -9;

    /// Create a new I/O error with a code and message.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create an error from just a code (message will be generic).
    pub fn from_code(code: i32) -> Self {
        Self {
            code,
            message: format!("I/O error: {}", code),
        }
    }

    /// Create a "would block" error (no data available, non-blocking).
    pub fn would_block() -> Self {
        Self::new(Self::WOULD_BLOCK, "Operation would block")
    }

    /// Create a "not connected" error.
    pub fn not_connected() -> Self {
        Self::new(Self::NOT_CONNECTED, "Not connected")
    }

    /// Create a "connection refused" error.
    pub fn connection_refused() -> Self {
        Self::new(Self::CONNECTION_REFUSED, "Connection refused")
    }

    /// Create a "connection reset by peer" error.
    pub fn connection_reset() -> Self {
        Self::new(Self::CONNECTION_RESET, "Connection reset by peer")
    }

    /// Create a "connection closed" error (EOF or broken pipe).
    pub fn closed() -> Self {
        Self::new(Self::BROKEN_PIPE, "Connection closed")
    }

    /// Create an "invalid socket handle" error.
    pub fn bad_handle() -> Self {
        Self::new(Self::BAD_HANDLE, "Invalid socket handle")
    }

    /// Check if this is a "would block" error.
    pub fn is_would_block(&self) -> bool {
        self.code == Self::WOULD_BLOCK
    }

    /// Check if the peer refused the connection.
    pub fn is_connection_refused(&self) -> bool {
        self.code == Self::CONNECTION_REFUSED
    }

    /// Check if the connection is gone (closed, reset, never open).
    pub fn is_closed(&self) -> bool {
        matches!(
            self.code,
            Self::BROKEN_PIPE | Self::CONNECTION_RESET | Self::NOT_CONNECTED | Self::BAD_HANDLE
        )
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

// =============================================================================
// Socket Handle Types
// =============================================================================

/// Opaque handle to a TCP socket.
///
/// The actual socket lives in the provider; this is just its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TcpSocketHandle(pub i32);

// =============================================================================
// IoProvider Trait
// =============================================================================

/// Platform-independent I/O provider.
///
/// All operations are non-blocking apart from `tcp_connect`, which may wait
/// up to the provider's connect timeout. Receive operations return
/// [`IoError::would_block`] when nothing is pending.
pub trait IoProvider {
    // -------------------------------------------------------------------------
    // TCP Operations
    // -------------------------------------------------------------------------

    /// Create a new TCP socket.
    fn tcp_create(&mut self) -> Result<TcpSocketHandle, IoError>;

    /// Connect a TCP socket to the given address.
    fn tcp_connect(&mut self, socket: &TcpSocketHandle, addr: SocketAddrV4)
        -> Result<(), IoError>;

    /// Check if a TCP socket is connected.
    fn tcp_is_connected(&self, socket: &TcpSocketHandle) -> bool;

    /// Send data over a TCP connection.
    ///
    /// Returns the number of bytes sent.
    fn tcp_send(&mut self, socket: &TcpSocketHandle, data: &[u8]) -> Result<usize, IoError>;

    /// Receive whatever raw data is available (non-blocking).
    ///
    /// Returns `Err(would_block)` when no data is pending and
    /// `Err(closed)` when the peer has closed the connection.
    fn tcp_recv_raw(&mut self, socket: &TcpSocketHandle, buf: &mut [u8])
        -> Result<usize, IoError>;

    /// Close a TCP socket.
    ///
    /// Closing a socket the provider no longer knows about returns an error
    /// for which [`IoError::is_closed`] is true.
    fn tcp_close(&mut self, socket: TcpSocketHandle) -> Result<(), IoError>;

    // -------------------------------------------------------------------------
    // Utility
    // -------------------------------------------------------------------------

    /// Get current timestamp in milliseconds since some epoch.
    ///
    /// Used for command pacing. The epoch doesn't matter as long as it's
    /// consistent within the process.
    fn current_time_ms(&self) -> u64;

    /// Log a debug message.
    fn debug(&self, msg: &str);

    /// Log an info message.
    fn info(&self, msg: &str);

    /// Log a warning. Defaults to `info`.
    fn warn(&self, msg: &str) {
        self.info(msg);
    }

    /// Log an error. Defaults to `warn`.
    fn error(&self, msg: &str) {
        self.warn(msg);
    }
}

// =============================================================================
// Helper Methods
// =============================================================================

/// Extension methods for IoProvider.
pub trait IoProviderExt: IoProvider {
    /// Drain everything currently readable.
    ///
    /// Bytes are returned as received; a multi-byte character may be split
    /// across two calls. Returns `Err(would_block)` if nothing at all was
    /// available.
    fn tcp_recv_available(&mut self, socket: &TcpSocketHandle) -> Result<Vec<u8>, IoError> {
        let mut data = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            match self.tcp_recv_raw(socket, &mut buf) {
                Ok(0) => break,
                Ok(len) => data.extend_from_slice(&buf[..len]),
                Err(e) if e.is_would_block() => break,
                Err(e) => {
                    if data.is_empty() {
                        return Err(e);
                    }
                    // Deliver what arrived before the failure; the error
                    // surfaces again on the next read.
                    break;
                }
            }
        }
        if data.is_empty() {
            Err(IoError::would_block())
        } else {
            Ok(data)
        }
    }
}

// Blanket implementation for all IoProvider types
impl<T: IoProvider> IoProviderExt for T {}

// =============================================================================
// Tests
// =============================================================================
