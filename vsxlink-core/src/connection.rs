//! Connection state machine for receiver communication.
//!
//! The [`ConnectionManager`] exclusively owns the TCP socket of one device
//! session. All transitions happen from the single poll loop, so there is no
//! locking: whoever holds `&mut ConnectionManager` owns the socket.
//!
//! ```text
//!  disconnected ──connect()──▶ connecting ──ok──▶ connected
//!       ▲                         │                  │
//!       │◀── retry gate reset ────┘                  │
//!       │◀── disconnect() ───────────────────────────┤
//!       │◀── closed by peer ─────────────────────────┤
//!     error ◀── other I/O failure ───────────────────┘
//! ```
//!
//! # Retry gate
//!
//! A failed attempt leaves the manager in `connecting` with the connecting
//! flag set. Every further `connect()` call only counts; once the count
//! passes [`RETRY_GATE_TICKS`] the flag is cleared and the next call makes a
//! real attempt. At a 100ms tick this gives one attempt roughly every 30s.
//!
//! # Usage
//!
//! ```rust,ignore
//! use vsxlink_core::connection::{ConnectionManager, ConnectOutcome};
//!
//! let mut conn = ConnectionManager::new("vsx-1");
//! match conn.connect(io, addr) {
//!     ConnectOutcome::Connected => { /* start a full status gather */ }
//!     _ => {}
//! }
//! ```

use std::net::SocketAddrV4;

use serde::{Deserialize, Serialize};

use crate::io::{IoError, IoProvider, TcpSocketHandle};

/// Number of `connect()` calls a failed attempt waits before retrying.
pub const RETRY_GATE_TICKS: u32 = 300;

/// Priming sequence sent right after the socket opens.
const PRIMING: &[u8] = b"\r\n";

// =============================================================================
// Connection State
// =============================================================================

/// Connection state of a device session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Not connected, next `connect()` makes an attempt
    #[default]
    Disconnected,
    /// An attempt failed and the retry gate is counting
    Connecting,
    /// Socket open, commands can be sent
    Connected,
    /// I/O failure other than a closed connection
    Error,
    /// Engine is stopping, no more attempts
    ShuttingDown,
}

impl ConnectionState {
    /// Check if the connection is usable for sending commands
    pub fn can_send(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Check if we should attempt reconnection
    pub fn should_reconnect(&self) -> bool {
        matches!(
            self,
            ConnectionState::Disconnected | ConnectionState::Connecting | ConnectionState::Error
        )
    }

    /// Lowercase name used for the `status` state
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
            ConnectionState::ShuttingDown => "disconnected",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Error => write!(f, "Error"),
            ConnectionState::ShuttingDown => write!(f, "Shutting Down"),
        }
    }
}

/// Result of one `connect()` invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectOutcome {
    /// Socket was already open, nothing done
    AlreadyConnected,
    /// Socket opened and primed; caller should gather full status
    Connected,
    /// Attempt made and refused by the receiver
    Refused(IoError),
    /// Attempt made and failed for another reason
    Failed(IoError),
    /// Previous attempt failed, gate still counting
    Waiting { retry_count: u32 },
    /// Gate expired, connecting flag cleared
    GateReset,
    /// Manager has been shut down
    ShuttingDown,
}

// =============================================================================
// Connection Manager
// =============================================================================

/// Owns the socket of one device session and its connect/retry state.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Device id (for logging)
    device_id: String,
    /// Open socket, present only while connected
    socket: Option<TcpSocketHandle>,
    /// Current connection state
    state: ConnectionState,
    /// Set after a failed attempt until the retry gate expires
    connecting: bool,
    /// `connect()` calls since the last real attempt failed
    retry_count: u32,
    /// Number of times the retry gate expired (diagnostics)
    gate_resets: u32,
}

impl ConnectionManager {
    /// Create a new connection manager in disconnected state.
    pub fn new(device_id: &str) -> Self {
        ConnectionManager {
            device_id: device_id.to_string(),
            socket: None,
            state: ConnectionState::Disconnected,
            connecting: false,
            retry_count: 0,
            gate_resets: 0,
        }
    }

    /// Get current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Get the open socket, if any.
    pub fn socket(&self) -> Option<TcpSocketHandle> {
        self.socket
    }

    pub fn is_connected(&self) -> bool {
        self.state.can_send() && self.socket.is_some()
    }

    /// Whether a failed attempt is waiting on the retry gate.
    pub fn is_connecting(&self) -> bool {
        self.connecting
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn gate_resets(&self) -> u32 {
        self.gate_resets
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Attempt to connect, at most once per call.
    pub fn connect<I: IoProvider>(&mut self, io: &mut I, addr: SocketAddrV4) -> ConnectOutcome {
        match self.state {
            ConnectionState::ShuttingDown => return ConnectOutcome::ShuttingDown,
            ConnectionState::Connected if self.socket.is_some() => {
                return ConnectOutcome::AlreadyConnected
            }
            _ => {}
        }

        if self.connecting {
            self.retry_count += 1;
            if self.retry_count > RETRY_GATE_TICKS {
                io.debug(&format!(
                    "[{}] Retry gate expired after {} ticks",
                    self.device_id, RETRY_GATE_TICKS
                ));
                self.connecting = false;
                self.retry_count = 0;
                self.gate_resets += 1;
                self.state = ConnectionState::Disconnected;
                return ConnectOutcome::GateReset;
            }
            return ConnectOutcome::Waiting {
                retry_count: self.retry_count,
            };
        }

        self.connecting = true;
        self.state = ConnectionState::Connecting;
        io.debug(&format!("[{}] Connecting to {}", self.device_id, addr));

        let socket = match io.tcp_create() {
            Ok(s) => s,
            Err(e) => return self.attempt_failed(e),
        };
        if let Err(e) = io.tcp_connect(&socket, addr) {
            let _ = io.tcp_close(socket);
            return self.attempt_failed(e);
        }
        match io.tcp_send(&socket, PRIMING) {
            Ok(_) => {}
            // The connection is up; priming only wakes the receiver
            Err(e) if e.is_would_block() => {
                io.debug(&format!("[{}] Priming skipped: {}", self.device_id, e));
            }
            Err(e) => {
                let _ = io.tcp_close(socket);
                return self.attempt_failed(e);
            }
        }

        self.socket = Some(socket);
        self.state = ConnectionState::Connected;
        self.connecting = false;
        self.retry_count = 0;
        ConnectOutcome::Connected
    }

    fn attempt_failed(&mut self, e: IoError) -> ConnectOutcome {
        self.retry_count += 1;
        if e.is_connection_refused() {
            ConnectOutcome::Refused(e)
        } else {
            ConnectOutcome::Failed(e)
        }
    }

    /// Close the socket and return to `disconnected`.
    ///
    /// Always succeeds; a socket that is already gone is not an error.
    pub fn disconnect<I: IoProvider>(&mut self, io: &mut I) {
        if let Some(socket) = self.socket.take() {
            match io.tcp_close(socket) {
                Ok(()) => {}
                Err(e) if e.is_closed() => {}
                Err(e) => io.debug(&format!("[{}] Close failed: {}", self.device_id, e)),
            }
        }
        if self.state != ConnectionState::ShuttingDown {
            self.state = ConnectionState::Disconnected;
        }
        self.connecting = false;
        self.retry_count = 0;
    }

    /// Close the socket after a non-recoverable I/O error.
    ///
    /// The next `connect()` makes a fresh attempt.
    pub fn mark_error<I: IoProvider>(&mut self, io: &mut I) {
        self.disconnect(io);
        if self.state != ConnectionState::ShuttingDown {
            self.state = ConnectionState::Error;
        }
    }

    /// Disconnect and refuse further attempts.
    pub fn shutdown<I: IoProvider>(&mut self, io: &mut I) {
        self.disconnect(io);
        self.state = ConnectionState::ShuttingDown;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_io::MockIo;
    use std::net::Ipv4Addr;

    fn addr() -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 40), 8102)
    }

    #[test]
    fn test_initial_state() {
        let conn = ConnectionManager::new("vsx");
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(!conn.is_connected());
        assert!(conn.socket().is_none());
    }

    #[test]
    fn test_connect_sends_priming_sequence() {
        let mut io = MockIo::new();
        let mut conn = ConnectionManager::new("vsx");

        assert_eq!(conn.connect(&mut io, addr()), ConnectOutcome::Connected);
        assert!(conn.is_connected());
        assert_eq!(io.sent.len(), 1);
        assert_eq!(io.sent[0].1, "\r\n");
        assert_eq!(io.connected_addr(), Some(addr()));

        // Second call is a no-op
        assert_eq!(conn.connect(&mut io, addr()), ConnectOutcome::AlreadyConnected);
        assert_eq!(io.connect_attempts, 1);
    }

    #[test]
    fn test_priming_would_block_still_connects() {
        let mut io = MockIo::new();
        io.send_error = Some(IoError::would_block());
        let mut conn = ConnectionManager::new("vsx");

        assert_eq!(conn.connect(&mut io, addr()), ConnectOutcome::Connected);
        assert!(conn.is_connected());
        assert!(io.closed.is_empty());
        assert_eq!(conn.retry_count(), 0);
    }

    #[test]
    fn test_priming_failure_discards_socket() {
        let mut io = MockIo::new();
        io.send_error = Some(IoError::connection_reset());
        let mut conn = ConnectionManager::new("vsx");

        assert!(matches!(
            conn.connect(&mut io, addr()),
            ConnectOutcome::Failed(_)
        ));
        assert_eq!(io.closed.len(), 1);
        assert!(conn.is_connecting());
    }

    #[test]
    fn test_refused_then_waiting() {
        let mut io = MockIo::new();
        io.refuse_connections();
        let mut conn = ConnectionManager::new("vsx");

        assert!(matches!(
            conn.connect(&mut io, addr()),
            ConnectOutcome::Refused(_)
        ));
        assert_eq!(conn.state(), ConnectionState::Connecting);
        assert!(conn.is_connecting());
        assert_eq!(
            conn.connect(&mut io, addr()),
            ConnectOutcome::Waiting { retry_count: 2 }
        );
        assert_eq!(io.connect_attempts, 1);
    }

    #[test]
    fn test_retry_gate_resets_once_in_301_attempts() {
        let mut io = MockIo::new();
        io.refuse_connections();
        let mut conn = ConnectionManager::new("vsx");

        let mut resets = Vec::new();
        for attempt in 1..=301u32 {
            if conn.connect(&mut io, addr()) == ConnectOutcome::GateReset {
                resets.push(attempt);
            }
            assert!(conn.retry_count() <= RETRY_GATE_TICKS);
        }

        assert_eq!(resets, vec![301]);
        assert_eq!(conn.gate_resets(), 1);
        assert!(!conn.is_connecting());
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        // Only the first call really hit the network
        assert_eq!(io.connect_attempts, 1);

        // The call after the reset makes a real attempt again
        assert!(matches!(
            conn.connect(&mut io, addr()),
            ConnectOutcome::Refused(_)
        ));
        assert_eq!(io.connect_attempts, 2);
    }

    #[test]
    fn test_other_failure_is_classified() {
        let mut io = MockIo::new();
        io.connect_error = Some(IoError::from_code(-113));
        let mut conn = ConnectionManager::new("vsx");
        assert!(matches!(
            conn.connect(&mut io, addr()),
            ConnectOutcome::Failed(_)
        ));
        // Failed socket was discarded
        assert_eq!(io.closed.len(), 1);
    }

    #[test]
    fn test_disconnect_tolerates_already_closed() {
        let mut io = MockIo::new();
        let mut conn = ConnectionManager::new("vsx");
        conn.connect(&mut io, addr());
        let socket = conn.socket().unwrap();

        // Provider already forgot the socket
        io.tcp_close(socket).unwrap();
        conn.disconnect(&mut io);
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(conn.socket().is_none());

        // Disconnecting twice is harmless
        conn.disconnect(&mut io);
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_disconnect_clears_connecting_flag() {
        let mut io = MockIo::new();
        io.refuse_connections();
        let mut conn = ConnectionManager::new("vsx");
        conn.connect(&mut io, addr());
        assert!(conn.is_connecting());

        conn.disconnect(&mut io);
        assert!(!conn.is_connecting());
        assert_eq!(conn.retry_count(), 0);
    }

    #[test]
    fn test_error_state_reconnects_next_call() {
        let mut io = MockIo::new();
        let mut conn = ConnectionManager::new("vsx");
        conn.connect(&mut io, addr());
        conn.mark_error(&mut io);
        assert_eq!(conn.state(), ConnectionState::Error);
        assert!(conn.state().should_reconnect());

        assert_eq!(conn.connect(&mut io, addr()), ConnectOutcome::Connected);
        assert_eq!(io.connect_attempts, 2);
    }

    #[test]
    fn test_shutdown_refuses_attempts() {
        let mut io = MockIo::new();
        let mut conn = ConnectionManager::new("vsx");
        conn.connect(&mut io, addr());
        conn.shutdown(&mut io);
        assert_eq!(conn.state(), ConnectionState::ShuttingDown);
        assert_eq!(conn.connect(&mut io, addr()), ConnectOutcome::ShuttingDown);
        assert_eq!(io.connect_attempts, 1);
    }

    #[test]
    fn test_state_names() {
        assert_eq!(ConnectionState::Connecting.as_str(), "connecting");
        assert_eq!(format!("{}", ConnectionState::ShuttingDown), "Shutting Down");
    }
}
