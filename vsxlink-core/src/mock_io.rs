//! Scripted IoProvider used by the unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddrV4;

use crate::io::{IoError, IoProvider, TcpSocketHandle};

#[derive(Default)]
struct MockSocket {
    addr: Option<SocketAddrV4>,
    connected: bool,
    inbound: VecDeque<u8>,
    peer_closed: bool,
}

/// Fake network: connect results, inbound bytes and a clock are all set by
/// the test; every send is recorded.
#[derive(Default)]
pub struct MockIo {
    next_handle: i32,
    sockets: HashMap<i32, MockSocket>,
    /// Error returned by the next `tcp_connect` calls (None = accept)
    pub connect_error: Option<IoError>,
    /// Error returned by the next `tcp_send` call
    pub send_error: Option<IoError>,
    /// Everything written, as (handle, text)
    pub sent: Vec<(i32, String)>,
    pub connect_attempts: u32,
    pub closed: Vec<i32>,
    pub now_ms: u64,
    pub logs: RefCell<Vec<String>>,
}

impl MockIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse_connections(&mut self) {
        self.connect_error = Some(IoError::connection_refused());
    }

    /// Queue inbound text on the most recently connected socket.
    pub fn push_inbound(&mut self, text: &str) {
        if let Some(sock) = self.latest_connected_mut() {
            sock.inbound.extend(text.as_bytes());
        }
    }

    pub fn push_inbound_bytes(&mut self, bytes: &[u8]) {
        if let Some(sock) = self.latest_connected_mut() {
            sock.inbound.extend(bytes);
        }
    }

    /// Simulate the receiver closing the connection.
    pub fn close_from_peer(&mut self) {
        if let Some(sock) = self.latest_connected_mut() {
            sock.peer_closed = true;
        }
    }

    pub fn advance(&mut self, ms: u64) {
        self.now_ms += ms;
    }

    /// Commands sent so far, terminator stripped.
    pub fn sent_commands(&self) -> Vec<String> {
        self.sent
            .iter()
            .map(|(_, s)| s.trim_end_matches(&['\r', '\n'][..]).to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }

    pub fn connected_addr(&self) -> Option<SocketAddrV4> {
        self.sockets
            .values()
            .find(|s| s.connected)
            .and_then(|s| s.addr)
    }

    fn latest_connected_mut(&mut self) -> Option<&mut MockSocket> {
        let handle = self
            .sockets
            .iter()
            .filter(|(_, s)| s.connected)
            .map(|(h, _)| *h)
            .max()?;
        self.sockets.get_mut(&handle)
    }
}

impl IoProvider for MockIo {
    fn tcp_create(&mut self) -> Result<TcpSocketHandle, IoError> {
        self.next_handle += 1;
        self.sockets.insert(self.next_handle, MockSocket::default());
        Ok(TcpSocketHandle(self.next_handle))
    }

    fn tcp_connect(
        &mut self,
        socket: &TcpSocketHandle,
        addr: SocketAddrV4,
    ) -> Result<(), IoError> {
        self.connect_attempts += 1;
        if let Some(e) = self.connect_error.clone() {
            return Err(e);
        }
        let sock = self.sockets.get_mut(&socket.0).ok_or_else(IoError::bad_handle)?;
        sock.addr = Some(addr);
        sock.connected = true;
        Ok(())
    }

    fn tcp_is_connected(&self, socket: &TcpSocketHandle) -> bool {
        self.sockets
            .get(&socket.0)
            .map(|s| s.connected && !s.peer_closed)
            .unwrap_or(false)
    }

    fn tcp_send(&mut self, socket: &TcpSocketHandle, data: &[u8]) -> Result<usize, IoError> {
        if let Some(e) = self.send_error.take() {
            return Err(e);
        }
        match self.sockets.get(&socket.0) {
            Some(s) if s.connected && !s.peer_closed => {}
            _ => return Err(IoError::closed()),
        }
        self.sent
            .push((socket.0, String::from_utf8_lossy(data).into_owned()));
        Ok(data.len())
    }

    fn tcp_recv_raw(
        &mut self,
        socket: &TcpSocketHandle,
        buf: &mut [u8],
    ) -> Result<usize, IoError> {
        let sock = self.sockets.get_mut(&socket.0).ok_or_else(IoError::bad_handle)?;
        if sock.inbound.is_empty() {
            if sock.peer_closed {
                return Err(IoError::closed());
            }
            return Err(IoError::would_block());
        }
        let n = buf.len().min(sock.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(sock.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn tcp_close(&mut self, socket: TcpSocketHandle) -> Result<(), IoError> {
        self.closed.push(socket.0);
        match self.sockets.remove(&socket.0) {
            Some(_) => Ok(()),
            None => Err(IoError::bad_handle()),
        }
    }

    fn current_time_ms(&self) -> u64 {
        self.now_ms
    }

    fn debug(&self, msg: &str) {
        self.logs.borrow_mut().push(format!("DEBUG {}", msg));
    }

    fn info(&self, msg: &str) {
        self.logs.borrow_mut().push(format!("INFO {}", msg));
    }
}
