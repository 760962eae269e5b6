//! Pioneer receiver session
//!
//! One [`ReceiverController`] per configured receiver. It owns the TCP
//! connection, the state snapshot, the learned labels and the outbound
//! command queue, and is driven entirely by [`ReceiverController::poll`]:
//!
//! 1. reconnect when not connected (through the retry gate),
//! 2. read whatever arrived, split it into lines and decode them in order,
//! 3. send at most one queued command whose pacing delay has elapsed.
//!
//! Operator log lines, state changes and requests for the engine come back
//! as [`ControllerEvent`]s.

use std::net::SocketAddrV4;

use super::queue::{CommandQueue, Origin};
use super::ControllerEvent;
use crate::connection::{ConnectOutcome, ConnectionManager, ConnectionState};
use crate::error::SendError;
use crate::io::{IoError, IoProvider, IoProviderExt};
use crate::labels::DeviceLabels;
use crate::models::{ModelInfo, ModelVariant};
use crate::protocol::command::{clears_tuner_preset, frame};
use crate::protocol::decode::{decode, lacks_extended_fields, DecodeContext, Decoded, FollowUp};
use crate::state::{keys, StateGroup, StateSnapshot};

pub struct ReceiverController {
    /// Receiver ID (for logging and engine lookups)
    id: String,
    /// Display name used in operator log lines
    name: String,
    addr: SocketAddrV4,
    model: &'static ModelInfo,
    conn: ConnectionManager,
    snapshot: StateSnapshot,
    labels: DeviceLabels,
    queue: CommandQueue,
    /// Received bytes not yet terminated by CR or LF
    line_buffer: Vec<u8>,
    /// Events produced outside poll (e.g. by send), returned on next poll
    events: Vec<ControllerEvent>,
    /// A failed connect has been reported since the last success
    failure_reported: bool,
}

impl ReceiverController {
    pub fn new(id: &str, name: &str, addr: SocketAddrV4, variant: ModelVariant) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            addr,
            model: variant.info(),
            conn: ConnectionManager::new(id),
            snapshot: StateSnapshot::new(),
            labels: DeviceLabels::new(),
            queue: CommandQueue::new(),
            line_buffer: Vec::new(),
            events: Vec::new(),
            failure_reported: false,
        }
    }

    /// Start with labels restored from storage
    pub fn with_labels(mut self, labels: DeviceLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn addr(&self) -> SocketAddrV4 {
        self.addr
    }

    pub fn model(&self) -> &'static ModelInfo {
        self.model
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.conn.state()
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    pub fn snapshot(&self) -> &StateSnapshot {
        &self.snapshot
    }

    pub fn labels(&self) -> &DeviceLabels {
        &self.labels
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Queue a command for paced sending
    pub fn enqueue(&mut self, command: impl Into<String>, origin: Origin) {
        self.queue.push(command, origin);
    }

    pub fn enqueue_all<S: Into<String>>(
        &mut self,
        commands: impl IntoIterator<Item = S>,
        origin: Origin,
    ) {
        self.queue.extend(commands, origin);
    }

    // =========================================================================
    // Poll
    // =========================================================================

    /// Poll the session. Call once per tick.
    pub fn poll<I: IoProvider>(&mut self, io: &mut I) -> Vec<ControllerEvent> {
        if self.conn.state() != ConnectionState::ShuttingDown {
            if !self.conn.is_connected() {
                self.try_connect(io);
            }
            if self.conn.is_connected() {
                self.poll_receive(io);
            }
            if self.conn.is_connected() {
                self.poll_send(io);
            }
        }
        std::mem::take(&mut self.events)
    }

    fn try_connect<I: IoProvider>(&mut self, io: &mut I) {
        match self.conn.connect(io, self.addr) {
            ConnectOutcome::Connected => {
                io.info(&format!("[{}] Connected to {}", self.id, self.addr));
                self.failure_reported = false;
                self.line_buffer.clear();
                self.operator_log(format!("connected to {}", self.addr));
                self.events.push(ControllerEvent::Connected);
                let status = self.snapshot.power_status();
                self.set_status(status);
            }
            ConnectOutcome::Refused(e) => self.connect_failed("connection refused".into(), &e, io),
            ConnectOutcome::Failed(e) => {
                self.connect_failed(format!("connection failed: {}", e.message), &e, io)
            }
            ConnectOutcome::GateReset => {
                io.debug(&format!("[{}] Retrying connection to {}", self.id, self.addr));
            }
            ConnectOutcome::Waiting { .. }
            | ConnectOutcome::AlreadyConnected
            | ConnectOutcome::ShuttingDown => {}
        }
    }

    fn connect_failed<I: IoProvider>(&mut self, text: String, e: &IoError, io: &mut I) {
        io.debug(&format!("[{}] Connect to {} failed: {}", self.id, self.addr, e));
        // One line per retry series, not per attempt
        if !self.failure_reported {
            self.failure_reported = true;
            self.operator_log(text);
        }
        self.set_status("connecting");
    }

    fn poll_receive<I: IoProvider>(&mut self, io: &mut I) {
        let Some(socket) = self.conn.socket() else {
            return;
        };

        match io.tcp_recv_available(&socket) {
            Ok(bytes) => {
                self.line_buffer.extend_from_slice(&bytes);
                self.process_lines(io);
            }
            Err(e) if e.is_would_block() => {}
            Err(e) if e.is_closed() => {
                self.connection_lost(io);
                return;
            }
            Err(e) => {
                self.io_failed(io, e);
                return;
            }
        }

        if !io.tcp_is_connected(&socket) {
            self.connection_lost(io);
        }
    }

    fn poll_send<I: IoProvider>(&mut self, io: &mut I) {
        let now = io.current_time_ms();
        if let Some(entry) = self.queue.pop_ready(now) {
            match self.send(io, &entry.command) {
                Ok(()) => {}
                Err(SendError::WouldBlock) => self.queue.retry(entry, now),
                Err(e) => io.debug(&format!(
                    "[{}] Dropped {:?} ({:?}): {}",
                    self.id, entry.command, entry.origin, e
                )),
            }
        }
    }

    // =========================================================================
    // Receive path
    // =========================================================================

    fn process_lines<I: IoProvider>(&mut self, io: &mut I) {
        while let Some(pos) = self.line_buffer.iter().position(|b| *b == b'\r' || *b == b'\n') {
            let raw: Vec<u8> = self.line_buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim();
            if !line.is_empty() {
                self.handle_line(io, line);
            }
        }
    }

    fn handle_line<I: IoProvider>(&mut self, io: &mut I, line: &str) {
        io.debug(&format!("[{}] < {}", self.id, line));
        if self.model.extended_status && lacks_extended_fields(line) {
            io.debug(&format!(
                "[{}] {} sent status without extended fields",
                self.id, self.model.name
            ));
        }
        let ctx = DecodeContext {
            snapshot: &self.snapshot,
            labels: &self.labels,
        };
        match decode(line, &ctx) {
            Ok(decoded) if decoded.unrecognized => {
                io.debug(&format!("[{}] Unrecognised response {:?}", self.id, line));
            }
            Ok(decoded) => self.apply(decoded),
            Err(e) => io.warn(&format!("[{}] Ignoring {:?}: {}", self.id, line, e)),
        }
    }

    /// Apply a decoded line: state, labels, log, then follow-ups
    fn apply(&mut self, decoded: Decoded) {
        let mut status = None;
        for (key, value) in decoded.updates {
            if self.snapshot.update(key, value.clone()) {
                if key == keys::STATUS {
                    status = Some(value.to_string());
                }
                self.events.push(ControllerEvent::StateChanged {
                    key: key.to_string(),
                    value,
                });
            }
        }

        for label in decoded.labels {
            if self.labels.apply(&label) {
                self.events.push(ControllerEvent::LabelChanged(label));
            }
        }

        if let Some(text) = decoded.log {
            self.operator_log(text);
        }
        if let Some(status) = status {
            self.operator_log(format!("status {}", status));
        }

        for follow_up in decoded.follow_ups {
            match follow_up {
                FollowUp::Query(q) => self.queue.push(q, Origin::FollowUp),
                FollowUp::GatherZone(zone) => self.events.push(ControllerEvent::GatherZone(zone)),
                FollowUp::VirtualLevel { zone, percent } => {
                    self.events.push(ControllerEvent::VirtualLevel { zone, percent })
                }
            }
        }
    }

    // =========================================================================
    // Send path
    // =========================================================================

    /// Write one command now, bypassing the queue.
    ///
    /// Terminators are normalised to a single CR. A closed connection is
    /// reopened straight away. A socket that is not ready yet leaves the
    /// session untouched; any other write failure leaves it in the error
    /// state.
    pub fn send<I: IoProvider>(&mut self, io: &mut I, command: &str) -> Result<(), SendError> {
        let socket = match self.conn.socket() {
            Some(s) if self.conn.is_connected() => s,
            _ => {
                io.error(&format!(
                    "[{}] Cannot send {:?}: not connected",
                    self.id, command
                ));
                return Err(SendError::NotConnected);
            }
        };
        let framed = frame(command).ok_or(SendError::Empty)?;

        io.debug(&format!("[{}] > {}", self.id, framed.trim_end()));
        match io.tcp_send(&socket, framed.as_bytes()) {
            Ok(_) => {
                if clears_tuner_preset(&framed) {
                    self.reset_group(StateGroup::TunerPreset);
                }
                Ok(())
            }
            Err(e) if e.is_would_block() => {
                io.debug(&format!("[{}] Socket not ready for {:?}", self.id, command));
                Err(SendError::WouldBlock)
            }
            Err(e) if e.is_closed() => {
                self.connection_lost(io);
                self.try_connect(io);
                Err(SendError::Io(e))
            }
            Err(e) => {
                self.io_failed(io, e.clone());
                Err(SendError::Io(e))
            }
        }
    }

    fn reset_group(&mut self, group: StateGroup) {
        for key in self.snapshot.reset(group) {
            if let Some(value) = self.snapshot.get(key).cloned() {
                self.events.push(ControllerEvent::StateChanged {
                    key: key.to_string(),
                    value,
                });
            }
        }
    }

    // =========================================================================
    // Connection loss and teardown
    // =========================================================================

    fn connection_lost<I: IoProvider>(&mut self, io: &mut I) {
        io.debug(&format!("[{}] Connection to {} lost", self.id, self.addr));
        self.conn.disconnect(io);
        self.drop_session_buffers();
        self.operator_log("connection lost".into());
        self.events.push(ControllerEvent::Disconnected);
        self.set_status("disconnected");
    }

    fn io_failed<I: IoProvider>(&mut self, io: &mut I, e: IoError) {
        io.warn(&format!("[{}] I/O error: {}", self.id, e));
        self.conn.mark_error(io);
        self.drop_session_buffers();
        self.operator_log(format!("connection error: {}", e.message));
        self.events.push(ControllerEvent::Disconnected);
        self.set_status("error");
    }

    fn drop_session_buffers(&mut self) {
        self.line_buffer.clear();
        self.queue.clear();
    }

    /// Close the connection. The next poll reconnects.
    pub fn disconnect<I: IoProvider>(&mut self, io: &mut I) -> Vec<ControllerEvent> {
        let was_connected = self.conn.is_connected();
        self.conn.disconnect(io);
        self.drop_session_buffers();
        if was_connected {
            self.operator_log("disconnected".into());
            self.events.push(ControllerEvent::Disconnected);
        }
        self.set_status("disconnected");
        std::mem::take(&mut self.events)
    }

    /// Close the connection for good
    pub fn shutdown<I: IoProvider>(&mut self, io: &mut I) -> Vec<ControllerEvent> {
        io.debug(&format!("[{}] Shutting down", self.id));
        let events = self.disconnect(io);
        self.conn.shutdown(io);
        events
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn operator_log(&mut self, text: String) {
        self.events
            .push(ControllerEvent::Log(format!("{}: {}", self.name, text)));
    }

    fn set_status(&mut self, status: &str) {
        if self.snapshot.update(keys::STATUS, status.into()) {
            self.events.push(ControllerEvent::StateChanged {
                key: keys::STATUS.to_string(),
                value: status.into(),
            });
            self.operator_log(format!("status {}", status));
        }
    }
}
