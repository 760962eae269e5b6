//! Outbound command pacing
//!
//! The receiver drops commands that arrive too quickly. Each queued command
//! carries the delay that must pass after it is sent before the next one
//! goes out; the controller asks [`CommandQueue::pop_ready`] once per tick.

use std::collections::VecDeque;

use crate::protocol::command::delay_after;

/// Why a command was queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Part of a status gather batch
    Gather,
    /// Query requested by a decoded response
    FollowUp,
    /// Host action
    Action,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueuedCommand {
    pub command: String,
    pub delay_ms: u64,
    pub origin: Origin,
}

#[derive(Debug, Default)]
pub struct CommandQueue {
    entries: VecDeque<QueuedCommand>,
    /// Earliest time the next command may be sent
    next_send_at: u64,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command with its standard delay
    pub fn push(&mut self, command: impl Into<String>, origin: Origin) {
        let command = command.into();
        let delay_ms = delay_after(&command);
        self.entries.push_back(QueuedCommand {
            command,
            delay_ms,
            origin,
        });
    }

    pub fn extend<S: Into<String>>(&mut self, commands: impl IntoIterator<Item = S>, origin: Origin) {
        for c in commands {
            self.push(c, origin);
        }
    }

    /// Take the next command if its turn has come, and start its delay
    pub fn pop_ready(&mut self, now_ms: u64) -> Option<QueuedCommand> {
        if now_ms < self.next_send_at {
            return None;
        }
        let entry = self.entries.pop_front()?;
        self.next_send_at = now_ms + entry.delay_ms;
        Some(entry)
    }

    /// Put back a command that could not be written; it goes first next time
    pub fn retry(&mut self, entry: QueuedCommand, now_ms: u64) {
        self.entries.push_front(entry);
        self.next_send_at = now_ms;
    }

    pub fn has_origin(&self, origin: Origin) -> bool {
        self.entries.iter().any(|e| e.origin == origin)
    }

    pub fn contains(&self, command: &str) -> bool {
        self.entries.iter().any(|e| e.command == command)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedCommand> {
        self.entries.iter()
    }

    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.command.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop everything queued. Pacing restarts immediately.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_send_at = 0;
    }
}
