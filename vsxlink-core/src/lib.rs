//! # vsxlink Core
//!
//! Platform-independent control library for Pioneer VSX network receivers.
//!
//! This crate contains the protocol, state and session logic with **zero I/O
//! dependencies**. All socket access goes through the [`IoProvider`] trait, so
//! the same receiver logic runs against tokio sockets in the bridge and
//! against a scripted fake in the unit tests.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  vsxlink-core (platform-independent, no tokio/async deps)   │
//! │  ├── protocol/     (commands, response decoding, tables)    │
//! │  ├── models/       (per-model capability masks)             │
//! │  ├── controllers/  (one session per receiver, pacing queue) │
//! │  ├── engine/       (all sessions, gathers, virtual levels)  │
//! │  ├── connection    (retry gate)                             │
//! │  └── IoProvider    (abstracts TCP I/O)                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              ▲
//!                 ┌────────────┴────────────┐
//!                 │  vsxlink (bridge)       │
//!                 │  (TokioIoProvider)      │
//!                 └─────────────────────────┘
//! ```
//!
//! ## Supported Receivers
//!
//! | Model    | Default port |
//! |----------|--------------|
//! | VSX-1021 | 23           |
//! | VSX-1022 | 8102         |
//! | VSX-1122 | 8102         |
//! | VSX-1123 | 8102         |
//! | SC-75    | 8102         |
//!
//! ## Key Modules
//!
//! - [`protocol`] - Wire protocol formatting and decoding
//! - [`models`] - Model database with unsupported-code masks
//! - [`state`] - Typed state snapshot and reset groups
//! - [`labels`] - Source, preset and MCACC names learned from the receiver
//! - [`actions`] - Validated host actions
//! - [`engine`] - [`ReceiverEngine`], the poll-driven entry point
//!
//! ## Example: Driving the engine
//!
//! ```rust,no_run
//! use std::net::{Ipv4Addr, SocketAddrV4};
//! use vsxlink_core::{Action, IoProvider, ModelVariant, ReceiverController, ReceiverEngine};
//! use vsxlink_core::state::Zone;
//!
//! fn run<I: IoProvider>(io: &mut I) {
//!     let mut engine = ReceiverEngine::new();
//!     engine.add_receiver(ReceiverController::new(
//!         "den",
//!         "Den",
//!         SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 40), 8102),
//!         ModelVariant::Vsx1022,
//!     ));
//!     engine
//!         .execute("den", &Action::SetVolume { zone: Zone::Zone1, db: -40.0 })
//!         .unwrap();
//!
//!     // Once per ~100ms tick
//!     for event in engine.poll(io) {
//!         println!("{:?}", event);
//!     }
//! }
//! ```

pub mod actions;
pub mod connection;
pub mod controllers;
pub mod engine;
pub mod error;
pub mod gather;
pub mod io;
pub mod labels;
pub mod models;
pub mod protocol;
pub mod state;

#[cfg(test)]
mod mock_io;

// Re-export commonly used types
pub use actions::{Action, Band};
pub use connection::{ConnectionManager, ConnectionState};
pub use controllers::{ControllerEvent, ReceiverController};
pub use engine::{EngineEvent, ReceiverEngine, VirtualLevelLink};
pub use error::{ActionError, DecodeError, SendError};
pub use io::{IoError, IoProvider, TcpSocketHandle};
pub use labels::{DeviceLabels, LabelUpdate};
pub use models::{ModelInfo, ModelVariant};
pub use state::{StateSnapshot, StateValue, Zone};
