//! Receiver session controllers using IoProvider
//!
//! Controllers are poll-based and platform-independent: every socket
//! operation and every diagnostic goes through the
//! [`IoProvider`](crate::IoProvider) trait, so the same code runs under the
//! tokio bridge and under the scripted test provider.
//!
//! Controllers don't know about the engine's virtual level links or gather
//! bookkeeping. They emit [`ControllerEvent`]s and the engine handles them.
//!
//! ```rust,ignore
//! use vsxlink_core::controllers::{ControllerEvent, ReceiverController};
//! use vsxlink_core::IoProvider;
//!
//! fn tick<I: IoProvider>(io: &mut I, controller: &mut ReceiverController) {
//!     for event in controller.poll(io) {
//!         match event {
//!             ControllerEvent::Log(line) => println!("{}", line),
//!             ControllerEvent::Connected => { /* start a status gather */ }
//!             _ => {}
//!         }
//!     }
//! }
//! ```

pub mod queue;
pub mod receiver;

pub use queue::{CommandQueue, Origin, QueuedCommand};
pub use receiver::ReceiverController;

use crate::labels::LabelUpdate;
use crate::state::{StateValue, Zone};

/// Events emitted by a controller for the engine to handle
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// Connection established. The engine starts a full status gather.
    Connected,

    /// Connection lost, failed or closed on request
    Disconnected,

    /// Operator log line, already prefixed with the receiver name
    Log(String),

    /// A state value changed
    StateChanged { key: String, value: StateValue },

    /// A label was learned or renamed on the receiver
    LabelChanged(LabelUpdate),

    /// A zone powered on and its status batch should be requested
    GatherZone(Zone),

    /// New level for virtual level controllers linked to this zone
    VirtualLevel { zone: Zone, percent: u8 },
}
