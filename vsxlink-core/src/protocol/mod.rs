//! Pioneer VSX wire protocol.
//!
//! All functions are pure (no I/O).
//!
//! # Structure
//!
//! - [`command`] - Command and query formatting, pacing delays, volume scales
//! - [`decode`] - Response decoding into state updates and follow-ups
//! - [`tables`] - Code to name lookup tables
//!
//! # Example
//!
//! ```rust
//! use vsxlink_core::labels::DeviceLabels;
//! use vsxlink_core::protocol::decode::{decode, DecodeContext};
//! use vsxlink_core::state::{keys, StateSnapshot};
//!
//! let snapshot = StateSnapshot::new();
//! let labels = DeviceLabels::new();
//! let ctx = DecodeContext { snapshot: &snapshot, labels: &labels };
//!
//! let decoded = decode("PWR0", &ctx).unwrap();
//! assert_eq!(decoded.log.as_deref(), Some("power on"));
//! assert!(decoded.updates.iter().any(|(k, _)| *k == keys::ZONE1_POWER));
//! ```

pub mod command;
pub mod decode;
pub mod tables;
