//! Receiver Engine - manages every receiver session and the links between them
//!
//! The engine is the single place the bridge talks to. It owns:
//! - one [`ReceiverController`] per configured receiver
//! - the virtual-level links that mirror a zone's effective level
//! - the set of receivers with a status gather in flight
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       ReceiverEngine                         │
//! │  ┌──────────────────┐  ┌──────────────────┐                  │
//! │  │ ReceiverController│  │ ReceiverController│  ...            │
//! │  └────────┬─────────┘  └────────┬─────────┘                  │
//! │           │ ControllerEvent      │                           │
//! │           ▼                      ▼                           │
//! │  gather guard ── virtual levels ── EngineEvent out           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything runs on the caller's poll tick; the engine never blocks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::actions::Action;
use crate::connection::ConnectionState;
use crate::controllers::{ControllerEvent, Origin, ReceiverController};
use crate::error::ActionError;
use crate::gather;
use crate::io::IoProvider;
use crate::labels::{DeviceLabels, LabelUpdate};
use crate::protocol::command::{format_power, format_volume, percent_to_volume_code};
use crate::protocol::decode::{zone1_level, zone2_level};
use crate::protocol::tables::SPEAKER_SYSTEM_ZONE2;
use crate::state::{keys, StateValue, Zone};

/// Events reported to the host after each poll
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Operator log line, already prefixed with the receiver name
    Log(String),
    StateChanged {
        receiver_id: String,
        key: String,
        value: StateValue,
    },
    /// A label was learned and should be persisted
    LabelChanged {
        receiver_id: String,
        labels: DeviceLabels,
        update: LabelUpdate,
    },
    VirtualLevelChanged {
        mirror_id: String,
        level: u8,
    },
    ConnectionChanged {
        receiver_id: String,
        state: ConnectionState,
    },
}

/// Which zone of which receiver a virtual level controller mirrors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualLevelLink {
    pub receiver_id: String,
    pub zone: Zone,
}

#[derive(Debug, Clone)]
struct VirtualLevel {
    link: VirtualLevelLink,
    level: u8,
}

/// Progress of a gather in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GatherStage {
    /// Power, speaker layout and labels
    Initial,
    /// Per-zone status batches
    Zones,
}

/// Central engine managing all receivers.
pub struct ReceiverEngine {
    /// Sessions keyed by receiver ID
    receivers: HashMap<String, ReceiverController>,
    /// Virtual level controllers keyed by mirror ID
    virtual_levels: HashMap<String, VirtualLevel>,
    /// Receivers with a gather in flight
    gathering: HashMap<String, GatherStage>,
    /// Events produced outside poll, returned by the next poll
    pending: Vec<EngineEvent>,
}

impl Default for ReceiverEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiverEngine {
    pub fn new() -> Self {
        Self {
            receivers: HashMap::new(),
            virtual_levels: HashMap::new(),
            gathering: HashMap::new(),
            pending: Vec::new(),
        }
    }

    // =========================================================================
    // Receivers
    // =========================================================================

    /// Add a receiver session. It connects on the next poll.
    pub fn add_receiver(&mut self, controller: ReceiverController) {
        self.receivers
            .insert(controller.id().to_string(), controller);
    }

    /// Disconnect and remove a receiver session
    pub fn remove_receiver<I: IoProvider>(
        &mut self,
        io: &mut I,
        id: &str,
    ) -> Option<ReceiverController> {
        let mut controller = self.receivers.remove(id)?;
        let events = controller.shutdown(io);
        self.gathering.remove(id);
        for event in events {
            self.translate(io, id, event);
        }
        Some(controller)
    }

    pub fn get(&self, id: &str) -> Option<&ReceiverController> {
        self.receivers.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ReceiverController> {
        self.receivers.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.receivers.contains_key(id)
    }

    /// IDs of all receivers, sorted
    pub fn receiver_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.receivers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_gathering(&self, id: &str) -> bool {
        self.gathering.contains_key(id)
    }

    // =========================================================================
    // Virtual level controllers
    // =========================================================================

    /// Link a virtual level controller to a zone.
    ///
    /// The level starts at the zone's current effective level.
    pub fn add_virtual_level(
        &mut self,
        mirror_id: &str,
        link: VirtualLevelLink,
    ) -> Result<u8, ActionError> {
        let controller = self
            .receivers
            .get(&link.receiver_id)
            .ok_or_else(|| ActionError::UnknownReceiver(link.receiver_id.clone()))?;
        let s = controller.snapshot();
        let level = match link.zone {
            Zone::Zone1 => zone1_level(
                s.zone1_on(),
                s.get_float(keys::ZONE1_VOLUME),
                s.get_bool(keys::ZONE1_MUTE),
            ),
            Zone::Zone2 => zone2_level(
                s.zone2_on(),
                s.get_float(keys::ZONE2_VOLUME),
                s.get_bool(keys::ZONE2_MUTE),
                s.get_int(keys::SPEAKER_SYSTEM),
            ),
        };
        self.virtual_levels
            .insert(mirror_id.to_string(), VirtualLevel { link, level });
        Ok(level)
    }

    pub fn remove_virtual_level(&mut self, mirror_id: &str) -> bool {
        self.virtual_levels.remove(mirror_id).is_some()
    }

    /// Last level reported for a virtual level controller
    pub fn virtual_level(&self, mirror_id: &str) -> Option<u8> {
        self.virtual_levels.get(mirror_id).map(|v| v.level)
    }

    pub fn virtual_level_link(&self, mirror_id: &str) -> Option<&VirtualLevelLink> {
        self.virtual_levels.get(mirror_id).map(|v| &v.link)
    }

    /// Drive the linked zone from a virtual level controller.
    ///
    /// A zone 2 without amplified speakers only has on and off, so any
    /// non-zero level powers it on. Otherwise the level maps onto the volume
    /// range.
    pub fn set_virtual_level(&mut self, mirror_id: &str, percent: u8) -> Result<(), ActionError> {
        if percent > 100 {
            return Err(ActionError::LevelOutOfRange(percent));
        }
        let link = self
            .virtual_levels
            .get(mirror_id)
            .map(|v| v.link.clone())
            .ok_or_else(|| ActionError::UnknownVirtualLevel(mirror_id.to_string()))?;
        let controller = self
            .receivers
            .get_mut(&link.receiver_id)
            .ok_or_else(|| ActionError::UnknownReceiver(link.receiver_id.clone()))?;

        let speaker_system = controller.snapshot().get_int(keys::SPEAKER_SYSTEM);
        let command = if link.zone == Zone::Zone2 && speaker_system != SPEAKER_SYSTEM_ZONE2 {
            format_power(Zone::Zone2, percent > 0).to_string()
        } else {
            format_volume(link.zone, percent_to_volume_code(link.zone, percent))
        };
        controller.enqueue(command, Origin::Action);
        Ok(())
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Validate an action and queue its commands.
    ///
    /// Nothing is queued when validation fails. Returns the number of
    /// commands queued.
    pub fn execute(&mut self, receiver_id: &str, action: &Action) -> Result<usize, ActionError> {
        let controller = self
            .receivers
            .get_mut(receiver_id)
            .ok_or_else(|| ActionError::UnknownReceiver(receiver_id.to_string()))?;
        let commands = action.commands(controller.model(), controller.snapshot())?;
        let count = commands.len();
        controller.enqueue_all(commands, Origin::Action);
        Ok(count)
    }

    // =========================================================================
    // Status gather
    // =========================================================================

    /// Start a full status gather. Skipped while one is in flight.
    pub fn gather_all<I: IoProvider>(&mut self, io: &I, receiver_id: &str) -> bool {
        if self.gathering.contains_key(receiver_id) {
            io.debug(&format!("[{}] Gather already in flight", receiver_id));
            return false;
        }
        let Some(controller) = self.receivers.get_mut(receiver_id) else {
            return false;
        };
        self.gathering
            .insert(receiver_id.to_string(), GatherStage::Initial);
        let queries = gather::initial_queries(controller.model());
        io.debug(&format!(
            "[{}] Gathering status ({} queries)",
            receiver_id,
            queries.len()
        ));
        controller.enqueue_all(queries, Origin::Gather);
        true
    }

    /// Gather the status of one zone. Skipped while a gather is in flight.
    pub fn gather_zone<I: IoProvider>(&mut self, io: &I, receiver_id: &str, zone: Zone) -> bool {
        if self.gathering.contains_key(receiver_id) {
            io.debug(&format!(
                "[{}] Gather in flight, skipping {} batch",
                receiver_id, zone
            ));
            return false;
        }
        let Some(controller) = self.receivers.get_mut(receiver_id) else {
            return false;
        };
        let queries = gather::zone_queries(zone, controller.snapshot());
        self.gathering
            .insert(receiver_id.to_string(), GatherStage::Zones);
        controller.enqueue_all(queries, Origin::Gather);
        true
    }

    /// Move a gather on once its current stage has drained from the queue
    fn advance_gather<I: IoProvider>(&mut self, io: &I, receiver_id: &str) {
        let Some(stage) = self.gathering.get(receiver_id).copied() else {
            return;
        };
        let Some(controller) = self.receivers.get_mut(receiver_id) else {
            self.gathering.remove(receiver_id);
            return;
        };
        if controller.queue().has_origin(Origin::Gather) {
            return;
        }

        match stage {
            GatherStage::Initial => {
                let queries = gather::powered_zone_queries(controller.snapshot());
                if queries.is_empty() {
                    self.gathering.remove(receiver_id);
                    io.debug(&format!("[{}] Gather complete, no zone on", receiver_id));
                } else {
                    controller.enqueue_all(queries, Origin::Gather);
                    self.gathering
                        .insert(receiver_id.to_string(), GatherStage::Zones);
                }
            }
            GatherStage::Zones => {
                self.gathering.remove(receiver_id);
                io.debug(&format!("[{}] Gather complete", receiver_id));
            }
        }
    }

    // =========================================================================
    // Poll
    // =========================================================================

    /// Poll every receiver once. Call once per tick.
    pub fn poll<I: IoProvider>(&mut self, io: &mut I) -> Vec<EngineEvent> {
        let ids: Vec<String> = self.receivers.keys().cloned().collect();
        for id in ids {
            let events = match self.receivers.get_mut(&id) {
                Some(controller) => controller.poll(io),
                None => continue,
            };
            for event in events {
                self.translate(io, &id, event);
            }
            self.advance_gather(io, &id);
        }
        std::mem::take(&mut self.pending)
    }

    /// Disconnect every receiver for good
    pub fn shutdown<I: IoProvider>(&mut self, io: &mut I) -> Vec<EngineEvent> {
        let ids: Vec<String> = self.receivers.keys().cloned().collect();
        for id in ids {
            let events = match self.receivers.get_mut(&id) {
                Some(controller) => controller.shutdown(io),
                None => continue,
            };
            for event in events {
                self.translate(io, &id, event);
            }
        }
        self.gathering.clear();
        std::mem::take(&mut self.pending)
    }

    fn translate<I: IoProvider>(&mut self, io: &mut I, receiver_id: &str, event: ControllerEvent) {
        match event {
            ControllerEvent::Connected => {
                self.push_connection(receiver_id);
                self.gather_all(io, receiver_id);
            }
            ControllerEvent::Disconnected => {
                self.gathering.remove(receiver_id);
                self.push_connection(receiver_id);
            }
            ControllerEvent::Log(line) => self.pending.push(EngineEvent::Log(line)),
            ControllerEvent::StateChanged { key, value } => {
                self.pending.push(EngineEvent::StateChanged {
                    receiver_id: receiver_id.to_string(),
                    key,
                    value,
                })
            }
            ControllerEvent::LabelChanged(update) => {
                let labels = self
                    .receivers
                    .get(receiver_id)
                    .map(|c| c.labels().clone())
                    .unwrap_or_default();
                self.pending.push(EngineEvent::LabelChanged {
                    receiver_id: receiver_id.to_string(),
                    labels,
                    update,
                });
            }
            ControllerEvent::GatherZone(zone) => {
                self.gather_zone(io, receiver_id, zone);
            }
            ControllerEvent::VirtualLevel { zone, percent } => {
                self.update_virtual_levels(receiver_id, zone, percent)
            }
        }
    }

    fn push_connection(&mut self, receiver_id: &str) {
        // A removed receiver reports as shut down
        let state = self
            .receivers
            .get(receiver_id)
            .map(|c| c.connection_state())
            .unwrap_or(ConnectionState::ShuttingDown);
        self.pending.push(EngineEvent::ConnectionChanged {
            receiver_id: receiver_id.to_string(),
            state,
        });
    }

    fn update_virtual_levels(&mut self, receiver_id: &str, zone: Zone, percent: u8) {
        let mut changed: Vec<(String, u8)> = self
            .virtual_levels
            .iter_mut()
            .filter(|(_, v)| v.link.receiver_id == receiver_id && v.link.zone == zone)
            .filter(|(_, v)| v.level != percent)
            .map(|(mirror_id, v)| {
                v.level = percent;
                (mirror_id.clone(), percent)
            })
            .collect();
        changed.sort();
        for (mirror_id, level) in changed {
            self.pending
                .push(EngineEvent::VirtualLevelChanged { mirror_id, level });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Band;
    use crate::controllers::QueuedCommand;
    use crate::mock_io::MockIo;
    use crate::models::ModelVariant;
    use std::net::{Ipv4Addr, SocketAddrV4};

    fn engine() -> ReceiverEngine {
        let mut engine = ReceiverEngine::new();
        engine.add_receiver(ReceiverController::new(
            "den",
            "Den",
            SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 40), 8102),
            ModelVariant::Vsx1022,
        ));
        engine
    }

    fn connected() -> (ReceiverEngine, MockIo) {
        let mut io = MockIo::new();
        let mut engine = engine();
        engine.poll(&mut io);
        (engine, io)
    }

    fn logs(events: &[EngineEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::Log(l) => Some(l.clone()),
                _ => None,
            })
            .collect()
    }

    fn queued(engine: &ReceiverEngine, origin: Origin) -> Vec<String> {
        engine
            .get("den")
            .unwrap()
            .queue()
            .iter()
            .filter(|e: &&QueuedCommand| e.origin == origin)
            .map(|e| e.command.clone())
            .collect()
    }

    /// Poll until nothing is left to send
    fn drain(engine: &mut ReceiverEngine, io: &mut MockIo) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        for _ in 0..500 {
            io.advance(100);
            events.extend(engine.poll(io));
        }
        events
    }

    #[test]
    fn test_engine_creation() {
        let engine = ReceiverEngine::new();
        assert!(engine.receiver_ids().is_empty());
    }

    #[test]
    fn test_connect_starts_gather() {
        let (engine, _io) = connected();
        assert!(engine.is_gathering("den"));
        let gather = queued(&engine, Origin::Gather);
        assert_eq!(&gather[..4], &["?FL", "?P", "?AP", "?SSF"]);
    }

    #[test]
    fn test_connection_event() {
        let mut io = MockIo::new();
        let mut engine = engine();
        let events = engine.poll(&mut io);
        assert!(events.contains(&EngineEvent::ConnectionChanged {
            receiver_id: "den".into(),
            state: ConnectionState::Connected,
        }));
    }

    #[test]
    fn test_power_source_volume_batch() {
        let (mut engine, mut io) = connected();
        io.push_inbound("PWR0\rFN04\rVOL161\r");
        let events = engine.poll(&mut io);

        assert_eq!(
            logs(&events),
            vec!["Den: power on", "Den: status on (zone 1)", "Den: volume 0.0 dB"]
        );
        assert!(queued(&engine, Origin::FollowUp).contains(&"?RGB04".to_string()));

        let state = engine.get("den").unwrap().snapshot();
        assert!(state.get_bool(keys::ZONE1_POWER));
        assert_eq!(state.get_int(keys::ZONE1_SOURCE), 4);
        assert_eq!(state.get_float(keys::ZONE1_VOLUME), 0.0);
        assert!(state.get_bool(keys::ON_OFF_STATE));
        assert_eq!(state.get_text(keys::STATUS), "on (zone 1)");
    }

    #[test]
    fn test_gather_guard() {
        let (mut engine, io) = connected();
        assert!(!engine.gather_all(&io, "den"));
        assert!(!engine.gather_zone(&io, "den", Zone::Zone1));
        assert!(!engine.gather_all(&io, "nowhere"));
    }

    #[test]
    fn test_gather_runs_zone_stage_after_labels() {
        let (mut engine, mut io) = connected();
        io.push_inbound("PWR0\r");
        engine.poll(&mut io);
        drain(&mut engine, &mut io);

        let sent = io.sent_commands();
        let labels_done = sent.iter().position(|c| c == "?MCM6").unwrap();
        let volume = sent.iter().position(|c| c == "?V").unwrap();
        assert!(volume > labels_done);
        assert!(sent.contains(&"?VHT".to_string()));
        assert!(!sent.contains(&"?ZV".to_string()));
        assert!(!engine.is_gathering("den"));
    }

    #[test]
    fn test_gather_finishes_when_all_zones_off() {
        let (mut engine, mut io) = connected();
        drain(&mut engine, &mut io);
        assert!(!engine.is_gathering("den"));
        assert!(!io.sent_commands().contains(&"?V".to_string()));

        // Powering on later gathers just that zone
        io.push_inbound("APR0\r");
        engine.poll(&mut io);
        assert!(engine.is_gathering("den"));
        assert_eq!(queued(&engine, Origin::Gather), vec!["?ZV", "?Z2M", "?ZS"]);
    }

    #[test]
    fn test_disconnect_clears_gather() {
        let (mut engine, mut io) = connected();
        io.close_from_peer();
        let events = engine.poll(&mut io);
        assert!(!engine.is_gathering("den"));
        assert!(logs(&events).contains(&"Den: connection lost".to_string()));
    }

    #[test]
    fn test_zone2_mirror_follows_gating() {
        let (mut engine, mut io) = connected();
        let link = VirtualLevelLink {
            receiver_id: "den".into(),
            zone: Zone::Zone2,
        };
        assert_eq!(engine.add_virtual_level("patio", link), Ok(0));

        // Speakers not in ZONE 2 mode: on means 100 %
        io.push_inbound("SSF00\rAPR0\rZV40\r");
        let events = engine.poll(&mut io);
        assert!(events.contains(&EngineEvent::VirtualLevelChanged {
            mirror_id: "patio".into(),
            level: 100,
        }));
        assert_eq!(engine.virtual_level("patio"), Some(100));

        io.push_inbound("APR1\r");
        let events = engine.poll(&mut io);
        assert!(events.contains(&EngineEvent::VirtualLevelChanged {
            mirror_id: "patio".into(),
            level: 0,
        }));
    }

    #[test]
    fn test_zone2_mirror_follows_power_alone() {
        let (mut engine, mut io) = connected();
        let link = VirtualLevelLink {
            receiver_id: "den".into(),
            zone: Zone::Zone2,
        };
        engine.add_virtual_level("patio", link).unwrap();

        io.push_inbound("APR0\r");
        engine.poll(&mut io);
        assert_eq!(engine.virtual_level("patio"), Some(100));
    }

    #[test]
    fn test_set_virtual_level() {
        let (mut engine, _io) = connected();
        engine
            .add_virtual_level(
                "den-level",
                VirtualLevelLink {
                    receiver_id: "den".into(),
                    zone: Zone::Zone1,
                },
            )
            .unwrap();
        engine
            .add_virtual_level(
                "patio",
                VirtualLevelLink {
                    receiver_id: "den".into(),
                    zone: Zone::Zone2,
                },
            )
            .unwrap();

        engine.set_virtual_level("den-level", 50).unwrap();
        engine.set_virtual_level("patio", 30).unwrap();
        assert_eq!(queued(&engine, Origin::Action), vec!["093VL", "APO"]);

        assert_eq!(
            engine.set_virtual_level("den-level", 101),
            Err(ActionError::LevelOutOfRange(101))
        );
        assert_eq!(
            engine.set_virtual_level("attic", 10),
            Err(ActionError::UnknownVirtualLevel("attic".into()))
        );
    }

    #[test]
    fn test_execute_queues_or_rejects() {
        let (mut engine, _io) = connected();
        let tune = Action::Tune {
            band: Band::Fm,
            frequency: 99.1,
        };
        assert_eq!(engine.execute("den", &tune), Ok(6));
        assert_eq!(
            queued(&engine, Origin::Action),
            vec!["00TN", "TAC", "9TP", "9TP", "1TP", "0TP"]
        );

        let bad = Action::SetVolume {
            zone: Zone::Zone1,
            db: 20.0,
        };
        assert!(engine.execute("den", &bad).is_err());
        assert_eq!(queued(&engine, Origin::Action).len(), 6);

        assert_eq!(
            engine.execute("attic", &tune),
            Err(ActionError::UnknownReceiver("attic".into()))
        );
    }

    #[test]
    fn test_label_change_carries_store() {
        let (mut engine, mut io) = connected();
        io.push_inbound("RGB041KODI\r");
        let events = engine.poll(&mut io);
        let labels = events
            .iter()
            .find_map(|e| match e {
                EngineEvent::LabelChanged { labels, .. } => Some(labels.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(labels.source_name(4), "KODI");
    }

    #[test]
    fn test_remove_receiver_disconnects() {
        let (mut engine, mut io) = connected();
        let removed = engine.remove_receiver(&mut io, "den");
        assert!(removed.is_some());
        assert!(!io.closed.is_empty());
        assert!(engine.receiver_ids().is_empty());
        let events = engine.poll(&mut io);
        assert!(logs(&events).contains(&"Den: disconnected".to_string()));
    }

    #[test]
    fn test_shutdown_disconnects_all() {
        let (mut engine, mut io) = connected();
        let events = engine.shutdown(&mut io);
        assert!(logs(&events).contains(&"Den: disconnected".to_string()));
        let attempts = io.connect_attempts;
        io.advance(60_000);
        engine.poll(&mut io);
        assert_eq!(io.connect_attempts, attempts);
    }
}
