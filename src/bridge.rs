//! Poll loop subsystem.
//!
//! Owns the [`ReceiverEngine`], the tokio I/O provider and the label store,
//! and ticks the engine at the configured interval until shutdown is
//! requested. Commands from the console arrive over a channel and are
//! handled between ticks, so the engine is only ever touched by this task.

use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_graceful_shutdown::SubsystemHandle;
use vsxlink_core::{
    Action, ActionError, EngineEvent, ReceiverController, ReceiverEngine, VirtualLevelLink,
};

use crate::config::{Config, ConfigError};
use crate::storage::LabelStore;
use crate::tokio_io::TokioIoProvider;

/// Requests from outside the poll loop
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeCommand {
    Action { receiver_id: String, action: Action },
    SetLevel { mirror_id: String, percent: u8 },
    Gather { receiver_id: String },
}

pub struct Bridge {
    engine: ReceiverEngine,
    io: TokioIoProvider,
    labels: LabelStore,
    tick: Duration,
}

impl Bridge {
    /// Build the engine from the configuration, seeding stored labels
    pub fn new(config: &Config, mut labels: LabelStore) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut engine = ReceiverEngine::new();
        for device in &config.devices {
            let controller = ReceiverController::new(
                &device.id,
                device.display_name(),
                device.addr(),
                device.model,
            )
            .with_labels(labels.load(&device.id));
            engine.add_receiver(controller);
            info!(
                "Configured {} ({}) at {}",
                device.display_name(),
                device.model,
                device.addr()
            );
        }
        for device in &config.devices {
            for mirror in &device.mirrors {
                let link = VirtualLevelLink {
                    receiver_id: device.id.clone(),
                    zone: mirror.zone,
                };
                engine
                    .add_virtual_level(&mirror.id, link)
                    .map_err(|e| ConfigError::Device {
                        id: device.id.clone(),
                        message: e.to_string(),
                    })?;
            }
        }

        Ok(Bridge {
            engine,
            io: TokioIoProvider::with_connect_timeout(Duration::from_millis(
                config.connect_timeout_ms,
            )),
            labels,
            tick: Duration::from_millis(config.tick_ms.max(1)),
        })
    }

    pub fn engine(&self) -> &ReceiverEngine {
        &self.engine
    }

    /// Poll every receiver once and handle what came back
    pub fn tick(&mut self) {
        let events = self.engine.poll(&mut self.io);
        for event in events {
            self.handle_event(event);
        }
    }

    pub fn handle_command(&mut self, command: BridgeCommand) -> Result<(), ActionError> {
        match command {
            BridgeCommand::Action {
                receiver_id,
                action,
            } => {
                let queued = self.engine.execute(&receiver_id, &action)?;
                debug!("[{}] Queued {} command(s) for {:?}", receiver_id, queued, action);
            }
            BridgeCommand::SetLevel { mirror_id, percent } => {
                self.engine.set_virtual_level(&mirror_id, percent)?;
            }
            BridgeCommand::Gather { receiver_id } => {
                if !self.engine.contains(&receiver_id) {
                    return Err(ActionError::UnknownReceiver(receiver_id));
                }
                self.engine.gather_all(&self.io, &receiver_id);
            }
        }
        Ok(())
    }

    fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Log(line) => info!("{}", line),
            EngineEvent::StateChanged {
                receiver_id,
                key,
                value,
            } => debug!("[{}] {} = {}", receiver_id, key, value),
            EngineEvent::LabelChanged {
                receiver_id,
                labels,
                update,
            } => {
                debug!("[{}] Learned {:?}", receiver_id, update);
                if let Err(e) = self.labels.save(&receiver_id, &labels) {
                    warn!("[{}] {}", receiver_id, e);
                }
            }
            EngineEvent::VirtualLevelChanged { mirror_id, level } => {
                info!("Virtual level {}: {}%", mirror_id, level)
            }
            EngineEvent::ConnectionChanged { receiver_id, state } => {
                debug!("[{}] Connection {:?}", receiver_id, state)
            }
        }
    }

    /// Disconnect every receiver
    pub fn shutdown(&mut self) {
        let events = self.engine.shutdown(&mut self.io);
        for event in events {
            self.handle_event(event);
        }
    }

    /// Run the poll loop as a subsystem until shutdown is requested.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<BridgeCommand>,
        subsys: SubsystemHandle,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!("Bridge: polling every {:?}", self.tick);

        let mut poll_timer = interval(self.tick);
        poll_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut commands_open = true;

        loop {
            tokio::select! {
                _ = subsys.on_shutdown_requested() => {
                    info!("Bridge: Shutdown requested");
                    break;
                }
                _ = poll_timer.tick() => self.tick(),
                command = commands.recv(), if commands_open => match command {
                    Some(command) => {
                        if let Err(e) = self.handle_command(command) {
                            warn!("Rejected: {}", e);
                        }
                    }
                    None => commands_open = false,
                },
            }
        }

        self.shutdown();
        info!("Bridge: finished");
        Ok(())
    }
}
