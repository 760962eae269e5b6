//! Operator console subsystem.
//!
//! Reads one command per line from standard input and forwards it to the
//! poll loop:
//!
//! ```text
//! den volume zone1 -35.5     <receiver id> <action>
//! level patio-level 40       set a virtual level controller
//! gather den                 request a full status gather
//! ```
//!
//! See [`vsxlink_core::actions`] for the action forms.

use log::{info, warn};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_graceful_shutdown::SubsystemHandle;
use vsxlink_core::{Action, ActionError};

use crate::bridge::BridgeCommand;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsoleError {
    #[error("expected an action after {0:?}")]
    MissingAction(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error(transparent)]
    Action(#[from] ActionError),
}

/// Parse one console line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<BridgeCommand>, ConsoleError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (first, rest) = match line.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (line, ""),
    };

    let command = match first {
        "level" => {
            let mut words = rest.split_whitespace();
            let usage = ConsoleError::Usage("level <mirror id> <0-100>");
            let mirror_id = words.next().ok_or(usage.clone())?;
            let percent = words
                .next()
                .and_then(|w| w.parse::<u8>().ok())
                .ok_or(usage)?;
            BridgeCommand::SetLevel {
                mirror_id: mirror_id.to_string(),
                percent,
            }
        }
        "gather" if !rest.is_empty() => BridgeCommand::Gather {
            receiver_id: rest.to_string(),
        },
        "gather" => return Err(ConsoleError::Usage("gather <receiver id>")),
        receiver_id => {
            if rest.is_empty() {
                return Err(ConsoleError::MissingAction(receiver_id.to_string()));
            }
            BridgeCommand::Action {
                receiver_id: receiver_id.to_string(),
                action: rest.parse::<Action>()?,
            }
        }
    };
    Ok(Some(command))
}

/// Run the console as a subsystem. End of input stops the console only.
pub async fn run(
    commands: mpsc::Sender<BridgeCommand>,
    subsys: SubsystemHandle,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("Console: reading commands from standard input");

    loop {
        tokio::select! {
            _ = subsys.on_shutdown_requested() => break,
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("Console: end of input");
                    break;
                };
                match parse_line(&line) {
                    Ok(Some(command)) => {
                        if commands.send(command).await.is_err() {
                            warn!("Console: bridge has stopped");
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Console: {}", e),
                }
            }
        }
    }
    Ok(())
}
