//! Host actions
//!
//! An [`Action`] is validated against the receiver's model and current state
//! and turned into the commands to queue. Validation happens before anything
//! is queued, so a rejected action never leaves a partial batch behind.
//!
//! Actions also parse from a short text form used by the operator console:
//!
//! ```text
//! power zone1 on        mute zone2 toggle     volume zone1 -35.5
//! volume zone2 up       source zone1 25       tune FM 99.1
//! mode 6                button zone1 up       mcacc 2
//! raw ?RGB04
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ActionError;
use crate::models::{ModelInfo, SourceFamily};
use crate::protocol::command::{self, *};
use crate::protocol::tables;
use crate::state::{StateSnapshot, Zone};

pub const AM_MIN_KHZ: f64 = 530.0;
pub const AM_MAX_KHZ: f64 = 1700.0;
pub const AM_STEP_KHZ: f64 = 10.0;
pub const FM_MIN_MHZ: f64 = 87.5;
pub const FM_MAX_MHZ: f64 = 108.0;
pub const FM_STEP_MHZ: f64 = 0.1;

/// Tuner band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Band {
    #[serde(rename = "AM")]
    Am,
    #[serde(rename = "FM")]
    Fm,
}

impl FromStr for Band {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AM" => Ok(Band::Am),
            "FM" => Ok(Band::Fm),
            _ => Err(ActionError::UnknownBand(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Action {
    Power { zone: Zone, on: bool },
    /// `on: None` toggles
    Mute { zone: Zone, on: Option<bool> },
    VolumeStep { zone: Zone, up: bool },
    SetVolume { zone: Zone, db: f64 },
    SelectSource { zone: Zone, source: u8 },
    Tune { band: Band, frequency: f64 },
    ListeningMode { mode: u16 },
    RemoteButton { zone: Zone, button: String },
    McaccMemory { memory: u8 },
    Raw { command: String },
}

impl Action {
    /// Validate and build the command batch
    pub fn commands(
        &self,
        model: &ModelInfo,
        snapshot: &StateSnapshot,
    ) -> Result<Vec<String>, ActionError> {
        let one = |c: &str| -> Result<Vec<String>, ActionError> { Ok(vec![c.to_string()]) };
        match self {
            Action::Power { zone, on } => one(format_power(*zone, *on)),
            Action::Mute { zone, on } => one(format_mute(*zone, *on)),
            Action::VolumeStep { zone, up } => one(format_volume_step(*zone, *up)),
            Action::SetVolume { zone, db } => Ok(vec![format_volume(
                *zone,
                validate_volume(*zone, *db)?,
            )]),
            Action::SelectSource { zone, source } => {
                validate_source(model, *source)?;
                Ok(vec![format_source(*zone, *source)])
            }
            Action::Tune { band, frequency } => tune_commands(*band, *frequency),
            Action::ListeningMode { mode } => {
                if tables::listening_mode_name(*mode).is_none() {
                    return Err(ActionError::UnknownListeningMode(*mode));
                }
                if !model.supports_listening_mode(*mode) {
                    return Err(ActionError::UnsupportedListeningMode {
                        code: *mode,
                        model: model.name,
                    });
                }
                Ok(vec![format_listening_mode(*mode)])
            }
            Action::RemoteButton { zone, button } => {
                let family = SourceFamily::of(snapshot.zone_source(*zone));
                model
                    .remote_command(family, *zone, button)
                    .map(|c| vec![c.to_string()])
                    .ok_or_else(|| ActionError::InvalidButton {
                        button: button.clone(),
                        family: family.as_str(),
                    })
            }
            Action::McaccMemory { memory } => {
                if !(1..=6).contains(memory) {
                    return Err(ActionError::McaccOutOfRange(*memory));
                }
                Ok(vec![format_mcacc(*memory)])
            }
            Action::Raw { command } => {
                if command.trim().is_empty() {
                    return Err(ActionError::InvalidCommand("empty".into()));
                }
                if command.contains(['\r', '\n'].as_slice()) {
                    return Err(ActionError::InvalidCommand(
                        "embedded line terminator".into(),
                    ));
                }
                Ok(vec![command.trim().to_string()])
            }
        }
    }
}

/// Check a volume in dB and return its wire code
pub fn validate_volume(zone: Zone, db: f64) -> Result<i64, ActionError> {
    let (min, max, step) = match zone {
        Zone::Zone1 => (ZONE1_MIN_DB, ZONE1_MAX_DB, ZONE1_STEP_DB),
        Zone::Zone2 => (ZONE2_MIN_DB, ZONE2_MAX_DB, 1.0),
    };
    if !(min..=max).contains(&db) {
        return Err(ActionError::VolumeOutOfRange {
            value: db,
            min,
            max,
        });
    }
    if (db / step).fract() != 0.0 {
        return Err(ActionError::VolumeStep { value: db, step });
    }
    Ok(match zone {
        Zone::Zone1 => zone1_volume_code(db),
        Zone::Zone2 => zone2_volume_code(db),
    })
}

pub fn validate_source(model: &ModelInfo, source: u8) -> Result<(), ActionError> {
    if tables::source_name(source).is_none() {
        return Err(ActionError::UnknownSource { code: source });
    }
    if !model.supports_source(source) {
        return Err(ActionError::UnsupportedSource {
            code: source,
            model: model.name,
        });
    }
    Ok(())
}

/// Band select, direct entry, then one key per digit
pub fn tune_commands(band: Band, frequency: f64) -> Result<Vec<String>, ActionError> {
    let (min, max, step, unit, scale, select) = match band {
        Band::Am => (AM_MIN_KHZ, AM_MAX_KHZ, AM_STEP_KHZ, "kHz", 1.0, FORMAT_BAND_AM),
        Band::Fm => (FM_MIN_MHZ, FM_MAX_MHZ, FM_STEP_MHZ, "MHz", 100.0, FORMAT_BAND_FM),
    };
    if !(min..=max).contains(&frequency) {
        return Err(ActionError::FrequencyOutOfRange {
            value: frequency,
            min,
            max,
            unit,
        });
    }
    let steps = frequency / step;
    if (steps - steps.round()).abs() > 1e-6 {
        return Err(ActionError::FrequencyStep {
            value: frequency,
            step,
            unit,
        });
    }

    // FM 99.1 -> "9910", AM 530 -> "530"
    let digits = format!("{}", (frequency * scale).round() as u32);
    let mut commands = vec![select.to_string(), FORMAT_TUNER_DIRECT.to_string()];
    commands.extend(command::format_tuner_digits(&digits));
    Ok(commands)
}

// =============================================================================
// Text form
// =============================================================================

fn parse_zone(action: &'static str, word: Option<&str>) -> Result<Zone, ActionError> {
    match word {
        Some("zone1") | Some("1") => Ok(Zone::Zone1),
        Some("zone2") | Some("2") => Ok(Zone::Zone2),
        other => Err(ActionError::BadParameter {
            action,
            param: other.unwrap_or("zone").to_string(),
        }),
    }
}

fn parse_value<T: FromStr>(action: &'static str, word: Option<&str>) -> Result<T, ActionError> {
    let word = word.ok_or(ActionError::BadParameter {
        action,
        param: "value".into(),
    })?;
    word.parse().map_err(|_| ActionError::BadParameter {
        action,
        param: word.to_string(),
    })
}

impl FromStr for Action {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let verb = words.next().unwrap_or("");
        match verb {
            "power" => {
                let zone = parse_zone("power", words.next())?;
                let on = match words.next() {
                    Some("on") => true,
                    Some("off") => false,
                    other => {
                        return Err(ActionError::BadParameter {
                            action: "power",
                            param: other.unwrap_or("on|off").to_string(),
                        })
                    }
                };
                Ok(Action::Power { zone, on })
            }
            "mute" => {
                let zone = parse_zone("mute", words.next())?;
                let on = match words.next() {
                    Some("on") => Some(true),
                    Some("off") => Some(false),
                    Some("toggle") | None => None,
                    Some(other) => {
                        return Err(ActionError::BadParameter {
                            action: "mute",
                            param: other.to_string(),
                        })
                    }
                };
                Ok(Action::Mute { zone, on })
            }
            "volume" => {
                let zone = parse_zone("volume", words.next())?;
                match words.next() {
                    Some("up") => Ok(Action::VolumeStep { zone, up: true }),
                    Some("down") => Ok(Action::VolumeStep { zone, up: false }),
                    other => Ok(Action::SetVolume {
                        zone,
                        db: parse_value("volume", other)?,
                    }),
                }
            }
            "source" => {
                let zone = parse_zone("source", words.next())?;
                Ok(Action::SelectSource {
                    zone,
                    source: parse_value("source", words.next())?,
                })
            }
            "tune" => {
                let band: Band = words.next().unwrap_or("").parse()?;
                Ok(Action::Tune {
                    band,
                    frequency: parse_value("tune", words.next())?,
                })
            }
            "mode" => Ok(Action::ListeningMode {
                mode: parse_value("mode", words.next())?,
            }),
            "button" => {
                let zone = parse_zone("button", words.next())?;
                let button = words.next().ok_or(ActionError::BadParameter {
                    action: "button",
                    param: "button".into(),
                })?;
                Ok(Action::RemoteButton {
                    zone,
                    button: button.to_string(),
                })
            }
            "mcacc" => Ok(Action::McaccMemory {
                memory: parse_value("mcacc", words.next())?,
            }),
            "raw" => Ok(Action::Raw {
                command: words.collect::<Vec<_>>().join(" "),
            }),
            other => Err(ActionError::UnknownAction(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelVariant;
    use crate::state::keys;

    fn run(action: Action) -> Result<Vec<String>, ActionError> {
        action.commands(ModelVariant::Vsx1022.info(), &StateSnapshot::new())
    }

    #[test]
    fn test_zone1_volume() {
        assert_eq!(
            run(Action::SetVolume { zone: Zone::Zone1, db: -40.5 }).unwrap(),
            vec!["080VL"]
        );
        assert_eq!(
            run(Action::SetVolume { zone: Zone::Zone1, db: 12.0 }).unwrap(),
            vec!["185VL"]
        );
        assert!(matches!(
            run(Action::SetVolume { zone: Zone::Zone1, db: 12.5 }),
            Err(ActionError::VolumeOutOfRange { .. })
        ));
        assert!(matches!(
            run(Action::SetVolume { zone: Zone::Zone1, db: -40.25 }),
            Err(ActionError::VolumeStep { .. })
        ));
    }

    #[test]
    fn test_zone2_volume() {
        assert_eq!(
            run(Action::SetVolume { zone: Zone::Zone2, db: -81.0 }).unwrap(),
            vec!["00ZV"]
        );
        assert_eq!(
            run(Action::SetVolume { zone: Zone::Zone2, db: -30.0 }).unwrap(),
            vec!["51ZV"]
        );
        assert!(matches!(
            run(Action::SetVolume { zone: Zone::Zone2, db: -30.5 }),
            Err(ActionError::VolumeStep { .. })
        ));
    }

    #[test]
    fn test_source_masks() {
        assert_eq!(
            run(Action::SelectSource { zone: Zone::Zone2, source: 4 }).unwrap(),
            vec!["04ZS"]
        );
        assert_eq!(
            run(Action::SelectSource { zone: Zone::Zone1, source: 0 }),
            Err(ActionError::UnsupportedSource { code: 0, model: "VSX-1022" })
        );
        assert_eq!(
            run(Action::SelectSource { zone: Zone::Zone1, source: 3 }),
            Err(ActionError::UnknownSource { code: 3 })
        );
    }

    #[test]
    fn test_tune() {
        assert_eq!(
            tune_commands(Band::Fm, 99.1).unwrap(),
            vec!["00TN", "TAC", "9TP", "9TP", "1TP", "0TP"]
        );
        assert_eq!(
            tune_commands(Band::Am, 530.0).unwrap(),
            vec!["01TN", "TAC", "5TP", "3TP", "0TP"]
        );
        assert!(matches!(
            tune_commands(Band::Fm, 108.1),
            Err(ActionError::FrequencyOutOfRange { .. })
        ));
        assert!(matches!(
            tune_commands(Band::Am, 535.0),
            Err(ActionError::FrequencyStep { .. })
        ));
        assert!(matches!(
            tune_commands(Band::Fm, 99.15),
            Err(ActionError::FrequencyStep { .. })
        ));
    }

    #[test]
    fn test_listening_mode() {
        assert_eq!(run(Action::ListeningMode { mode: 6 }).unwrap(), vec!["0006SR"]);
        assert_eq!(
            run(Action::ListeningMode { mode: 2 }),
            Err(ActionError::UnknownListeningMode(2))
        );
        assert!(matches!(
            run(Action::ListeningMode { mode: 152 }),
            Err(ActionError::UnsupportedListeningMode { .. })
        ));
    }

    #[test]
    fn test_remote_button_follows_source() {
        let model = ModelVariant::Vsx1022.info();
        let mut s = StateSnapshot::new();
        s.update(keys::ZONE1_SOURCE, 2i64.into());
        let up = Action::RemoteButton {
            zone: Zone::Zone1,
            button: "up".into(),
        };
        assert_eq!(up.commands(model, &s).unwrap(), vec!["TPI"]);

        s.update(keys::ZONE1_SOURCE, 38i64.into());
        assert_eq!(up.commands(model, &s).unwrap(), vec!["26NW"]);

        let band = Action::RemoteButton {
            zone: Zone::Zone1,
            button: "band".into(),
        };
        assert_eq!(
            band.commands(model, &s),
            Err(ActionError::InvalidButton {
                button: "band".into(),
                family: "network"
            })
        );
    }

    #[test]
    fn test_mcacc_and_raw() {
        assert_eq!(run(Action::McaccMemory { memory: 2 }).unwrap(), vec!["2MC"]);
        assert_eq!(
            run(Action::McaccMemory { memory: 7 }),
            Err(ActionError::McaccOutOfRange(7))
        );
        assert_eq!(
            run(Action::Raw { command: " ?RGB04 ".into() }).unwrap(),
            vec!["?RGB04"]
        );
        assert!(run(Action::Raw { command: "PO\rPF".into() }).is_err());
        assert!(run(Action::Raw { command: "  ".into() }).is_err());
    }

    #[test]
    fn test_parse_text_form() {
        assert_eq!(
            "power zone2 on".parse::<Action>().unwrap(),
            Action::Power { zone: Zone::Zone2, on: true }
        );
        assert_eq!(
            "mute 1".parse::<Action>().unwrap(),
            Action::Mute { zone: Zone::Zone1, on: None }
        );
        assert_eq!(
            "volume zone1 -35.5".parse::<Action>().unwrap(),
            Action::SetVolume { zone: Zone::Zone1, db: -35.5 }
        );
        assert_eq!(
            "tune fm 99.1".parse::<Action>().unwrap(),
            Action::Tune { band: Band::Fm, frequency: 99.1 }
        );
        assert_eq!(
            "raw ?RGB04".parse::<Action>().unwrap(),
            Action::Raw { command: "?RGB04".into() }
        );
        assert_eq!(
            "dance".parse::<Action>(),
            Err(ActionError::UnknownAction("dance".into()))
        );
        assert!(matches!(
            "volume zone3 up".parse::<Action>(),
            Err(ActionError::BadParameter { action: "volume", .. })
        ));
    }

    #[test]
    fn test_action_json_form() {
        let a: Action =
            serde_json::from_str(r#"{"action":"selectSource","zone":"zone1","source":25}"#)
                .unwrap();
        assert_eq!(a, Action::SelectSource { zone: Zone::Zone1, source: 25 });
    }
}
