//! Receiver state snapshot
//!
//! Every decoded response ends up here as a named, typed value. The snapshot
//! is created with a default for every key the decoder reads, so derived
//! computations (gating, cascades, percentages) never see a missing value.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel for "no meaningful volume" (zone off or below the scale).
pub const VOLUME_SENTINEL: f64 = -999.0;

/// State names shared by the decoder, gatherer and host.
pub mod keys {
    pub const STATUS: &str = "status";
    pub const ON_OFF_STATE: &str = "onOffState";

    pub const ZONE1_POWER: &str = "zone1power";
    pub const ZONE1_VOLUME: &str = "zone1volume";
    pub const ZONE1_MUTE: &str = "zone1mute";
    pub const ZONE1_SOURCE: &str = "zone1source";
    pub const ZONE1_SOURCE_NAME: &str = "zone1sourceName";

    pub const ZONE2_POWER: &str = "zone2power";
    pub const ZONE2_VOLUME: &str = "zone2volume";
    pub const ZONE2_MUTE: &str = "zone2mute";
    pub const ZONE2_SOURCE: &str = "zone2source";
    pub const ZONE2_SOURCE_NAME: &str = "zone2sourceName";

    pub const SPEAKER_SYSTEM: &str = "speakerSystem";
    pub const SPEAKER_SYSTEM_NAME: &str = "speakerSystemName";
    pub const SPEAKERS: &str = "speakers";
    pub const HDMI_OUTPUT: &str = "hdmiOutput";

    pub const LISTENING_MODE: &str = "listeningMode";
    pub const LISTENING_MODE_NAME: &str = "listeningModeName";
    pub const PLAYBACK_MODE: &str = "playbackMode";
    pub const PLAYBACK_MODE_NAME: &str = "playbackModeName";
    pub const DISPLAY_TEXT: &str = "displayText";

    pub const TUNER_BAND: &str = "tunerBand";
    pub const TUNER_FREQUENCY: &str = "tunerFrequency";
    pub const TUNER_FREQUENCY_TEXT: &str = "tunerFrequencyText";
    pub const TUNER_PRESET: &str = "tunerPreset";
    pub const TUNER_PRESET_NAME: &str = "tunerPresetName";

    pub const TONE_CONTROL: &str = "toneControl";
    pub const BASS: &str = "bass";
    pub const TREBLE: &str = "treble";
    pub const LFE_ATTENUATION: &str = "lfeAttenuation";
    pub const LFE_ATTENUATOR_OFF: &str = "lfeAttenuatorOff";

    pub const MCACC_MEMORY: &str = "mcaccMemory";
    pub const MCACC_MEMORY_NAME: &str = "mcaccMemoryName";
    pub const VIRTUAL_SURROUND_BACK: &str = "virtualSurroundBack";
    pub const VIRTUAL_HEIGHT: &str = "virtualHeight";

    /// One trim state per channel, in `?<ch>CLV` query order
    pub const CHANNEL_LEVELS: [&str; 12] = [
        "channelLevelL",
        "channelLevelR",
        "channelLevelC",
        "channelLevelSL",
        "channelLevelSR",
        "channelLevelSBL",
        "channelLevelSBR",
        "channelLevelSW",
        "channelLevelLH",
        "channelLevelRH",
        "channelLevelLW",
        "channelLevelRW",
    ];

    pub const AUDIO_INPUT_SIGNAL: &str = "audioInputSignal";
    pub const AUDIO_INPUT_FREQUENCY: &str = "audioInputFrequency";
    pub const AUDIO_INPUT_CHANNELS: &str = "audioInputChannels";
    pub const AUDIO_OUTPUT_CHANNELS: &str = "audioOutputChannels";
    pub const AUDIO_INPUT_CH_L: &str = "audioInputChL";
    pub const AUDIO_INPUT_CH_C: &str = "audioInputChC";
    pub const AUDIO_INPUT_CH_R: &str = "audioInputChR";
    pub const AUDIO_INPUT_CH_SL: &str = "audioInputChSL";
    pub const AUDIO_INPUT_CH_SR: &str = "audioInputChSR";
    pub const AUDIO_INPUT_CH_SBL: &str = "audioInputChSBL";
    pub const AUDIO_INPUT_CH_SBR: &str = "audioInputChSBR";
    pub const AUDIO_INPUT_CH_LFE: &str = "audioInputChLFE";
    pub const AUDIO_OUTPUT_FREQUENCY: &str = "audioOutputFrequency";
    pub const AUDIO_OUTPUT_BITS: &str = "audioOutputBits";
    pub const AUDIO_WORKING_PQLS: &str = "audioWorkingPqls";
    pub const AUDIO_AUTO_PHASE_CONTROL_PLUS: &str = "audioAutoPhaseControlPlus";
    pub const AUDIO_REVERSE_PHASE: &str = "audioReversePhase";

    pub const VIDEO_INPUT_TERMINAL: &str = "videoInputTerminal";
    pub const VIDEO_INPUT_RESOLUTION: &str = "videoInputResolution";
    pub const VIDEO_INPUT_ASPECT: &str = "videoInputAspect";
    pub const VIDEO_INPUT_COLOR_FORMAT: &str = "videoInputColorFormat";
    pub const VIDEO_INPUT_BITS: &str = "videoInputBits";
    pub const VIDEO_INPUT_COLOR_SPACE: &str = "videoInputColorSpace";
    pub const VIDEO_OUTPUT_RESOLUTION: &str = "videoOutputResolution";
    pub const VIDEO_OUTPUT_ASPECT: &str = "videoOutputAspect";
    pub const VIDEO_OUTPUT_COLOR_FORMAT: &str = "videoOutputColorFormat";
    pub const VIDEO_OUTPUT_BITS: &str = "videoOutputBits";
    pub const VIDEO_OUTPUT_COLOR_SPACE: &str = "videoOutputColorSpace";
    pub const HDMI1_RECOMMENDED_RESOLUTION: &str = "hdmi1RecommendedResolution";
    pub const HDMI1_DEEP_COLOR: &str = "hdmi1DeepColor";
    pub const HDMI2_RECOMMENDED_RESOLUTION: &str = "hdmi2RecommendedResolution";
    pub const HDMI2_DEEP_COLOR: &str = "hdmi2DeepColor";
    pub const VIDEO_INPUT_3D_FORMAT: &str = "videoInput3DFormat";
    pub const VIDEO_OUTPUT_3D_FORMAT: &str = "videoOutput3DFormat";
}

// =============================================================================
// Zones
// =============================================================================

/// An independently powered output path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    #[serde(rename = "zone1")]
    Zone1,
    #[serde(rename = "zone2")]
    Zone2,
}

impl Zone {
    pub fn number(self) -> u8 {
        match self {
            Zone::Zone1 => 1,
            Zone::Zone2 => 2,
        }
    }

    pub fn power_key(self) -> &'static str {
        match self {
            Zone::Zone1 => keys::ZONE1_POWER,
            Zone::Zone2 => keys::ZONE2_POWER,
        }
    }

    pub fn source_key(self) -> &'static str {
        match self {
            Zone::Zone1 => keys::ZONE1_SOURCE,
            Zone::Zone2 => keys::ZONE2_SOURCE,
        }
    }

    pub fn source_name_key(self) -> &'static str {
        match self {
            Zone::Zone1 => keys::ZONE1_SOURCE_NAME,
            Zone::Zone2 => keys::ZONE2_SOURCE_NAME,
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "zone {}", self.number())
    }
}

// =============================================================================
// Values
// =============================================================================

/// A typed state value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl StateValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StateValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            StateValue::Int(i) => Some(*i),
            StateValue::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            StateValue::Float(f) => Some(*f),
            StateValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            StateValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateValue::Bool(b) => write!(f, "{}", b),
            StateValue::Int(i) => write!(f, "{}", i),
            StateValue::Float(v) => write!(f, "{}", v),
            StateValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for StateValue {
    fn from(v: bool) -> Self {
        StateValue::Bool(v)
    }
}

impl From<i64> for StateValue {
    fn from(v: i64) -> Self {
        StateValue::Int(v)
    }
}

impl From<f64> for StateValue {
    fn from(v: f64) -> Self {
        StateValue::Float(v)
    }
}

impl From<&str> for StateValue {
    fn from(v: &str) -> Self {
        StateValue::Text(v.to_string())
    }
}

impl From<String> for StateValue {
    fn from(v: String) -> Self {
        StateValue::Text(v)
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Status text for a pair of zone power states
pub fn power_status(zone1_on: bool, zone2_on: bool) -> &'static str {
    match (zone1_on, zone2_on) {
        (false, false) => "off",
        (true, false) => "on (zone 1)",
        (false, true) => "on (zone 2)",
        (true, true) => "on (zones 1 & 2)",
    }
}

/// Named subsets that are reset together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateGroup {
    /// Everything a zone 1 power-off clears
    Zone1Off,
    /// Everything a zone 2 power-off clears
    Zone2Off,
    /// Tuner band, frequency and preset
    Tuner,
    /// Tuner preset only
    TunerPreset,
}

impl StateGroup {
    pub fn keys(&self) -> Vec<&'static str> {
        match self {
            StateGroup::Zone1Off => {
                let mut k = vec![
                    keys::ZONE1_VOLUME,
                    keys::ZONE1_SOURCE,
                    keys::ZONE1_SOURCE_NAME,
                    keys::ZONE1_MUTE,
                    keys::MCACC_MEMORY,
                    keys::MCACC_MEMORY_NAME,
                ];
                k.extend_from_slice(&keys::CHANNEL_LEVELS);
                k
            }
            StateGroup::Zone2Off => vec![
                keys::ZONE2_VOLUME,
                keys::ZONE2_SOURCE,
                keys::ZONE2_SOURCE_NAME,
                keys::ZONE2_MUTE,
            ],
            StateGroup::Tuner => vec![
                keys::TUNER_BAND,
                keys::TUNER_FREQUENCY,
                keys::TUNER_FREQUENCY_TEXT,
                keys::TUNER_PRESET,
                keys::TUNER_PRESET_NAME,
            ],
            StateGroup::TunerPreset => vec![keys::TUNER_PRESET, keys::TUNER_PRESET_NAME],
        }
    }
}

/// Default value for a key, `None` for keys that have no default.
pub fn default_value(key: &str) -> Option<StateValue> {
    use keys::*;
    let v = match key {
        STATUS => StateValue::from("disconnected"),
        ZONE1_POWER | ZONE2_POWER | ON_OFF_STATE | ZONE1_MUTE | ZONE2_MUTE
        | TONE_CONTROL | LFE_ATTENUATOR_OFF | VIRTUAL_SURROUND_BACK | VIRTUAL_HEIGHT => {
            StateValue::Bool(false)
        }
        ZONE1_VOLUME | ZONE2_VOLUME => StateValue::Float(VOLUME_SENTINEL),
        ZONE1_SOURCE | ZONE2_SOURCE | SPEAKER_SYSTEM | SPEAKERS | HDMI_OUTPUT
        | LISTENING_MODE | PLAYBACK_MODE | MCACC_MEMORY => StateValue::Int(0),
        TUNER_FREQUENCY | BASS | TREBLE | LFE_ATTENUATION => StateValue::Float(0.0),
        k if CHANNEL_LEVELS.contains(&k) => StateValue::Float(0.0),
        AUDIO_INPUT_CH_L | AUDIO_INPUT_CH_C | AUDIO_INPUT_CH_R | AUDIO_INPUT_CH_SL
        | AUDIO_INPUT_CH_SR | AUDIO_INPUT_CH_SBL | AUDIO_INPUT_CH_SBR | AUDIO_INPUT_CH_LFE
        | AUDIO_REVERSE_PHASE => StateValue::Bool(false),
        k if k.starts_with("audio") || k.starts_with("video") || k.starts_with("hdmi") => {
            StateValue::Text(String::new())
        }
        ZONE1_SOURCE_NAME | ZONE2_SOURCE_NAME | SPEAKER_SYSTEM_NAME | LISTENING_MODE_NAME
        | PLAYBACK_MODE_NAME | DISPLAY_TEXT | TUNER_BAND | TUNER_FREQUENCY_TEXT | TUNER_PRESET
        | TUNER_PRESET_NAME | MCACC_MEMORY_NAME => StateValue::Text(String::new()),
        _ => return None,
    };
    Some(v)
}

/// All keys that get a default at construction.
fn default_keys() -> Vec<&'static str> {
    use keys::*;
    let mut k = vec![
        STATUS,
        ON_OFF_STATE,
        ZONE1_POWER,
        ZONE1_VOLUME,
        ZONE1_MUTE,
        ZONE1_SOURCE,
        ZONE1_SOURCE_NAME,
        ZONE2_POWER,
        ZONE2_VOLUME,
        ZONE2_MUTE,
        ZONE2_SOURCE,
        ZONE2_SOURCE_NAME,
        SPEAKER_SYSTEM,
        SPEAKER_SYSTEM_NAME,
        SPEAKERS,
        HDMI_OUTPUT,
        LISTENING_MODE,
        LISTENING_MODE_NAME,
        PLAYBACK_MODE,
        PLAYBACK_MODE_NAME,
        DISPLAY_TEXT,
        TUNER_BAND,
        TUNER_FREQUENCY,
        TUNER_FREQUENCY_TEXT,
        TUNER_PRESET,
        TUNER_PRESET_NAME,
        TONE_CONTROL,
        BASS,
        TREBLE,
        LFE_ATTENUATION,
        LFE_ATTENUATOR_OFF,
        MCACC_MEMORY,
        MCACC_MEMORY_NAME,
        VIRTUAL_SURROUND_BACK,
        VIRTUAL_HEIGHT,
    ];
    k.extend_from_slice(&CHANNEL_LEVELS);
    k
}

/// Current state of one receiver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    values: BTreeMap<String, StateValue>,
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSnapshot {
    /// Create a snapshot with every default populated
    pub fn new() -> Self {
        let values = default_keys()
            .into_iter()
            .filter_map(|k| default_value(k).map(|v| (k.to_string(), v)))
            .collect();
        StateSnapshot { values }
    }

    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.values.get(key)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).and_then(StateValue::as_bool).unwrap_or(false)
    }

    pub fn get_int(&self, key: &str) -> i64 {
        self.get(key).and_then(StateValue::as_int).unwrap_or(0)
    }

    pub fn get_float(&self, key: &str) -> f64 {
        self.get(key).and_then(StateValue::as_float).unwrap_or(0.0)
    }

    pub fn get_text(&self, key: &str) -> &str {
        self.get(key).and_then(StateValue::as_text).unwrap_or("")
    }

    /// Store a value, returning true if it differs from the previous one.
    pub fn update(&mut self, key: &str, value: StateValue) -> bool {
        match self.values.get(key) {
            Some(old) if *old == value => false,
            _ => {
                self.values.insert(key.to_string(), value);
                true
            }
        }
    }

    /// Reset a group to its defaults, returning the keys that changed.
    pub fn reset(&mut self, group: StateGroup) -> Vec<&'static str> {
        group
            .keys()
            .into_iter()
            .filter(|k| match default_value(k) {
                Some(v) => self.update(k, v),
                None => false,
            })
            .collect()
    }

    /// Iterate over all values in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StateValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    // -------------------------------------------------------------------------
    // Derived views
    // -------------------------------------------------------------------------

    pub fn zone1_on(&self) -> bool {
        self.get_bool(keys::ZONE1_POWER)
    }

    pub fn zone2_on(&self) -> bool {
        self.get_bool(keys::ZONE2_POWER)
    }

    pub fn zone_on(&self, zone: Zone) -> bool {
        self.get_bool(zone.power_key())
    }

    pub fn zone_source(&self, zone: Zone) -> u8 {
        self.get_int(zone.source_key()).clamp(0, 99) as u8
    }

    /// Status text derived from the two zone power states
    pub fn power_status(&self) -> &'static str {
        power_status(self.zone1_on(), self.zone2_on())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_present() {
        let s = StateSnapshot::new();
        assert!(!s.get_bool(keys::ZONE1_POWER));
        assert_eq!(s.get_int(keys::ZONE2_SOURCE), 0);
        assert_eq!(s.get_float(keys::ZONE1_VOLUME), VOLUME_SENTINEL);
        assert_eq!(s.get_text(keys::STATUS), "disconnected");
        for ch in keys::CHANNEL_LEVELS {
            assert_eq!(s.get(ch), Some(&StateValue::Float(0.0)));
        }
    }

    #[test]
    fn test_update_reports_change() {
        let mut s = StateSnapshot::new();
        assert!(s.update(keys::ZONE1_POWER, true.into()));
        assert!(!s.update(keys::ZONE1_POWER, true.into()));
        assert!(s.update(keys::ZONE1_POWER, false.into()));
    }

    #[test]
    fn test_reset_zone2_group() {
        let mut s = StateSnapshot::new();
        s.update(keys::ZONE2_VOLUME, StateValue::Float(-40.0));
        s.update(keys::ZONE2_SOURCE, StateValue::Int(4));
        let changed = s.reset(StateGroup::Zone2Off);
        assert_eq!(changed, vec![keys::ZONE2_VOLUME, keys::ZONE2_SOURCE]);
        assert_eq!(s.get_float(keys::ZONE2_VOLUME), VOLUME_SENTINEL);
    }

    #[test]
    fn test_power_status() {
        let mut s = StateSnapshot::new();
        assert_eq!(s.power_status(), "off");
        s.update(keys::ZONE2_POWER, true.into());
        assert_eq!(s.power_status(), "on (zone 2)");
        s.update(keys::ZONE1_POWER, true.into());
        assert_eq!(s.power_status(), "on (zones 1 & 2)");
    }

    #[test]
    fn test_audio_keys_default_to_empty_text() {
        assert_eq!(
            default_value(keys::AUDIO_INPUT_SIGNAL),
            Some(StateValue::Text(String::new()))
        );
        assert_eq!(default_value("nonsense"), None);
    }

    #[test]
    fn test_state_value_serializes_untagged() {
        let json = serde_json::to_string(&StateValue::Float(-40.5)).unwrap();
        assert_eq!(json, "-40.5");
        let v: StateValue = serde_json::from_str("\"TUNER\"").unwrap();
        assert_eq!(v, StateValue::from("TUNER"));
    }
}
