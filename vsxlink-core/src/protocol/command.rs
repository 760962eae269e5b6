//! Pioneer command formatting
//!
//! Pure functions for building command strings and the volume encodings.
//! No I/O operations - framing adds the single `\r` terminator the receiver
//! expects.

use crate::state::Zone;

// =============================================================================
// Framing
// =============================================================================

/// Command terminator
pub const TERMINATOR: char = '\r';

/// Frame a command: strip every CR/LF, then append exactly one CR.
///
/// Returns None if nothing is left to send.
pub fn frame(command: &str) -> Option<String> {
    let mut text: String = command.chars().filter(|c| *c != '\r' && *c != '\n').collect();
    if text.is_empty() {
        return None;
    }
    text.push(TERMINATOR);
    Some(text)
}

/// Commands that change the tuned frequency without the receiver reporting
/// that the preset no longer applies.
pub fn clears_tuner_preset(command: &str) -> bool {
    matches!(command.trim_end_matches(&['\r', '\n'][..]), "TFI" | "TFD" | "TB")
}

// =============================================================================
// Pacing
// =============================================================================

/// Delay after an ordinary command
pub const DEFAULT_DELAY_MS: u64 = 100;

/// Delay after a power-on command, while the receiver wakes up
pub const POWER_ON_DELAY_MS: u64 = 1000;

/// Delay after a tuner band select
pub const BAND_SELECT_DELAY_MS: u64 = 500;

/// How long to wait after sending `command` before the next one
pub fn delay_after(command: &str) -> u64 {
    match command {
        "PO" | "APO" => POWER_ON_DELAY_MS,
        FORMAT_BAND_FM | FORMAT_BAND_AM => BAND_SELECT_DELAY_MS,
        _ => DEFAULT_DELAY_MS,
    }
}

// =============================================================================
// Queries
// =============================================================================

pub const QUERY_DISPLAY: &str = "?FL";
pub const QUERY_POWER: &str = "?P";
pub const QUERY_ZONE2_POWER: &str = "?AP";
pub const QUERY_SPEAKER_SYSTEM: &str = "?SSF";
pub const QUERY_VOLUME: &str = "?V";
pub const QUERY_ZONE2_VOLUME: &str = "?ZV";
pub const QUERY_MUTE: &str = "?M";
pub const QUERY_ZONE2_MUTE: &str = "?Z2M";
pub const QUERY_SOURCE: &str = "?F";
pub const QUERY_ZONE2_SOURCE: &str = "?ZS";
pub const QUERY_AUDIO_STATUS: &str = "?AST";
pub const QUERY_VIDEO_STATUS: &str = "?VST";
pub const QUERY_LISTENING_MODE: &str = "?S";
pub const QUERY_PLAYING_MODE: &str = "?L";
pub const QUERY_TONE: &str = "?TO";
pub const QUERY_BASS: &str = "?BA";
pub const QUERY_TREBLE: &str = "?TR";
pub const QUERY_LFE_ATTENUATION: &str = "?ATM";
pub const QUERY_MCACC: &str = "?MC";
pub const QUERY_SPEAKERS: &str = "?SPK";
pub const QUERY_HDMI_OUTPUT: &str = "?HO";
pub const QUERY_VIRTUAL_SURROUND_BACK: &str = "?VSB";
pub const QUERY_VIRTUAL_HEIGHT: &str = "?VHT";
pub const QUERY_TUNER_FREQUENCY: &str = "?FR";
pub const QUERY_TUNER_PRESET: &str = "?PR";

pub fn query_source_name(code: u8) -> String {
    format!("?RGB{:02}", code)
}

pub fn query_mcacc_name(memory: u8) -> String {
    format!("?MCM{}", memory)
}

pub fn query_channel_level(wire: &str) -> String {
    format!("?{}CLV", wire)
}

// =============================================================================
// Volume encodings
// =============================================================================

/// Zone 1 volume range in dB
pub const ZONE1_MIN_DB: f64 = -80.5;
pub const ZONE1_MAX_DB: f64 = 12.0;
pub const ZONE1_STEP_DB: f64 = 0.5;
/// Highest zone 1 volume code (+12.0 dB)
pub const ZONE1_MAX_CODE: i64 = 185;

/// Zone 2 volume range in dB
pub const ZONE2_MIN_DB: f64 = -81.0;
pub const ZONE2_MAX_DB: f64 = 0.0;
/// Highest zone 2 volume code (0 dB)
pub const ZONE2_MAX_CODE: i64 = 81;

pub fn zone1_volume_db(code: i64) -> f64 {
    -80.5 + 0.5 * code as f64
}

pub fn zone1_volume_code(db: f64) -> i64 {
    (161.0 + db / 0.5).round() as i64
}

pub fn zone2_volume_db(code: i64) -> f64 {
    (code - 81) as f64
}

pub fn zone2_volume_code(db: f64) -> i64 {
    81 + db.round() as i64
}

/// Map a volume code onto 0..=100 % of the zone's scale
pub fn volume_code_to_percent(zone: Zone, code: i64) -> u8 {
    let max = match zone {
        Zone::Zone1 => ZONE1_MAX_CODE,
        Zone::Zone2 => ZONE2_MAX_CODE,
    };
    ((code.clamp(0, max) as f64 / max as f64) * 100.0).round() as u8
}

/// Inverse of [`volume_code_to_percent`]
pub fn percent_to_volume_code(zone: Zone, percent: u8) -> i64 {
    let max = match zone {
        Zone::Zone1 => ZONE1_MAX_CODE,
        Zone::Zone2 => ZONE2_MAX_CODE,
    };
    ((percent.min(100) as f64 / 100.0) * max as f64).round() as i64
}

// =============================================================================
// Set commands
// =============================================================================

pub fn format_volume(zone: Zone, code: i64) -> String {
    match zone {
        Zone::Zone1 => format!("{:03}VL", code),
        Zone::Zone2 => format!("{:02}ZV", code),
    }
}

pub fn format_source(zone: Zone, code: u8) -> String {
    match zone {
        Zone::Zone1 => format!("{:02}FN", code),
        Zone::Zone2 => format!("{:02}ZS", code),
    }
}

pub fn format_power(zone: Zone, on: bool) -> &'static str {
    match (zone, on) {
        (Zone::Zone1, true) => "PO",
        (Zone::Zone1, false) => "PF",
        (Zone::Zone2, true) => "APO",
        (Zone::Zone2, false) => "APF",
    }
}

/// Mute on/off, or toggle when `on` is None
pub fn format_mute(zone: Zone, on: Option<bool>) -> &'static str {
    match (zone, on) {
        (Zone::Zone1, Some(true)) => "MO",
        (Zone::Zone1, Some(false)) => "MF",
        (Zone::Zone1, None) => "MZ",
        (Zone::Zone2, Some(true)) => "Z2MO",
        (Zone::Zone2, Some(false)) => "Z2MF",
        (Zone::Zone2, None) => "Z2MZ",
    }
}

pub fn format_volume_step(zone: Zone, up: bool) -> &'static str {
    match (zone, up) {
        (Zone::Zone1, true) => "VU",
        (Zone::Zone1, false) => "VD",
        (Zone::Zone2, true) => "ZU",
        (Zone::Zone2, false) => "ZD",
    }
}

pub fn format_listening_mode(code: u16) -> String {
    format!("{:04}SR", code)
}

pub fn format_mcacc(memory: u8) -> String {
    format!("{}MC", memory)
}

pub const FORMAT_BAND_FM: &str = "00TN";
pub const FORMAT_BAND_AM: &str = "01TN";
/// Start tuner direct frequency entry
pub const FORMAT_TUNER_DIRECT: &str = "TAC";

/// One `<d>TP` command per digit of the frequency entry
pub fn format_tuner_digits(digits: &str) -> Vec<String> {
    digits
        .chars()
        .filter(|c| c.is_ascii_digit())
        .map(|d| format!("{}TP", d))
        .collect()
}
