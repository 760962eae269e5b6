//! Pioneer response decoding
//!
//! [`decode`] turns one response line into state updates, an optional
//! operator log line, follow-up requests and discovered labels. It reads the
//! current snapshot but never mutates it; the controller applies the result
//! before decoding the next line.
//!
//! Lines are classified by an ordered prefix table. A longer prefix must
//! come before any shorter prefix it starts with (`MCM` before `MC`), which
//! `test_no_prefix_is_shadowed` enforces.

use crate::error::DecodeError;
use crate::labels::{DeviceLabels, LabelUpdate};
use crate::state::{
    default_value, keys, power_status, StateGroup, StateSnapshot, StateValue, Zone,
    VOLUME_SENTINEL,
};

use super::command::{
    self, volume_code_to_percent, zone1_volume_code, zone1_volume_db, zone2_volume_code,
    zone2_volume_db, QUERY_AUDIO_STATUS, QUERY_TUNER_FREQUENCY, QUERY_TUNER_PRESET,
    QUERY_ZONE2_MUTE, QUERY_ZONE2_VOLUME,
};
use super::tables::{self, SOURCE_TUNER, SPEAKER_SYSTEM_ZONE2};

// =============================================================================
// Result types
// =============================================================================

/// Something the controller or engine must do after applying a line
#[derive(Debug, Clone, PartialEq)]
pub enum FollowUp {
    /// Send this query
    Query(String),
    /// Run the zone's status batch (zone just powered on)
    GatherZone(Zone),
    /// Push a level to virtual level controllers linked to this zone
    VirtualLevel { zone: Zone, percent: u8 },
}

/// Outcome of decoding one line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoded {
    /// State values to store, in order
    pub updates: Vec<(&'static str, StateValue)>,
    /// Operator log text, without the device name
    pub log: Option<String>,
    pub follow_ups: Vec<FollowUp>,
    pub labels: Vec<LabelUpdate>,
    /// True when no prefix matched
    pub unrecognized: bool,
}

impl Decoded {
    fn set(&mut self, key: &'static str, value: impl Into<StateValue>) {
        self.updates.push((key, value.into()));
    }

    fn reset(&mut self, group: StateGroup) {
        for key in group.keys() {
            if let Some(v) = default_value(key) {
                self.updates.push((key, v));
            }
        }
    }

    fn query(&mut self, q: impl Into<String>) {
        self.follow_ups.push(FollowUp::Query(q.into()));
    }

    fn log(&mut self, text: String) {
        self.log = Some(match self.log.take() {
            Some(prev) => format!("{}; {}", prev, text),
            None => text,
        });
    }
}

/// Read-only inputs for decoding
pub struct DecodeContext<'a> {
    pub snapshot: &'a StateSnapshot,
    pub labels: &'a DeviceLabels,
}

type Handler = fn(&str, &DecodeContext, &mut Decoded) -> Result<(), DecodeError>;

/// Responses matched on the whole line
static EXACT: &[(&str, Handler)] = &[("R", decode_ack)];

/// Responses matched on prefix, checked in order
static PREFIXES: &[(&str, Handler)] = &[
    ("Z2MUT", decode_zone2_mute),
    ("Z2F", decode_zone2_source),
    ("ZV", decode_zone2_volume),
    ("PWR", decode_zone1_power),
    ("APR", decode_zone2_power),
    ("VOL", decode_zone1_volume),
    ("MUT", decode_zone1_mute),
    ("FN", decode_zone1_source),
    ("RGB", decode_source_label),
    ("FL", decode_display),
    ("SR", decode_listening_mode),
    ("LM", decode_playing_mode),
    ("FRF", decode_frequency_fm),
    ("FRA", decode_frequency_am),
    ("PR", decode_preset),
    ("TQ", decode_preset_label),
    ("TO", decode_tone),
    ("BA", decode_bass),
    ("TR", decode_treble),
    ("CLV", decode_channel_level),
    ("ATM", decode_lfe_attenuation),
    ("MCM", decode_mcacc_label),
    ("MC", decode_mcacc),
    ("SSF", decode_speaker_system),
    ("SPK", decode_speakers),
    ("HO", decode_hdmi_output),
    ("VSB", decode_virtual_surround_back),
    ("VHT", decode_virtual_height),
    ("AST", decode_audio_status),
    ("VST", decode_video_status),
    ("E02", decode_device_error),
    ("E03", decode_device_error),
    ("E04", decode_device_error),
    ("E06", decode_device_error),
    ("B00", decode_busy),
];

/// Decode one response line (terminators already removed)
pub fn decode(line: &str, ctx: &DecodeContext) -> Result<Decoded, DecodeError> {
    let mut out = Decoded::default();

    if let Some((_, handler)) = EXACT.iter().find(|(text, _)| *text == line) {
        handler(line, ctx, &mut out)?;
        return Ok(out);
    }

    match PREFIXES.iter().find(|(prefix, _)| line.starts_with(prefix)) {
        Some((prefix, handler)) => {
            if !line.is_ascii() {
                return Err(DecodeError::Malformed {
                    prefix,
                    body: line.to_string(),
                });
            }
            // Error codes carry their meaning in the prefix
            let body = if prefix.starts_with('E') {
                prefix
            } else {
                &line[prefix.len()..]
            };
            handler(body, ctx, &mut out)?;
        }
        None => out.unrecognized = true,
    }
    Ok(out)
}

// =============================================================================
// Field helpers
// =============================================================================

fn exact_len(prefix: &'static str, body: &str, expected: usize) -> Result<(), DecodeError> {
    if body.len() != expected {
        return Err(DecodeError::WrongLength {
            prefix,
            expected,
            actual: body.len(),
        });
    }
    Ok(())
}

fn min_len(prefix: &'static str, body: &str, expected: usize) -> Result<(), DecodeError> {
    if body.len() < expected {
        return Err(DecodeError::TooShort {
            prefix,
            expected,
            actual: body.len(),
        });
    }
    Ok(())
}

fn number(prefix: &'static str, field: &str) -> Result<i64, DecodeError> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeError::InvalidNumber {
            prefix,
            value: field.to_string(),
        });
    }
    field.parse().map_err(|_| DecodeError::InvalidNumber {
        prefix,
        value: field.to_string(),
    })
}

fn hex(prefix: &'static str, field: &str) -> Result<u16, DecodeError> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(DecodeError::InvalidHex {
            prefix,
            value: field.to_string(),
        });
    }
    u16::from_str_radix(field, 16).map_err(|_| DecodeError::InvalidHex {
        prefix,
        value: field.to_string(),
    })
}

/// Field at `range`, or a length error naming the whole body
fn field<'b>(
    prefix: &'static str,
    body: &'b str,
    range: std::ops::Range<usize>,
) -> Result<&'b str, DecodeError> {
    body.get(range.clone()).ok_or(DecodeError::TooShort {
        prefix,
        expected: range.end,
        actual: body.len(),
    })
}

fn flag(prefix: &'static str, body: &str, at: usize) -> Result<bool, DecodeError> {
    match body.as_bytes().get(at) {
        Some(b'0') => Ok(false),
        Some(b'1') => Ok(true),
        _ => Err(DecodeError::Malformed {
            prefix,
            body: body.to_string(),
        }),
    }
}

fn name_or_code(table: &'static [(u8, &'static str)], code: i64) -> String {
    u8::try_from(code)
        .ok()
        .and_then(|c| tables::lookup_u8(table, c))
        .map(str::to_string)
        .unwrap_or_else(|| format!("unknown ({})", code))
}

fn signed_db(db: f64) -> String {
    if db > 0.0 {
        format!("+{}", db)
    } else {
        format!("{}", db)
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

// =============================================================================
// Virtual levels
// =============================================================================

/// Zone 1 level: volume position, or 0 when off, muted or at the sentinel
pub fn zone1_level(on: bool, volume_db: f64, muted: bool) -> u8 {
    if !on || muted || volume_db <= VOLUME_SENTINEL {
        0
    } else {
        volume_code_to_percent(Zone::Zone1, zone1_volume_code(volume_db))
    }
}

/// Zone 2 level. Without the amplifier-powered zone 2 layout the receiver
/// has no zone 2 volume, so the level only follows power.
pub fn zone2_level(on: bool, volume_db: f64, muted: bool, speaker_system: i64) -> u8 {
    if speaker_system != SPEAKER_SYSTEM_ZONE2 {
        return if on { 100 } else { 0 };
    }
    if !on || muted || volume_db <= VOLUME_SENTINEL {
        0
    } else {
        volume_code_to_percent(Zone::Zone2, zone2_volume_code(volume_db))
    }
}

// =============================================================================
// Acknowledgement and device errors
// =============================================================================

fn decode_ack(_: &str, _: &DecodeContext, _: &mut Decoded) -> Result<(), DecodeError> {
    Ok(())
}

fn decode_device_error(code: &str, _: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    let category = match code {
        "E02" => "not available now",
        "E03" => "invalid command",
        "E04" => "command error",
        _ => "parameter error",
    };
    out.set(keys::STATUS, "error");
    out.log(format!("receiver error {}: {}", code, category));
    Ok(())
}

fn decode_busy(_: &str, _: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    out.set(keys::STATUS, "busy");
    out.log("receiver busy".to_string());
    Ok(())
}

// =============================================================================
// Power
// =============================================================================

fn decode_power(
    zone: Zone,
    prefix: &'static str,
    body: &str,
    ctx: &DecodeContext,
    out: &mut Decoded,
) -> Result<(), DecodeError> {
    exact_len(prefix, body, 1)?;
    // 0 = on, 1 = standby
    let on = number(prefix, body)? == 0;
    let was_on = ctx.snapshot.zone_on(zone);
    let (z1, z2) = match zone {
        Zone::Zone1 => (on, ctx.snapshot.zone2_on()),
        Zone::Zone2 => (ctx.snapshot.zone1_on(), on),
    };

    out.set(zone.power_key(), on);
    out.set(keys::ON_OFF_STATE, z1 || z2);
    out.set(keys::STATUS, power_status(z1, z2));

    if on {
        if !was_on {
            out.follow_ups.push(FollowUp::GatherZone(zone));
        }
        // Line-level zone 2 has no volume of its own, the level follows power
        if zone == Zone::Zone2
            && ctx.snapshot.get_int(keys::SPEAKER_SYSTEM) != SPEAKER_SYSTEM_ZONE2
        {
            out.follow_ups.push(FollowUp::VirtualLevel { zone, percent: 100 });
        }
    } else {
        out.reset(match zone {
            Zone::Zone1 => StateGroup::Zone1Off,
            Zone::Zone2 => StateGroup::Zone2Off,
        });
        out.follow_ups.push(FollowUp::VirtualLevel { zone, percent: 0 });
    }

    if on != was_on {
        let text = format!("power {}", on_off(on));
        out.log(match zone {
            Zone::Zone1 => text,
            Zone::Zone2 => format!("zone 2 {}", text),
        });
    }
    Ok(())
}

fn decode_zone1_power(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    decode_power(Zone::Zone1, "PWR", body, ctx, out)
}

fn decode_zone2_power(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    decode_power(Zone::Zone2, "APR", body, ctx, out)
}

// =============================================================================
// Volume and mute
// =============================================================================

fn decode_zone1_volume(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    exact_len("VOL", body, 3)?;
    let db = zone1_volume_db(number("VOL", body)?);
    let on = ctx.snapshot.zone1_on();
    let value = if db < -80.0 || !on { VOLUME_SENTINEL } else { db };

    if value != ctx.snapshot.get_float(keys::ZONE1_VOLUME) {
        out.log(if value == VOLUME_SENTINEL {
            "volume minimum".to_string()
        } else {
            format!("volume {:.1} dB", value)
        });
    }
    out.set(keys::ZONE1_VOLUME, value);
    out.follow_ups.push(FollowUp::VirtualLevel {
        zone: Zone::Zone1,
        percent: zone1_level(on, value, ctx.snapshot.get_bool(keys::ZONE1_MUTE)),
    });
    Ok(())
}

fn decode_zone2_volume(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    exact_len("ZV", body, 2)?;
    let db = zone2_volume_db(number("ZV", body)?);
    let on = ctx.snapshot.zone2_on();
    let speaker_system = ctx.snapshot.get_int(keys::SPEAKER_SYSTEM);
    let amplified = speaker_system == SPEAKER_SYSTEM_ZONE2;
    let value = if !amplified || db < -80.0 || !on {
        VOLUME_SENTINEL
    } else {
        db
    };

    if value != ctx.snapshot.get_float(keys::ZONE2_VOLUME) {
        out.log(if value == VOLUME_SENTINEL {
            "zone 2 volume minimum".to_string()
        } else {
            format!("zone 2 volume {} dB", value)
        });
    }
    out.set(keys::ZONE2_VOLUME, value);
    out.follow_ups.push(FollowUp::VirtualLevel {
        zone: Zone::Zone2,
        percent: zone2_level(on, value, ctx.snapshot.get_bool(keys::ZONE2_MUTE), speaker_system),
    });
    Ok(())
}

fn decode_zone1_mute(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    exact_len("MUT", body, 1)?;
    // 0 = muted
    let muted = number("MUT", body)? == 0;
    if muted != ctx.snapshot.get_bool(keys::ZONE1_MUTE) {
        out.log(format!("mute {}", on_off(muted)));
    }
    out.set(keys::ZONE1_MUTE, muted);
    out.follow_ups.push(FollowUp::VirtualLevel {
        zone: Zone::Zone1,
        percent: zone1_level(
            ctx.snapshot.zone1_on(),
            ctx.snapshot.get_float(keys::ZONE1_VOLUME),
            muted,
        ),
    });
    Ok(())
}

fn decode_zone2_mute(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    exact_len("Z2MUT", body, 1)?;
    let speaker_system = ctx.snapshot.get_int(keys::SPEAKER_SYSTEM);
    let muted = number("Z2MUT", body)? == 0 && speaker_system == SPEAKER_SYSTEM_ZONE2;
    if muted != ctx.snapshot.get_bool(keys::ZONE2_MUTE) {
        out.log(format!("zone 2 mute {}", on_off(muted)));
    }
    out.set(keys::ZONE2_MUTE, muted);
    out.follow_ups.push(FollowUp::VirtualLevel {
        zone: Zone::Zone2,
        percent: zone2_level(
            ctx.snapshot.zone2_on(),
            ctx.snapshot.get_float(keys::ZONE2_VOLUME),
            muted,
            speaker_system,
        ),
    });
    Ok(())
}

// =============================================================================
// Sources
// =============================================================================

fn decode_source(
    zone: Zone,
    prefix: &'static str,
    body: &str,
    ctx: &DecodeContext,
    out: &mut Decoded,
) -> Result<(), DecodeError> {
    exact_len(prefix, body, 2)?;
    let code = number(prefix, body)?;
    if code == ctx.snapshot.get_int(zone.source_key()) {
        return Ok(());
    }

    // The name arrives with the RGB reply
    out.set(zone.source_key(), code);
    out.query(command::query_source_name(code as u8));
    out.query(QUERY_AUDIO_STATUS);

    let other = match zone {
        Zone::Zone1 => Zone::Zone2,
        Zone::Zone2 => Zone::Zone1,
    };
    if code == SOURCE_TUNER as i64 {
        out.query(QUERY_TUNER_FREQUENCY);
        out.query(QUERY_TUNER_PRESET);
    } else if ctx.snapshot.zone_source(other) != SOURCE_TUNER {
        out.reset(StateGroup::Tuner);
    }
    Ok(())
}

fn decode_zone1_source(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    decode_source(Zone::Zone1, "FN", body, ctx, out)
}

fn decode_zone2_source(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    decode_source(Zone::Zone2, "Z2F", body, ctx, out)
}

/// `RGB<nn><flag><name>`, flag 1 when the user renamed the input
fn decode_source_label(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    min_len("RGB", body, 3)?;
    let code = number("RGB", field("RGB", body, 0..2)?)?;
    flag("RGB", body, 2)?;
    let name = body[3..].trim().to_string();
    let code = code as u8;

    if !ctx.labels.has_source_name(code) || ctx.labels.source_name(code) != name {
        out.labels.push(LabelUpdate::Source {
            code,
            name: name.clone(),
        });
    }

    for zone in [Zone::Zone1, Zone::Zone2] {
        if ctx.snapshot.zone_on(zone) && ctx.snapshot.zone_source(zone) == code {
            if ctx.snapshot.get_text(zone.source_name_key()) != name {
                out.log(match zone {
                    Zone::Zone1 => format!("source {}", name),
                    Zone::Zone2 => format!("zone 2 source {}", name),
                });
            }
            out.set(zone.source_name_key(), name.clone());
        }
    }
    Ok(())
}

// =============================================================================
// Display
// =============================================================================

/// Decode the 14 display characters of an `FL` body (2 flag digits + 28 hex)
pub fn decode_display_text(body: &str) -> Result<String, DecodeError> {
    exact_len("FL", body, 30)?;
    hex("FL", &body[..2])?;
    let mut text = String::new();
    for i in 0..14 {
        let start = 2 + i * 2;
        let code = hex("FL", &body[start..start + 2])? as u8;
        text.push_str(&tables::display_char(code));
    }
    Ok(text)
}

fn decode_display(body: &str, _: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    let text = decode_display_text(body)?;
    // Scrolling text changes several times a second: state only, no log
    out.set(keys::DISPLAY_TEXT, text.trim().to_string());
    Ok(())
}

// =============================================================================
// Listening and playing modes
// =============================================================================

fn decode_listening_mode(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    exact_len("SR", body, 4)?;
    let code = number("SR", body)?;
    if code == ctx.snapshot.get_int(keys::LISTENING_MODE) {
        return Ok(());
    }
    let name = u16::try_from(code)
        .ok()
        .and_then(tables::listening_mode_name)
        .map(str::to_string)
        .unwrap_or_else(|| format!("unknown ({:04})", code));
    out.set(keys::LISTENING_MODE, code);
    out.set(keys::LISTENING_MODE_NAME, name.clone());
    out.log(format!("listening mode {}", name));
    Ok(())
}

fn decode_playing_mode(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    exact_len("LM", body, 4)?;
    let code = hex("LM", body)?;
    if code as i64 == ctx.snapshot.get_int(keys::PLAYBACK_MODE) {
        return Ok(());
    }
    let name = tables::playing_mode_name(code)
        .map(str::to_string)
        .unwrap_or_else(|| format!("unknown ({:04x})", code));
    out.set(keys::PLAYBACK_MODE, code as i64);
    out.set(keys::PLAYBACK_MODE_NAME, name.clone());
    out.log(format!("playback mode {}", name));
    Ok(())
}

// =============================================================================
// Tuner
// =============================================================================

/// FM body `09910` → 99.10 MHz
pub fn fm_frequency(body: &str) -> Result<(f64, String), DecodeError> {
    exact_len("FRF", body, 5)?;
    number("FRF", body)?;
    let text = format!("{}.{}", &body[..3], &body[3..]);
    let text = text.trim_start_matches('0').to_string();
    let mhz = text.parse::<f64>().map_err(|_| DecodeError::InvalidNumber {
        prefix: "FRF",
        value: body.to_string(),
    })?;
    Ok((mhz, text))
}

/// AM body `00530` → 530 kHz
pub fn am_frequency(body: &str) -> Result<(f64, String), DecodeError> {
    exact_len("FRA", body, 5)?;
    let khz = number("FRA", body)?;
    Ok((khz as f64, khz.to_string()))
}

fn decode_frequency(
    band: &'static str,
    unit: &'static str,
    parsed: (f64, String),
    ctx: &DecodeContext,
    out: &mut Decoded,
) {
    let (value, text) = parsed;
    let text = format!("{} {}", text, unit);
    if text != ctx.snapshot.get_text(keys::TUNER_FREQUENCY_TEXT)
        || band != ctx.snapshot.get_text(keys::TUNER_BAND)
    {
        out.log(format!("tuner {} {}", band, text));
    }
    out.set(keys::TUNER_BAND, band);
    out.set(keys::TUNER_FREQUENCY, value);
    out.set(keys::TUNER_FREQUENCY_TEXT, text);
}

fn decode_frequency_fm(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    let parsed = fm_frequency(body)?;
    decode_frequency("FM", "MHz", parsed, ctx, out);
    Ok(())
}

fn decode_frequency_am(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    let parsed = am_frequency(body)?;
    decode_frequency("AM", "kHz", parsed, ctx, out);
    Ok(())
}

/// Preset id `A01`: class letter A-G and two digits
fn preset_id(prefix: &'static str, body: &str) -> Result<String, DecodeError> {
    let id = field(prefix, body, 0..3)?;
    let class = id.as_bytes()[0];
    if !(b'A'..=b'G').contains(&class) {
        return Err(DecodeError::Malformed {
            prefix,
            body: body.to_string(),
        });
    }
    number(prefix, &id[1..])?;
    Ok(id.to_string())
}

fn decode_preset(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    exact_len("PR", body, 3)?;
    let id = preset_id("PR", body)?;
    if id == ctx.snapshot.get_text(keys::TUNER_PRESET) {
        return Ok(());
    }
    let name = ctx.labels.preset_name(&id);
    out.log(if name == id {
        format!("tuner preset {}", id)
    } else {
        format!("tuner preset {} ({})", id, name)
    });
    out.set(keys::TUNER_PRESET, id);
    out.set(keys::TUNER_PRESET_NAME, name);
    Ok(())
}

/// `TQ<id>"<name>"`
fn decode_preset_label(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    min_len("TQ", body, 5)?;
    let id = preset_id("TQ", body)?;
    let quoted = &body[3..];
    let name = quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| DecodeError::Malformed {
            prefix: "TQ",
            body: body.to_string(),
        })?
        .trim()
        .to_string();

    if ctx.labels.preset_name(&id) != name {
        out.labels.push(LabelUpdate::Preset {
            id: id.clone(),
            name: name.clone(),
        });
    }
    if ctx.snapshot.get_text(keys::TUNER_PRESET) == id {
        if ctx.snapshot.get_text(keys::TUNER_PRESET_NAME) != name {
            out.log(format!("tuner preset {} ({})", id, name));
        }
        out.set(keys::TUNER_PRESET_NAME, name);
    }
    Ok(())
}

// =============================================================================
// Tone, trims and DSP
// =============================================================================

fn decode_tone(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    exact_len("TO", body, 1)?;
    let on = number("TO", body)? == 1;
    if on != ctx.snapshot.get_bool(keys::TONE_CONTROL) {
        out.log(format!("tone control {}", if on { "on" } else { "bypass" }));
    }
    out.set(keys::TONE_CONTROL, on);
    Ok(())
}

fn decode_tone_level(
    prefix: &'static str,
    key: &'static str,
    label: &str,
    body: &str,
    ctx: &DecodeContext,
    out: &mut Decoded,
) -> Result<(), DecodeError> {
    exact_len(prefix, body, 2)?;
    let db = 6.0 - number(prefix, body)? as f64;
    if db != ctx.snapshot.get_float(key) {
        out.log(format!("{} {} dB", label, signed_db(db)));
    }
    out.set(key, db);
    Ok(())
}

fn decode_bass(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    decode_tone_level("BA", keys::BASS, "bass", body, ctx, out)
}

fn decode_treble(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    decode_tone_level("TR", keys::TREBLE, "treble", body, ctx, out)
}

/// `CLV<ch3><nn>`
fn decode_channel_level(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    exact_len("CLV", body, 5)?;
    let index = tables::channel_index(&body[..3]).ok_or_else(|| DecodeError::Malformed {
        prefix: "CLV",
        body: body.to_string(),
    })?;
    let code = number("CLV", &body[3..])?;
    let db = -12.0 + 0.5 * (code - 26) as f64;
    let key = keys::CHANNEL_LEVELS[index];
    if db != ctx.snapshot.get_float(key) {
        out.log(format!(
            "channel level {} {} dB",
            tables::CHANNELS[index].1,
            signed_db(db)
        ));
    }
    out.set(key, db);
    Ok(())
}

fn decode_lfe_attenuation(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    min_len("ATM", body, 1)?;
    let db = -5.0 * number("ATM", body)? as f64;
    let off = db < -20.0;
    if db != ctx.snapshot.get_float(keys::LFE_ATTENUATION) {
        out.log(if off {
            "LFE attenuator off".to_string()
        } else {
            format!("LFE attenuation {} dB", db)
        });
    }
    out.set(keys::LFE_ATTENUATION, db);
    out.set(keys::LFE_ATTENUATOR_OFF, off);
    Ok(())
}

/// `MCM<n><name>`
fn decode_mcacc_label(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    min_len("MCM", body, 1)?;
    let memory = number("MCM", &body[..1])? as u8;
    let name = body[1..].trim().to_string();
    if ctx.labels.mcacc_name(memory) != name {
        out.labels.push(LabelUpdate::Mcacc {
            memory,
            name: name.clone(),
        });
    }
    if ctx.snapshot.get_int(keys::MCACC_MEMORY) == memory as i64 {
        if ctx.snapshot.get_text(keys::MCACC_MEMORY_NAME) != name {
            out.log(format!("MCACC memory {} ({})", memory, name));
        }
        out.set(keys::MCACC_MEMORY_NAME, name);
    }
    Ok(())
}

fn decode_mcacc(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    exact_len("MC", body, 1)?;
    let memory = number("MC", body)?;
    let name = ctx.labels.mcacc_name(memory as u8);
    if memory != ctx.snapshot.get_int(keys::MCACC_MEMORY) {
        out.log(format!("MCACC memory {} ({})", memory, name));
    }
    out.set(keys::MCACC_MEMORY, memory);
    out.set(keys::MCACC_MEMORY_NAME, name);
    Ok(())
}

// =============================================================================
// Speakers and outputs
// =============================================================================

fn decode_speaker_system(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    exact_len("SSF", body, 2)?;
    let code = number("SSF", body)?;
    let name = name_or_code(tables::SPEAKER_SYSTEMS, code);
    if code != ctx.snapshot.get_int(keys::SPEAKER_SYSTEM) {
        out.log(format!("speaker system {}", name));
        // Gated zone 2 values change meaning
        if ctx.snapshot.zone2_on() {
            out.query(QUERY_ZONE2_VOLUME);
            out.query(QUERY_ZONE2_MUTE);
        }
    }
    out.set(keys::SPEAKER_SYSTEM, code);
    out.set(keys::SPEAKER_SYSTEM_NAME, name);
    Ok(())
}

fn decode_speakers(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    exact_len("SPK", body, 1)?;
    let code = number("SPK", body)?;
    if code != ctx.snapshot.get_int(keys::SPEAKERS) {
        out.log(format!(
            "speakers {}",
            name_or_code(tables::SPEAKER_SELECTIONS, code)
        ));
    }
    out.set(keys::SPEAKERS, code);
    Ok(())
}

fn decode_hdmi_output(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    exact_len("HO", body, 1)?;
    let code = number("HO", body)?;
    if code != ctx.snapshot.get_int(keys::HDMI_OUTPUT) {
        out.log(name_or_code(tables::HDMI_OUTPUTS, code));
    }
    out.set(keys::HDMI_OUTPUT, code);
    Ok(())
}

fn decode_virtual_surround_back(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    exact_len("VSB", body, 1)?;
    let on = number("VSB", body)? == 1;
    if on != ctx.snapshot.get_bool(keys::VIRTUAL_SURROUND_BACK) {
        out.log(format!("virtual surround back {}", on_off(on)));
    }
    out.set(keys::VIRTUAL_SURROUND_BACK, on);
    Ok(())
}

fn decode_virtual_height(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    exact_len("VHT", body, 1)?;
    let on = number("VHT", body)? == 1;
    if on != ctx.snapshot.get_bool(keys::VIRTUAL_HEIGHT) {
        out.log(format!("virtual height {}", on_off(on)));
    }
    out.set(keys::VIRTUAL_HEIGHT, on);
    Ok(())
}

// =============================================================================
// Audio status (AST)
// =============================================================================

/// Length of the AST body on models without extended status
pub const AST_LEGACY_LEN: usize = 43;
/// Length of the AST body carrying the output/PQLS/phase fields
pub const AST_EXTENDED_LEN: usize = 55;

/// Input channel states, as (flag position, key)
static AST_INPUT_FLAGS: &[(usize, &str)] = &[
    (0, keys::AUDIO_INPUT_CH_L),
    (1, keys::AUDIO_INPUT_CH_C),
    (2, keys::AUDIO_INPUT_CH_R),
    (3, keys::AUDIO_INPUT_CH_SL),
    (4, keys::AUDIO_INPUT_CH_SR),
    (5, keys::AUDIO_INPUT_CH_SBL),
    (7, keys::AUDIO_INPUT_CH_SBR),
    (8, keys::AUDIO_INPUT_CH_LFE),
];

fn channel_list(
    body: &str,
    start: usize,
    names: &'static [&'static str],
) -> Result<String, DecodeError> {
    let mut active = Vec::new();
    for (i, name) in names.iter().enumerate() {
        if flag("AST", body, start + i)? {
            active.push(*name);
        }
    }
    Ok(active.join(" "))
}

fn decode_audio_status(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    min_len("AST", body, AST_LEGACY_LEN)?;

    let signal = name_or_code(tables::AUDIO_SIGNALS, number("AST", &body[0..2])?);
    let frequency = name_or_code(tables::AUDIO_FREQUENCIES, number("AST", &body[2..4])?);
    let input_channels = channel_list(body, 4, tables::AUDIO_INPUT_CHANNELS)?;
    let output_channels = channel_list(body, 25, tables::AUDIO_OUTPUT_CHANNELS)?;

    if signal != ctx.snapshot.get_text(keys::AUDIO_INPUT_SIGNAL)
        || frequency != ctx.snapshot.get_text(keys::AUDIO_INPUT_FREQUENCY)
    {
        out.log(format!("audio input {} {}", signal, frequency));
    }
    out.set(keys::AUDIO_INPUT_SIGNAL, signal);
    out.set(keys::AUDIO_INPUT_FREQUENCY, frequency);
    out.set(keys::AUDIO_INPUT_CHANNELS, input_channels);
    out.set(keys::AUDIO_OUTPUT_CHANNELS, output_channels);
    for (at, key) in AST_INPUT_FLAGS {
        out.set(key, flag("AST", body, 4 + at)?);
    }

    if body.len() >= AST_EXTENDED_LEN {
        let out_freq = name_or_code(tables::AUDIO_FREQUENCIES, number("AST", &body[43..45])?);
        let bits = number("AST", &body[45..47])?;
        let pqls = name_or_code(tables::PQLS_MODES, number("AST", &body[51..52])?);
        let delay = number("AST", &body[52..54])?;
        out.set(keys::AUDIO_OUTPUT_FREQUENCY, out_freq);
        out.set(keys::AUDIO_OUTPUT_BITS, format!("{}bit", bits));
        out.set(keys::AUDIO_WORKING_PQLS, pqls);
        out.set(keys::AUDIO_AUTO_PHASE_CONTROL_PLUS, format!("{} ms", delay));
        out.set(keys::AUDIO_REVERSE_PHASE, flag("AST", body, 54)?);
    }
    Ok(())
}

// =============================================================================
// Video status (VST)
// =============================================================================

pub const VST_LEGACY_LEN: usize = 29;
pub const VST_EXTENDED_LEN: usize = 31;

/// Whether an AST or VST line stops short of the extended trailing fields
pub fn lacks_extended_fields(line: &str) -> bool {
    if let Some(body) = line.strip_prefix("AST") {
        body.len() < AST_EXTENDED_LEN
    } else if let Some(body) = line.strip_prefix("VST") {
        body.len() < VST_EXTENDED_LEN
    } else {
        false
    }
}

fn vst_field(body: &str, range: std::ops::Range<usize>) -> Result<i64, DecodeError> {
    number("VST", field("VST", body, range)?)
}

fn decode_video_status(body: &str, ctx: &DecodeContext, out: &mut Decoded) -> Result<(), DecodeError> {
    min_len("VST", body, VST_LEGACY_LEN)?;

    let terminal = name_or_code(tables::VIDEO_TERMINALS, vst_field(body, 0..1)?);
    let in_res = name_or_code(tables::VIDEO_RESOLUTIONS, vst_field(body, 1..3)?);

    if in_res != ctx.snapshot.get_text(keys::VIDEO_INPUT_RESOLUTION)
        || terminal != ctx.snapshot.get_text(keys::VIDEO_INPUT_TERMINAL)
    {
        out.log(format!("video input {} {}", terminal, in_res));
    }

    out.set(keys::VIDEO_INPUT_TERMINAL, terminal);
    out.set(keys::VIDEO_INPUT_RESOLUTION, in_res);
    out.set(
        keys::VIDEO_INPUT_ASPECT,
        name_or_code(tables::VIDEO_ASPECTS, vst_field(body, 3..4)?),
    );
    out.set(
        keys::VIDEO_INPUT_COLOR_FORMAT,
        name_or_code(tables::VIDEO_COLOR_FORMATS, vst_field(body, 4..5)?),
    );
    out.set(
        keys::VIDEO_INPUT_BITS,
        name_or_code(tables::VIDEO_BITS, vst_field(body, 5..6)?),
    );
    out.set(
        keys::VIDEO_INPUT_COLOR_SPACE,
        name_or_code(tables::VIDEO_COLOR_SPACES, vst_field(body, 6..7)?),
    );
    out.set(
        keys::VIDEO_OUTPUT_RESOLUTION,
        name_or_code(tables::VIDEO_RESOLUTIONS, vst_field(body, 7..9)?),
    );
    out.set(
        keys::VIDEO_OUTPUT_ASPECT,
        name_or_code(tables::VIDEO_ASPECTS, vst_field(body, 9..10)?),
    );
    out.set(
        keys::VIDEO_OUTPUT_COLOR_FORMAT,
        name_or_code(tables::VIDEO_COLOR_FORMATS, vst_field(body, 10..11)?),
    );
    out.set(
        keys::VIDEO_OUTPUT_BITS,
        name_or_code(tables::VIDEO_BITS, vst_field(body, 11..12)?),
    );
    out.set(
        keys::VIDEO_OUTPUT_COLOR_SPACE,
        name_or_code(tables::VIDEO_COLOR_SPACES, vst_field(body, 12..13)?),
    );
    out.set(
        keys::HDMI1_RECOMMENDED_RESOLUTION,
        name_or_code(tables::VIDEO_RESOLUTIONS, vst_field(body, 13..15)?),
    );
    out.set(
        keys::HDMI1_DEEP_COLOR,
        name_or_code(tables::VIDEO_BITS, vst_field(body, 15..16)?),
    );
    // 16..21: HDMI 1 colour space support flags
    out.set(
        keys::HDMI2_RECOMMENDED_RESOLUTION,
        name_or_code(tables::VIDEO_RESOLUTIONS, vst_field(body, 21..23)?),
    );
    out.set(
        keys::HDMI2_DEEP_COLOR,
        name_or_code(tables::VIDEO_BITS, vst_field(body, 23..24)?),
    );

    if body.len() >= VST_EXTENDED_LEN {
        out.set(
            keys::VIDEO_INPUT_3D_FORMAT,
            name_or_code(tables::VIDEO_3D_FORMATS, vst_field(body, 29..30)?),
        );
        out.set(
            keys::VIDEO_OUTPUT_3D_FORMAT,
            name_or_code(tables::VIDEO_3D_FORMATS, vst_field(body, 30..31)?),
        );
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        snapshot: StateSnapshot,
        labels: DeviceLabels,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                snapshot: StateSnapshot::new(),
                labels: DeviceLabels::new(),
            }
        }

        fn decode(&self, line: &str) -> Decoded {
            let ctx = DecodeContext {
                snapshot: &self.snapshot,
                labels: &self.labels,
            };
            decode(line, &ctx).unwrap()
        }

        fn try_decode(&self, line: &str) -> Result<Decoded, DecodeError> {
            let ctx = DecodeContext {
                snapshot: &self.snapshot,
                labels: &self.labels,
            };
            decode(line, &ctx)
        }

        /// Decode and apply, like the controller does
        fn feed(&mut self, line: &str) -> Decoded {
            let decoded = self.decode(line);
            for (k, v) in &decoded.updates {
                self.snapshot.update(k, v.clone());
            }
            for l in &decoded.labels {
                self.labels.apply(l);
            }
            decoded
        }

        fn set(&mut self, key: &str, value: impl Into<StateValue>) {
            self.snapshot.update(key, value.into());
        }
    }

    fn value<'a>(d: &'a Decoded, key: &str) -> Option<&'a StateValue> {
        d.updates.iter().rev().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    fn levels(d: &Decoded) -> Vec<(Zone, u8)> {
        d.follow_ups
            .iter()
            .filter_map(|f| match f {
                FollowUp::VirtualLevel { zone, percent } => Some((*zone, *percent)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_no_prefix_is_shadowed() {
        for (i, (earlier, _)) in PREFIXES.iter().enumerate() {
            for (later, _) in &PREFIXES[i + 1..] {
                assert!(
                    !later.starts_with(earlier),
                    "{} is shadowed by earlier prefix {}",
                    later,
                    earlier
                );
            }
        }
    }

    #[test]
    fn test_exact_matches_do_not_shadow_prefixes() {
        // "R" is exact-only; RGB must still reach its handler
        let mut f = Fixture::new();
        f.set(keys::ZONE1_POWER, true);
        f.set(keys::ZONE1_SOURCE, 4i64);
        let d = f.decode("RGB040DVD");
        assert_eq!(value(&d, keys::ZONE1_SOURCE_NAME), Some(&"DVD".into()));
        assert_eq!(f.decode("R"), Decoded::default());
    }

    #[test]
    fn test_unrecognized_line() {
        let f = Fixture::new();
        let d = f.decode("XYZ123");
        assert!(d.unrecognized);
        assert!(d.updates.is_empty());
        assert!(d.log.is_none());
    }

    #[test]
    fn test_zone1_volume_decode() {
        let mut f = Fixture::new();
        f.set(keys::ZONE1_POWER, true);
        for code in 1..=185i64 {
            let d = f.decode(&format!("VOL{:03}", code));
            let db = -80.5 + 0.5 * code as f64;
            let expected = if db < -80.0 { VOLUME_SENTINEL } else { db };
            assert_eq!(value(&d, keys::ZONE1_VOLUME), Some(&StateValue::Float(expected)));
            if expected != VOLUME_SENTINEL {
                assert_eq!(command::zone1_volume_code(expected), code);
            }
        }
    }

    #[test]
    fn test_zone1_volume_sentinel_when_off() {
        let f = Fixture::new();
        let d = f.decode("VOL121");
        assert_eq!(
            value(&d, keys::ZONE1_VOLUME),
            Some(&StateValue::Float(VOLUME_SENTINEL))
        );
        assert!(d.log.is_none());
        assert_eq!(levels(&d), vec![(Zone::Zone1, 0)]);
    }

    #[test]
    fn test_zone2_volume_gated_by_speaker_system() {
        let mut f = Fixture::new();
        f.set(keys::ZONE2_POWER, true);
        f.set(keys::SPEAKER_SYSTEM, SPEAKER_SYSTEM_ZONE2);
        let d = f.decode("ZV61");
        assert_eq!(value(&d, keys::ZONE2_VOLUME), Some(&StateValue::Float(-20.0)));
        assert_eq!(levels(&d), vec![(Zone::Zone2, 75)]);

        // Line-out layout: payload ignored, level follows power
        f.set(keys::SPEAKER_SYSTEM, 0i64);
        let d = f.decode("ZV61");
        assert_eq!(
            value(&d, keys::ZONE2_VOLUME),
            Some(&StateValue::Float(VOLUME_SENTINEL))
        );
        assert_eq!(levels(&d), vec![(Zone::Zone2, 100)]);
        let d = f.decode("Z2MUT0");
        assert_eq!(value(&d, keys::ZONE2_MUTE), Some(&StateValue::Bool(false)));
        assert_eq!(levels(&d), vec![(Zone::Zone2, 100)]);

        f.set(keys::ZONE2_POWER, false);
        let d = f.decode("ZV81");
        assert_eq!(levels(&d), vec![(Zone::Zone2, 0)]);
        let d = f.decode("Z2MUT1");
        assert_eq!(levels(&d), vec![(Zone::Zone2, 0)]);
    }

    #[test]
    fn test_zone2_power_on_sets_unamplified_level() {
        let mut f = Fixture::new();
        let d = f.decode("APR0");
        assert_eq!(levels(&d), vec![(Zone::Zone2, 100)]);

        let mut f = Fixture::new();
        f.set(keys::SPEAKER_SYSTEM, SPEAKER_SYSTEM_ZONE2);
        let d = f.decode("APR0");
        assert!(levels(&d).is_empty());
        assert!(levels(&f.decode("PWR0")).is_empty());
    }

    #[test]
    fn test_zone1_power_off_cascade() {
        let mut f = Fixture::new();
        f.feed("PWR0");
        f.feed("VOL121");
        f.feed("FN04");
        f.feed("RGB040DVD");
        f.feed("MC2");
        f.feed("CLVSW_30");
        assert_eq!(f.snapshot.get_float(keys::ZONE1_VOLUME), -20.0);

        let d = f.feed("PWR1");
        assert_eq!(d.log.as_deref(), Some("power off"));
        assert_eq!(f.snapshot.get_float(keys::ZONE1_VOLUME), VOLUME_SENTINEL);
        assert_eq!(f.snapshot.get_int(keys::ZONE1_SOURCE), 0);
        assert_eq!(f.snapshot.get_text(keys::ZONE1_SOURCE_NAME), "");
        for ch in keys::CHANNEL_LEVELS {
            assert_eq!(f.snapshot.get_float(ch), 0.0);
        }
        assert_eq!(f.snapshot.get_int(keys::MCACC_MEMORY), 0);
        assert_eq!(f.snapshot.get_text(keys::MCACC_MEMORY_NAME), "");
        assert!(!f.snapshot.get_bool(keys::ON_OFF_STATE));
        assert_eq!(f.snapshot.get_text(keys::STATUS), "off");
        assert_eq!(levels(&d), vec![(Zone::Zone1, 0)]);
    }

    #[test]
    fn test_zone2_power_off_cascade() {
        let mut f = Fixture::new();
        f.feed("APR0");
        f.feed("Z2F02");
        f.feed("APR1");
        assert_eq!(f.snapshot.get_int(keys::ZONE2_SOURCE), 0);
        assert_eq!(f.snapshot.get_float(keys::ZONE2_VOLUME), VOLUME_SENTINEL);
        assert!(!f.snapshot.get_bool(keys::ZONE2_MUTE));
    }

    #[test]
    fn test_power_on_requests_zone_gather() {
        let f = Fixture::new();
        let d = f.decode("APR0");
        assert!(d.follow_ups.contains(&FollowUp::GatherZone(Zone::Zone2)));
        assert_eq!(value(&d, keys::STATUS), Some(&"on (zone 2)".into()));
        assert_eq!(d.log.as_deref(), Some("zone 2 power on"));
    }

    #[test]
    fn test_repeated_power_is_quiet() {
        let mut f = Fixture::new();
        f.feed("PWR0");
        let d = f.feed("PWR0");
        assert!(d.log.is_none());
        assert!(!d.follow_ups.contains(&FollowUp::GatherZone(Zone::Zone1)));
    }

    #[test]
    fn test_listening_mode_suppression() {
        let mut f = Fixture::new();
        let first = f.feed("SR0006");
        assert_eq!(first.log.as_deref(), Some("listening mode AUTO SURROUND"));
        assert_eq!(value(&first, keys::LISTENING_MODE), Some(&StateValue::Int(6)));

        let second = f.feed("SR0006");
        assert!(second.updates.is_empty());
        assert!(second.log.is_none());
        assert!(second.follow_ups.is_empty());
    }

    #[test]
    fn test_playing_mode_hex() {
        let mut f = Fixture::new();
        let d = f.feed("LM010a");
        assert_eq!(value(&d, keys::PLAYBACK_MODE), Some(&StateValue::Int(0x010a)));
        assert_eq!(f.snapshot.get_text(keys::PLAYBACK_MODE_NAME), "XM HD Surround");
        assert!(f.feed("LM010a").updates.is_empty());
    }

    #[test]
    fn test_display_special_characters() {
        let f = Fixture::new();
        let body = format!("00{}{}", "81", "41".repeat(13));
        assert_eq!(
            decode_display_text(&body).unwrap(),
            format!("œ{}", "A".repeat(13))
        );
        let d = f.decode(&format!("FL{}", body));
        assert!(d.log.is_none());
        assert!(matches!(
            f.try_decode("FL0041"),
            Err(DecodeError::WrongLength { prefix: "FL", .. })
        ));
        let bad = format!("FL00{}ZZ", "41".repeat(13));
        assert!(matches!(
            f.try_decode(&bad),
            Err(DecodeError::InvalidHex { .. })
        ));
    }

    #[test]
    fn test_source_change_follow_ups() {
        let mut f = Fixture::new();
        f.set(keys::ZONE1_POWER, true);
        f.set(keys::TUNER_BAND, "FM");
        let d = f.feed("FN04");
        assert!(d.log.is_none());
        assert_eq!(
            d.follow_ups,
            vec![
                FollowUp::Query("?RGB04".into()),
                FollowUp::Query("?AST".into()),
            ]
        );
        // Neither zone on the tuner: tuner state cleared
        assert_eq!(f.snapshot.get_text(keys::TUNER_BAND), "");

        let d = f.feed("FN02");
        assert_eq!(
            d.follow_ups,
            vec![
                FollowUp::Query("?RGB02".into()),
                FollowUp::Query("?AST".into()),
                FollowUp::Query("?FR".into()),
                FollowUp::Query("?PR".into()),
            ]
        );

        // Same source again: nothing at all
        assert_eq!(f.feed("FN02"), Decoded::default());
    }

    #[test]
    fn test_tuner_kept_while_other_zone_listens() {
        let mut f = Fixture::new();
        f.set(keys::ZONE2_SOURCE, 2i64);
        f.set(keys::TUNER_BAND, "FM");
        f.feed("FN04");
        assert_eq!(f.snapshot.get_text(keys::TUNER_BAND), "FM");
    }

    #[test]
    fn test_source_label() {
        let mut f = Fixture::new();
        f.set(keys::ZONE1_POWER, true);
        f.set(keys::ZONE2_POWER, true);
        f.set(keys::ZONE1_SOURCE, 25i64);
        f.set(keys::ZONE2_SOURCE, 25i64);
        let d = f.feed("RGB251Blu-ray  ");
        assert_eq!(
            d.labels,
            vec![LabelUpdate::Source {
                code: 25,
                name: "Blu-ray".into()
            }]
        );
        assert_eq!(d.log.as_deref(), Some("source Blu-ray; zone 2 source Blu-ray"));
        assert_eq!(f.snapshot.get_text(keys::ZONE2_SOURCE_NAME), "Blu-ray");

        let again = f.feed("RGB251Blu-ray");
        assert!(again.labels.is_empty());
        assert!(again.log.is_none());
    }

    #[test]
    fn test_tuner_frequencies() {
        assert_eq!(fm_frequency("09910").unwrap(), (99.10, "99.10".to_string()));
        assert_eq!(fm_frequency("10790").unwrap(), (107.90, "107.90".to_string()));
        assert_eq!(am_frequency("00530").unwrap(), (530.0, "530".to_string()));

        let mut f = Fixture::new();
        let d = f.feed("FRF09910");
        assert_eq!(d.log.as_deref(), Some("tuner FM 99.10 MHz"));
        assert_eq!(f.snapshot.get_text(keys::TUNER_BAND), "FM");
        assert!(f.feed("FRF09910").log.is_none());
    }

    #[test]
    fn test_preset_and_label() {
        let mut f = Fixture::new();
        let d = f.feed("PRA01");
        assert_eq!(d.log.as_deref(), Some("tuner preset A01"));
        assert!(f.feed("PRA01").updates.is_empty());

        let d = f.feed("TQA01\"JAZZ FM \"");
        assert_eq!(d.log.as_deref(), Some("tuner preset A01 (JAZZ FM)"));
        assert_eq!(f.snapshot.get_text(keys::TUNER_PRESET_NAME), "JAZZ FM");
        assert_eq!(f.labels.preset_name("A01"), "JAZZ FM");

        assert!(matches!(
            f.try_decode("PRH01"),
            Err(DecodeError::Malformed { .. })
        ));
        assert!(f.try_decode("TQA01JAZZ").is_err());
    }

    #[test]
    fn test_tone_and_levels() {
        let mut f = Fixture::new();
        assert_eq!(value(&f.feed("BA04"), keys::BASS), Some(&StateValue::Float(2.0)));
        assert_eq!(f.feed("TR10").log.as_deref(), Some("treble -4 dB"));
        assert_eq!(
            value(&f.feed("CLVSW_26"), "channelLevelSW"),
            Some(&StateValue::Float(-12.0))
        );
        assert_eq!(
            value(&f.feed("CLVL__50"), "channelLevelL"),
            Some(&StateValue::Float(0.0))
        );
        assert!(f.try_decode("CLVXX_50").is_err());
        assert_eq!(f.feed("TO1").log.as_deref(), Some("tone control on"));
    }

    #[test]
    fn test_lfe_attenuation() {
        let mut f = Fixture::new();
        let d = f.feed("ATM2");
        assert_eq!(value(&d, keys::LFE_ATTENUATION), Some(&StateValue::Float(-10.0)));
        assert_eq!(value(&d, keys::LFE_ATTENUATOR_OFF), Some(&StateValue::Bool(false)));
        let d = f.feed("ATM5");
        assert_eq!(d.log.as_deref(), Some("LFE attenuator off"));
        assert!(f.snapshot.get_bool(keys::LFE_ATTENUATOR_OFF));
    }

    #[test]
    fn test_mcacc() {
        let mut f = Fixture::new();
        f.feed("MCM1MOVIE");
        let d = f.feed("MC1");
        assert_eq!(d.log.as_deref(), Some("MCACC memory 1 (MOVIE)"));
        let d = f.feed("MCM1CINEMA");
        assert_eq!(f.snapshot.get_text(keys::MCACC_MEMORY_NAME), "CINEMA");
        assert_eq!(d.log.as_deref(), Some("MCACC memory 1 (CINEMA)"));
        // MCM never reaches the MC handler
        assert!(f.try_decode("MCM2X").is_ok());
    }

    #[test]
    fn test_speaker_system_change_requeries_zone2() {
        let mut f = Fixture::new();
        f.set(keys::ZONE2_POWER, true);
        let d = f.feed("SSF04");
        assert_eq!(d.log.as_deref(), Some("speaker system ZONE 2"));
        assert_eq!(
            d.follow_ups,
            vec![
                FollowUp::Query("?ZV".into()),
                FollowUp::Query("?Z2M".into())
            ]
        );
        assert!(f.feed("SSF04").follow_ups.is_empty());
    }

    #[test]
    fn test_virtual_height_on() {
        let mut f = Fixture::new();
        let d = f.feed("VHT1");
        assert_eq!(value(&d, keys::VIRTUAL_HEIGHT), Some(&StateValue::Bool(true)));
        assert_eq!(d.log.as_deref(), Some("virtual height on"));
        assert!(f.feed("VSB1").log.is_some());
    }

    #[test]
    fn test_device_errors() {
        let f = Fixture::new();
        let d = f.decode("E04");
        assert_eq!(value(&d, keys::STATUS), Some(&"error".into()));
        assert_eq!(d.log.as_deref(), Some("receiver error E04: command error"));
        let d = f.decode("B00");
        assert_eq!(value(&d, keys::STATUS), Some(&"busy".into()));
    }

    fn ast_legacy() -> String {
        // PCM 48kHz, L R in, L R SW out
        let input = "101000000000000000000";
        let output = "101000001000000000";
        format!("0302{}{}", input, output)
    }

    #[test]
    fn test_audio_status_legacy() {
        let f = Fixture::new();
        let body = ast_legacy();
        assert_eq!(body.len(), AST_LEGACY_LEN);
        let d = f.decode(&format!("AST{}", body));
        assert_eq!(value(&d, keys::AUDIO_INPUT_SIGNAL), Some(&"PCM".into()));
        assert_eq!(value(&d, keys::AUDIO_INPUT_FREQUENCY), Some(&"48kHz".into()));
        assert_eq!(value(&d, keys::AUDIO_INPUT_CHANNELS), Some(&"L R".into()));
        assert_eq!(value(&d, keys::AUDIO_OUTPUT_CHANNELS), Some(&"L R SW".into()));
        assert_eq!(value(&d, keys::AUDIO_INPUT_CH_L), Some(&StateValue::Bool(true)));
        assert_eq!(value(&d, keys::AUDIO_INPUT_CH_C), Some(&StateValue::Bool(false)));
        assert_eq!(value(&d, keys::AUDIO_OUTPUT_FREQUENCY), None);
        assert_eq!(d.log.as_deref(), Some("audio input PCM 48kHz"));
        assert!(d.updates.len() >= 12);
    }

    #[test]
    fn test_audio_status_extended() {
        let f = Fixture::new();
        let body = format!("{}022400001120", ast_legacy());
        assert_eq!(body.len(), AST_EXTENDED_LEN);
        let d = f.decode(&format!("AST{}", body));
        assert_eq!(value(&d, keys::AUDIO_OUTPUT_FREQUENCY), Some(&"48kHz".into()));
        assert_eq!(value(&d, keys::AUDIO_OUTPUT_BITS), Some(&"24bit".into()));
        assert_eq!(value(&d, keys::AUDIO_WORKING_PQLS), Some(&"2h".into()));
        assert_eq!(value(&d, keys::AUDIO_AUTO_PHASE_CONTROL_PLUS), Some(&"12 ms".into()));
        assert_eq!(value(&d, keys::AUDIO_REVERSE_PHASE), Some(&StateValue::Bool(false)));

        assert!(matches!(
            f.try_decode("AST0302"),
            Err(DecodeError::TooShort { prefix: "AST", .. })
        ));
    }

    #[test]
    fn test_video_status() {
        let f = Fixture::new();
        // HDMI 1080/60p 16:9 YCbCr444 24bit Standard -> same out, monitor 1080/60p
        let legacy = "40923110923110910000000000000";
        assert_eq!(legacy.len(), VST_LEGACY_LEN);
        let d = f.decode(&format!("VST{}", legacy));
        assert_eq!(value(&d, keys::VIDEO_INPUT_TERMINAL), Some(&"HDMI".into()));
        assert_eq!(value(&d, keys::VIDEO_INPUT_RESOLUTION), Some(&"1080/60p".into()));
        assert_eq!(value(&d, keys::VIDEO_INPUT_ASPECT), Some(&"16:9".into()));
        assert_eq!(value(&d, keys::VIDEO_OUTPUT_RESOLUTION), Some(&"1080/60p".into()));
        assert_eq!(value(&d, keys::HDMI1_RECOMMENDED_RESOLUTION), Some(&"1080/60p".into()));
        assert_eq!(value(&d, keys::VIDEO_INPUT_3D_FORMAT), None);
        assert!(d.updates.len() >= 12);

        let d = f.decode(&format!("VST{}18", legacy));
        assert_eq!(value(&d, keys::VIDEO_INPUT_3D_FORMAT), Some(&"Frame packing".into()));
        assert_eq!(
            value(&d, keys::VIDEO_OUTPUT_3D_FORMAT),
            Some(&"Side-by-Side(Half)".into())
        );
    }

    #[test]
    fn test_extended_field_presence() {
        let legacy = "40923110923110910000000000000";
        assert!(lacks_extended_fields(&format!("VST{}", legacy)));
        assert!(!lacks_extended_fields(&format!("VST{}18", legacy)));
        assert!(lacks_extended_fields(&format!("AST{}", ast_legacy())));
        assert!(!lacks_extended_fields(&format!("AST{}022400001120", ast_legacy())));
        assert!(!lacks_extended_fields("PWR0"));
    }
}
