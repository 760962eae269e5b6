//! Pioneer receiver lookup tables
//!
//! Static code → name maps used by the decoder, the gatherer and the action
//! validators. All tables are sorted by code so that gather order and
//! listings are stable.

// =============================================================================
// Input Sources
// =============================================================================

/// Tuner source code
pub const SOURCE_TUNER: u8 = 2;

/// iPod/USB source code
pub const SOURCE_IPOD_USB: u8 = 17;

/// Input source codes with their factory names
pub static SOURCES: &[(u8, &str)] = &[
    (0, "PHONO"),
    (1, "CD"),
    (2, "TUNER"),
    (4, "DVD"),
    (5, "TV/SAT"),
    (6, "SAT/CBL"),
    (10, "VIDEO 1"),
    (12, "MULTI CH IN"),
    (13, "USB-DAC"),
    (14, "VIDEO 2"),
    (15, "DVR/BDR"),
    (17, "iPod/USB"),
    (19, "HDMI 1"),
    (20, "HDMI 2"),
    (21, "HDMI 3"),
    (22, "HDMI 4"),
    (23, "HDMI 5"),
    (24, "HDMI 6"),
    (25, "BD"),
    (26, "HOME MEDIA GALLERY"),
    (27, "SIRIUS"),
    (31, "HDMI (cyclic)"),
    (33, "ADAPTER PORT"),
    (34, "HDMI 7"),
    (38, "INTERNET RADIO"),
    (40, "SiriusXM"),
    (41, "PANDORA"),
    (44, "MEDIA SERVER"),
    (45, "FAVORITES"),
    (46, "AirPlay"),
    (47, "DMR"),
    (48, "MHL"),
];

/// Network sources that share the network remote map
pub static NETWORK_SOURCES: &[u8] = &[26, 38, 40, 41, 44, 45, 46, 47];

pub fn source_name(code: u8) -> Option<&'static str> {
    SOURCES.iter().find(|(c, _)| *c == code).map(|(_, n)| *n)
}

// =============================================================================
// Listening Modes (SR)
// =============================================================================

/// Listening mode set codes, as used in `nnnnSR` and `SRnnnn`
pub static LISTENING_MODES: &[(u16, &str)] = &[
    (1, "STEREO (cyclic)"),
    (3, "Front Stage Surround Advance Focus"),
    (4, "Front Stage Surround Advance Wide"),
    (5, "AUTO SURR/STREAM DIRECT (cyclic)"),
    (6, "AUTO SURROUND"),
    (7, "DIRECT"),
    (8, "PURE DIRECT"),
    (9, "STEREO (direct set)"),
    (10, "STANDARD"),
    (11, "(2ch source)"),
    (12, "PRO LOGIC"),
    (13, "PRO LOGIC2 MOVIE"),
    (14, "PRO LOGIC2 MUSIC"),
    (15, "PRO LOGIC2 GAME"),
    (16, "Neo:6 CINEMA"),
    (17, "Neo:6 MUSIC"),
    (18, "PRO LOGIC2x MOVIE"),
    (19, "PRO LOGIC2x MUSIC"),
    (20, "PRO LOGIC2x GAME"),
    (21, "(Multi ch source)"),
    (22, "(Multi ch source)+DOLBY EX"),
    (23, "(Multi ch source)+PRO LOGIC2x MOVIE"),
    (24, "(Multi ch source)+PRO LOGIC2x MUSIC"),
    (25, "(Multi ch source)DTS-ES Neo:6"),
    (26, "(Multi ch source)DTS-ES matrix"),
    (27, "(Multi ch source)DTS-ES discrete"),
    (30, "(Multi ch source)DTS-ES 8ch discrete"),
    (31, "PRO LOGIC2z HEIGHT"),
    (32, "WIDE SURROUND MOVIE"),
    (33, "WIDE SURROUND MUSIC"),
    (34, "(Multi ch source)+PRO LOGIC2z HEIGHT"),
    (35, "(Multi ch source)+WIDE SURROUND MOVIE"),
    (36, "(Multi ch source)+WIDE SURROUND MUSIC"),
    (37, "Neo:X CINEMA"),
    (38, "Neo:X MUSIC"),
    (39, "Neo:X GAME"),
    (40, "(Multi ch source)+Neo:X CINEMA"),
    (41, "(Multi ch source)+Neo:X MUSIC"),
    (42, "(Multi ch source)+Neo:X GAME"),
    (50, "THX (cyclic)"),
    (51, "PROLOGIC + THX CINEMA"),
    (52, "PL2 MOVIE + THX CINEMA"),
    (53, "Neo:6 CINEMA + THX CINEMA"),
    (54, "PL2x MOVIE + THX CINEMA"),
    (55, "THX SELECT2 GAMES"),
    (56, "THX CINEMA (for multi ch)"),
    (57, "THX SURROUND EX (for multi ch)"),
    (58, "PL2x MOVIE + THX CINEMA (for multi ch)"),
    (67, "ES 8ch DISCRETE + THX CINEMA (for multi ch)"),
    (68, "THX CINEMA (for 2ch)"),
    (69, "THX MUSIC (for 2ch)"),
    (70, "THX GAMES (for 2ch)"),
    (71, "PL2 MUSIC + THX MUSIC"),
    (72, "PL2x MUSIC + THX MUSIC"),
    (73, "Neo:6 MUSIC + THX MUSIC"),
    (74, "PL2 GAME + THX GAMES"),
    (75, "PL2x GAME + THX GAMES"),
    (76, "THX ULTRA2 GAMES"),
    (77, "PROLOGIC + THX MUSIC"),
    (78, "PROLOGIC + THX GAMES"),
    (92, "PL2z HEIGHT + THX CINEMA"),
    (93, "PL2z HEIGHT + THX MUSIC"),
    (94, "PL2z HEIGHT + THX GAMES"),
    (95, "PL2z HEIGHT + THX CINEMA (for multi ch)"),
    (100, "ADVANCED SURROUND (cyclic)"),
    (101, "ACTION"),
    (102, "SCI-FI"),
    (103, "DRAMA"),
    (104, "ENTERTAINMENT SHOW"),
    (105, "MONO FILM"),
    (106, "EXPANDED THEATER"),
    (107, "CLASSICAL"),
    (109, "UNPLUGGED"),
    (110, "ROCK/POP"),
    (112, "EXTENDED STEREO"),
    (113, "PHONES SURROUND"),
    (116, "TV SURROUND"),
    (117, "SPORTS"),
    (118, "ADVANCED GAME"),
    (151, "Auto Level Control (A.L.C.)"),
    (152, "OPTIMUM SURROUND"),
    (153, "RETRIEVER AIR"),
];

pub fn listening_mode_name(code: u16) -> Option<&'static str> {
    LISTENING_MODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, n)| *n)
}

// =============================================================================
// Playing Modes (LM)
// =============================================================================

/// Playing (playback) modes reported by `LMhhhh`, keyed by hex value
pub static PLAYING_MODES: &[(u16, &str)] = &[
    (0x0101, "[)(]PLIIx MOVIE"),
    (0x0102, "[)(]PLII MOVIE"),
    (0x0103, "[)(]PLIIx MUSIC"),
    (0x0104, "[)(]PLII MUSIC"),
    (0x0105, "[)(]PLIIx GAME"),
    (0x0106, "[)(]PLII GAME"),
    (0x0107, "[)(]PROLOGIC"),
    (0x0108, "Neo:6 CINEMA"),
    (0x0109, "Neo:6 MUSIC"),
    (0x010a, "XM HD Surround"),
    (0x010b, "NEURAL SURR"),
    (0x010c, "2ch Straight Decode"),
    (0x010d, "[)(]PLIIz HEIGHT"),
    (0x010e, "WIDE SURR MOVIE"),
    (0x010f, "WIDE SURR MUSIC"),
    (0x0110, "STEREO"),
    (0x0111, "Neo:X CINEMA"),
    (0x0112, "Neo:X MUSIC"),
    (0x0113, "Neo:X GAME"),
    (0x0201, "ACTION"),
    (0x0202, "DRAMA"),
    (0x0203, "SCI-FI"),
    (0x0204, "MONOFILM"),
    (0x0205, "ENT.SHOW"),
    (0x0206, "EXPANDED"),
    (0x0207, "TV SURROUND"),
    (0x0208, "ADVANCEDGAME"),
    (0x0209, "SPORTS"),
    (0x020a, "CLASSICAL"),
    (0x020b, "ROCK/POP"),
    (0x020c, "UNPLUGGED"),
    (0x020d, "EXT.STEREO"),
    (0x020e, "PHONES SURR."),
    (0x020f, "FRONT STAGE SURROUND ADVANCE FOCUS"),
    (0x0210, "FRONT STAGE SURROUND ADVANCE WIDE"),
    (0x0211, "SOUND RETRIEVER AIR"),
    (0x0301, "[)(]PLIIx MOVIE +THX"),
    (0x0302, "[)(]PLII MOVIE +THX"),
    (0x0303, "[)(]PL +THX CINEMA"),
    (0x0304, "Neo:6 CINEMA +THX"),
    (0x0305, "THX CINEMA"),
    (0x0306, "[)(]PLIIx MUSIC +THX"),
    (0x0307, "[)(]PLII MUSIC +THX"),
    (0x0308, "[)(]PL +THX MUSIC"),
    (0x0309, "Neo:6 MUSIC +THX"),
    (0x030a, "THX MUSIC"),
    (0x030b, "[)(]PLIIx GAME +THX"),
    (0x030c, "[)(]PLII GAME +THX"),
    (0x030d, "[)(]PL +THX GAMES"),
    (0x030e, "THX ULTRA2 GAMES"),
    (0x030f, "THX SELECT2 GAMES"),
    (0x0310, "THX GAMES"),
    (0x0401, "STEREO"),
    (0x0402, "[)(]PLII MOVIE"),
    (0x0403, "[)(]PLIIx MOVIE"),
    (0x0404, "Neo:6 CINEMA"),
    (0x0405, "AUTO SURROUND Straight Decode"),
    (0x0406, "[)(]DIGITAL EX"),
    (0x0407, "[)(]PLIIx MOVIE"),
    (0x0408, "DTS +Neo:6"),
    (0x0409, "ES MATRIX"),
    (0x040a, "ES DISCRETE"),
    (0x040b, "DTS-ES 8ch"),
    (0x0501, "STEREO"),
    (0x0502, "[)(]PLII MOVIE"),
    (0x0503, "[)(]PLIIx MOVIE"),
    (0x0504, "Neo:6 CINEMA"),
    (0x0505, "ALC Straight Decode"),
    (0x0601, "STEREO"),
    (0x0701, "STREAM DIRECT NORMAL"),
    (0x0702, "STREAM DIRECT NORMAL (Multi ch)"),
    (0x0801, "PURE DIRECT"),
    (0x0881, "OPTIMUM"),
    (0x0e01, "HDMI THROUGH"),
    (0x0f01, "MULTI CH IN"),
];

pub fn playing_mode_name(code: u16) -> Option<&'static str> {
    PLAYING_MODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, n)| *n)
}

// =============================================================================
// Speaker System, Speakers, HDMI Output
// =============================================================================

/// Speaker system layout in which zone 2 is powered by the amplifier
pub const SPEAKER_SYSTEM_ZONE2: i64 = 4;

pub static SPEAKER_SYSTEMS: &[(u8, &str)] = &[
    (0, "SB/FH"),
    (1, "SB/FW"),
    (2, "Speaker B"),
    (3, "Front Bi-Amp"),
    (4, "ZONE 2"),
    (10, "9.1ch FH/FW"),
    (11, "7.2.2ch TMd/FW"),
];

pub fn speaker_system_name(code: u8) -> Option<&'static str> {
    SPEAKER_SYSTEMS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, n)| *n)
}

pub static SPEAKER_SELECTIONS: &[(u8, &str)] = &[
    (0, "OFF"),
    (1, "A"),
    (2, "B"),
    (3, "A+B"),
];

pub static HDMI_OUTPUTS: &[(u8, &str)] = &[
    (0, "HDMI OUT ALL"),
    (1, "HDMI OUT 1"),
    (2, "HDMI OUT 2"),
    (3, "HDMI OUT OFF"),
];

pub fn lookup_u8(table: &'static [(u8, &'static str)], code: u8) -> Option<&'static str> {
    table.iter().find(|(c, _)| *c == code).map(|(_, n)| *n)
}

// =============================================================================
// Channel Trim
// =============================================================================

/// Wire channel codes for `?<ch>CLV` / `CLV<ch><nn>`, paired with the state
/// suffix. Order matches `state::keys::CHANNEL_LEVELS`.
pub static CHANNELS: &[(&str, &str)] = &[
    ("L__", "L"),
    ("R__", "R"),
    ("C__", "C"),
    ("SL_", "SL"),
    ("SR_", "SR"),
    ("SBL", "SBL"),
    ("SBR", "SBR"),
    ("SW_", "SW"),
    ("LH_", "LH"),
    ("RH_", "RH"),
    ("LW_", "LW"),
    ("RW_", "RW"),
];

/// Index into [`CHANNELS`] for a 3-character wire code
pub fn channel_index(wire: &str) -> Option<usize> {
    CHANNELS.iter().position(|(w, _)| *w == wire)
}

// =============================================================================
// Audio Status (AST)
// =============================================================================

pub static AUDIO_SIGNALS: &[(u8, &str)] = &[
    (0, "ANALOG"),
    (1, "ANALOG"),
    (2, "ANALOG"),
    (3, "PCM"),
    (4, "PCM"),
    (5, "DOLBY DIGITAL"),
    (6, "DTS"),
    (7, "DTS-ES Matrix"),
    (8, "DTS-ES Discrete"),
    (9, "DTS 96/24"),
    (10, "DTS 96/24 ES Matrix"),
    (11, "DTS 96/24 ES Discrete"),
    (12, "MPEG-2 AAC"),
    (13, "WMA9 Pro"),
    (14, "DSD->PCM"),
    (15, "HDMI THROUGH"),
    (16, "DOLBY DIGITAL PLUS"),
    (17, "DOLBY TrueHD"),
    (18, "DTS EXPRESS"),
    (19, "DTS-HD Master Audio"),
    (20, "DTS-HD High Resolution"),
    (21, "DTS-HD High Resolution"),
    (22, "DTS-HD High Resolution"),
    (23, "DTS-HD High Resolution"),
    (24, "DTS-HD High Resolution"),
    (25, "DTS-HD Master Audio"),
    (26, "DSD"),
    (64, "MP3"),
    (65, "WAV"),
    (66, "WMA"),
    (67, "MPEG4-AAC"),
    (68, "FLAC"),
    (69, "ALAC (Apple Lossless)"),
    (70, "AIFF"),
    (71, "DSD (USB-DAC)"),
];

pub static AUDIO_FREQUENCIES: &[(u8, &str)] = &[
    (0, "32kHz"),
    (1, "44.1kHz"),
    (2, "48kHz"),
    (3, "88.2kHz"),
    (4, "96kHz"),
    (5, "176.4kHz"),
    (6, "192kHz"),
    (7, "---"),
    (32, "2.8MHz"),
    (33, "5.6MHz"),
];

/// Input channel flag positions in the AST blob (chars 5..=25)
pub static AUDIO_INPUT_CHANNELS: &[&str] = &[
    "L", "C", "R", "SL", "SR", "SBL", "SBC", "SBR", "LFE", "FHL", "FHR", "FWL", "FWR", "XL",
    "XC", "XR",
];

/// Output channel flag positions in the AST blob (chars 26..=43)
pub static AUDIO_OUTPUT_CHANNELS: &[&str] = &[
    "L", "C", "R", "SL", "SR", "SBL", "SB", "SBR", "SW", "FHL", "FHR", "FWL", "FWR",
];

pub static PQLS_MODES: &[(u8, &str)] = &[
    (0, "OFF"),
    (1, "2h"),
    (2, "Multi-ch"),
    (3, "Bitstream"),
];

// =============================================================================
// Video Status (VST)
// =============================================================================

pub static VIDEO_TERMINALS: &[(u8, &str)] = &[
    (0, "---"),
    (1, "VIDEO"),
    (2, "S-VIDEO"),
    (3, "COMPONENT"),
    (4, "HDMI"),
    (5, "Self OSD/JPEG"),
];

pub static VIDEO_RESOLUTIONS: &[(u8, &str)] = &[
    (0, "---"),
    (1, "480/60i"),
    (2, "576/50i"),
    (3, "480/60p"),
    (4, "576/50p"),
    (5, "720/60p"),
    (6, "720/50p"),
    (7, "1080/60i"),
    (8, "1080/50i"),
    (9, "1080/60p"),
    (10, "1080/50p"),
    (11, "1080/24p"),
    (12, "4Kx2K/24Hz"),
    (13, "4Kx2K/25Hz"),
    (14, "4Kx2K/30Hz"),
    (15, "4Kx2K/24Hz(SMPTE)"),
    (16, "4Kx2K/50Hz"),
    (17, "4Kx2K/60Hz"),
];

pub static VIDEO_ASPECTS: &[(u8, &str)] = &[(0, "---"), (1, "4:3"), (2, "16:9"), (3, "14:9")];

pub static VIDEO_COLOR_FORMATS: &[(u8, &str)] = &[
    (0, "---"),
    (1, "RGB Limit"),
    (2, "RGB Full"),
    (3, "YCbCr444"),
    (4, "YCbCr422"),
    (5, "YCbCr420"),
];

pub static VIDEO_BITS: &[(u8, &str)] = &[
    (0, "---"),
    (1, "24bit (8bit*3)"),
    (2, "30bit (10bit*3)"),
    (3, "36bit (12bit*3)"),
    (4, "48bit (16bit*3)"),
];

pub static VIDEO_COLOR_SPACES: &[(u8, &str)] = &[
    (0, "---"),
    (1, "Standard"),
    (2, "xvYCC601"),
    (3, "xvYCC709"),
    (4, "sYCC"),
    (5, "AdobeYCC601"),
    (6, "AdobeRGB"),
];

pub static VIDEO_3D_FORMATS: &[(u8, &str)] = &[
    (0, "---"),
    (1, "Frame packing"),
    (2, "Field alternative"),
    (3, "Line alternative"),
    (4, "Side-by-Side(Full)"),
    (5, "L + depth"),
    (6, "L + depth + graphics"),
    (7, "Top-and-Bottom"),
    (8, "Side-by-Side(Half)"),
];

// =============================================================================
// Display (FL) Special Characters
// =============================================================================

/// Glyphs for display codes outside printable ASCII
pub static SPECIAL_CHARACTERS: &[(u8, &str)] = &[
    (0x00, " "),
    (0x01, "\u{21BB}"),
    (0x02, "\u{21BB}1"),
    (0x03, "\u{21C4}"),
    (0x04, "\u{21C4}\u{21BB}"),
    (0x05, "[)"),
    (0x06, "(]"),
    (0x07, "I"),
    (0x08, "II"),
    (0x09, "<"),
    (0x0A, ">"),
    (0x0B, "\u{2665}"),
    (0x0C, "."),
    (0x0D, ".0"),
    (0x0E, ".5"),
    (0x0F, "\u{03A9}"),
    (0x1A, "\u{25B6}"),
    (0x1B, "\u{25C0}"),
    (0x1C, "\u{2191}"),
    (0x1D, "\u{2193}"),
    (0x1E, "\u{2192}"),
    (0x1F, "\u{2190}"),
    (0x7F, "\u{25C6}"),
    (0x80, "\u{0152}"),
    (0x81, "\u{0153}"),
    (0x82, "\u{0132}"),
    (0x83, "\u{0133}"),
    (0x84, "\u{03C0}"),
    (0x85, "\u{00B1}"),
    (0x8B, "\u{00B0}"),
    (0x8C, "\u{2190}"),
    (0x8D, "\u{2191}"),
    (0x8E, "\u{2192}"),
    (0x8F, "\u{2193}"),
];

/// Render one display code
pub fn display_char(code: u8) -> String {
    match code {
        0x20..=0x7E => (code as char).to_string(),
        0xA0..=0xFF => char::from(code).to_string(),
        _ => lookup_u8(SPECIAL_CHARACTERS, code)
            .unwrap_or(" ")
            .to_string(),
    }
}
