//! Pioneer Receiver Model Database
//!
//! Masks are kept exactly as each model documents them, including the places
//! where near-identical siblings disagree.

use super::{ModelInfo, ModelVariant, RemoteMap, SourceFamily};
use crate::state::Zone;

// =============================================================================
// Remote button maps
// =============================================================================

static TUNER_ZONE1: &[(&str, &str)] = &[
    ("up", "TPI"),
    ("down", "TPD"),
    ("right", "TFI"),
    ("left", "TFD"),
    ("band", "TB"),
    ("class", "TC"),
];

static TUNER_ZONE2: &[(&str, &str)] = &[
    ("up", "TPI"),
    ("down", "TPD"),
    ("right", "TFI"),
    ("left", "TFD"),
];

static IPOD_ZONE1: &[(&str, &str)] = &[
    ("play", "00IP"),
    ("pause", "01IP"),
    ("stop", "02IP"),
    ("previous", "03IP"),
    ("next", "04IP"),
    ("rewind", "05IP"),
    ("forward", "06IP"),
    ("repeat", "07IP"),
    ("shuffle", "08IP"),
    ("display", "09IP"),
    ("up", "13IP"),
    ("down", "14IP"),
    ("right", "15IP"),
    ("left", "16IP"),
    ("enter", "17IP"),
    ("return", "18IP"),
    ("menu", "19IP"),
];

static IPOD_ZONE2: &[(&str, &str)] = &[
    ("play", "00IP"),
    ("pause", "01IP"),
    ("stop", "02IP"),
    ("previous", "03IP"),
    ("next", "04IP"),
];

static NETWORK_ZONE1: &[(&str, &str)] = &[
    ("play", "10NW"),
    ("pause", "11NW"),
    ("previous", "12NW"),
    ("next", "13NW"),
    ("display", "18NW"),
    ("stop", "20NW"),
    ("up", "26NW"),
    ("down", "27NW"),
    ("right", "28NW"),
    ("left", "29NW"),
    ("enter", "30NW"),
    ("return", "31NW"),
    ("repeat", "34NW"),
    ("shuffle", "35NW"),
];

/// VSX-1021 firmware has no repeat/shuffle for network sources
static NETWORK_ZONE1_1021: &[(&str, &str)] = &[
    ("play", "10NW"),
    ("pause", "11NW"),
    ("previous", "12NW"),
    ("next", "13NW"),
    ("display", "18NW"),
    ("stop", "20NW"),
    ("up", "26NW"),
    ("down", "27NW"),
    ("right", "28NW"),
    ("left", "29NW"),
    ("enter", "30NW"),
    ("return", "31NW"),
];

static NETWORK_ZONE2: &[(&str, &str)] = &[
    ("play", "10NW"),
    ("pause", "11NW"),
    ("previous", "12NW"),
    ("next", "13NW"),
    ("stop", "20NW"),
];

static OTHER_ZONE1: &[(&str, &str)] = &[
    ("up", "CUP"),
    ("down", "CDN"),
    ("right", "CRI"),
    ("left", "CLE"),
    ("enter", "CEN"),
    ("return", "CRT"),
    ("menu", "HM"),
];

static REMOTE_MAPS_1021: &[RemoteMap] = &[
    RemoteMap { family: SourceFamily::Tuner, zone: Zone::Zone1, buttons: TUNER_ZONE1 },
    RemoteMap { family: SourceFamily::Tuner, zone: Zone::Zone2, buttons: TUNER_ZONE2 },
    RemoteMap { family: SourceFamily::IpodUsb, zone: Zone::Zone1, buttons: IPOD_ZONE1 },
    RemoteMap { family: SourceFamily::IpodUsb, zone: Zone::Zone2, buttons: IPOD_ZONE2 },
    RemoteMap { family: SourceFamily::Network, zone: Zone::Zone1, buttons: NETWORK_ZONE1_1021 },
    RemoteMap { family: SourceFamily::Network, zone: Zone::Zone2, buttons: NETWORK_ZONE2 },
    RemoteMap { family: SourceFamily::Other, zone: Zone::Zone1, buttons: OTHER_ZONE1 },
];

static REMOTE_MAPS: &[RemoteMap] = &[
    RemoteMap { family: SourceFamily::Tuner, zone: Zone::Zone1, buttons: TUNER_ZONE1 },
    RemoteMap { family: SourceFamily::Tuner, zone: Zone::Zone2, buttons: TUNER_ZONE2 },
    RemoteMap { family: SourceFamily::IpodUsb, zone: Zone::Zone1, buttons: IPOD_ZONE1 },
    RemoteMap { family: SourceFamily::IpodUsb, zone: Zone::Zone2, buttons: IPOD_ZONE2 },
    RemoteMap { family: SourceFamily::Network, zone: Zone::Zone1, buttons: NETWORK_ZONE1 },
    RemoteMap { family: SourceFamily::Network, zone: Zone::Zone2, buttons: NETWORK_ZONE2 },
    RemoteMap { family: SourceFamily::Other, zone: Zone::Zone1, buttons: OTHER_ZONE1 },
];

// =============================================================================
// Models
// =============================================================================

/// All known Pioneer receiver models
pub static MODELS: &[ModelInfo] = &[
    ModelInfo {
        variant: ModelVariant::Vsx1021,
        name: "VSX-1021",
        port: 23,
        extended_status: false,
        unsupported_sources: &[
            0, 13, 22, 23, 24, 27, 31, 34, 40, 41, 44, 45, 46, 47, 48,
        ],
        unsupported_listening_modes: &[
            31, 34, 37, 38, 39, 40, 41, 42, 50, 51, 52, 53, 54, 55, 56, 57, 58, 67, 68, 69, 70,
            71, 72, 73, 74, 75, 76, 77, 78, 92, 93, 94, 95, 152, 153,
        ],
        remote_maps: REMOTE_MAPS_1021,
    },
    ModelInfo {
        variant: ModelVariant::Vsx1022,
        name: "VSX-1022",
        port: 8102,
        extended_status: false,
        unsupported_sources: &[0, 13, 23, 24, 27, 31, 34, 40, 45, 47, 48],
        unsupported_listening_modes: &[
            31, 34, 50, 51, 52, 53, 54, 55, 56, 57, 58, 67, 68, 69, 70, 71, 72, 73, 74, 75, 76,
            77, 78, 92, 93, 94, 95, 152,
        ],
        remote_maps: REMOTE_MAPS,
    },
    ModelInfo {
        variant: ModelVariant::Vsx1122,
        name: "VSX-1122",
        port: 8102,
        extended_status: false,
        unsupported_sources: &[0, 13, 23, 24, 27, 31, 34, 40, 45, 47, 48, 33],
        unsupported_listening_modes: &[
            31, 34, 50, 51, 52, 53, 54, 55, 56, 57, 58, 67, 68, 69, 70, 71, 72, 73, 74, 75, 76,
            77, 78, 92, 93, 94, 95, 152, 3, 4,
        ],
        remote_maps: REMOTE_MAPS,
    },
    ModelInfo {
        variant: ModelVariant::Vsx1123,
        name: "VSX-1123",
        port: 8102,
        extended_status: true,
        unsupported_sources: &[0, 13, 24, 27, 31, 40, 47],
        unsupported_listening_modes: &[
            50, 51, 52, 53, 54, 55, 56, 57, 58, 67, 68, 69, 70, 71, 72, 73, 74, 75, 76, 77, 78,
            92, 93, 94, 95,
        ],
        remote_maps: REMOTE_MAPS,
    },
    ModelInfo {
        variant: ModelVariant::Sc75,
        name: "SC-75",
        port: 8102,
        extended_status: true,
        unsupported_sources: &[0, 13, 27, 31, 40],
        unsupported_listening_modes: &[92, 93, 94, 95],
        remote_maps: REMOTE_MAPS,
    },
];
