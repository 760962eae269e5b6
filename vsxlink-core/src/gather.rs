//! Status gather batches
//!
//! A full gather runs in two stages. The first stage asks for power, the
//! speaker layout and every label; once it has drained, the snapshot knows
//! which zones are on and the second stage asks for their status.

use crate::models::ModelInfo;
use crate::protocol::command::{self, *};
use crate::protocol::tables::{self, SOURCE_TUNER};
use crate::state::{StateSnapshot, Zone};

/// Number of MCACC memories
pub const MCACC_MEMORIES: u8 = 6;

/// First stage: display, power, speaker layout, source and MCACC labels
pub fn initial_queries(model: &ModelInfo) -> Vec<String> {
    let mut queries: Vec<String> = [
        QUERY_DISPLAY,
        QUERY_POWER,
        QUERY_ZONE2_POWER,
        QUERY_SPEAKER_SYSTEM,
    ]
    .iter()
    .map(|q| q.to_string())
    .collect();

    queries.extend(
        tables::SOURCES
            .iter()
            .map(|(code, _)| *code)
            .filter(|code| model.supports_source(*code))
            .map(command::query_source_name),
    );
    queries.extend((1..=MCACC_MEMORIES).map(command::query_mcacc_name));
    queries
}

/// Status batch for one zone
pub fn zone_queries(zone: Zone, snapshot: &StateSnapshot) -> Vec<String> {
    let mut queries: Vec<String> = match zone {
        Zone::Zone1 => {
            let mut q: Vec<String> = [
                QUERY_VOLUME,
                QUERY_MUTE,
                QUERY_SOURCE,
                QUERY_AUDIO_STATUS,
                QUERY_VIDEO_STATUS,
                QUERY_LISTENING_MODE,
                QUERY_PLAYING_MODE,
                QUERY_TONE,
                QUERY_BASS,
                QUERY_TREBLE,
                QUERY_LFE_ATTENUATION,
            ]
            .iter()
            .map(|q| q.to_string())
            .collect();
            q.extend(
                tables::CHANNELS
                    .iter()
                    .map(|(wire, _)| command::query_channel_level(wire)),
            );
            q.extend(
                [
                    QUERY_MCACC,
                    QUERY_SPEAKERS,
                    QUERY_HDMI_OUTPUT,
                    QUERY_VIRTUAL_SURROUND_BACK,
                    QUERY_VIRTUAL_HEIGHT,
                ]
                .iter()
                .map(|q| q.to_string()),
            );
            q
        }
        Zone::Zone2 => [QUERY_ZONE2_VOLUME, QUERY_ZONE2_MUTE, QUERY_ZONE2_SOURCE]
            .iter()
            .map(|q| q.to_string())
            .collect(),
    };

    if snapshot.zone_source(zone) == SOURCE_TUNER {
        queries.push(QUERY_TUNER_FREQUENCY.to_string());
        queries.push(QUERY_TUNER_PRESET.to_string());
    }
    queries
}

/// Second stage: status batches for every zone that is on
pub fn powered_zone_queries(snapshot: &StateSnapshot) -> Vec<String> {
    [Zone::Zone1, Zone::Zone2]
        .into_iter()
        .filter(|z| snapshot.zone_on(*z))
        .flat_map(|z| zone_queries(z, snapshot))
        .collect()
}
