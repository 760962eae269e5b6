//! Receiver Model Database
//!
//! Per-variant capabilities: TCP port, extended status support, the sources
//! and listening modes the model does NOT support, and the remote button
//! maps. Everything else about a receiver is learned from its responses.

use serde::{Deserialize, Serialize};

use crate::protocol::tables::{NETWORK_SOURCES, SOURCE_IPOD_USB, SOURCE_TUNER};
use crate::state::Zone;

pub mod pioneer;

/// Supported receiver models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelVariant {
    #[serde(rename = "VSX-1021")]
    Vsx1021,
    #[serde(rename = "VSX-1022")]
    Vsx1022,
    #[serde(rename = "VSX-1122")]
    Vsx1122,
    #[serde(rename = "VSX-1123")]
    Vsx1123,
    #[serde(rename = "SC-75")]
    Sc75,
}

impl ModelVariant {
    pub fn info(self) -> &'static ModelInfo {
        get_model(self)
    }
}

impl std::fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.info().name)
    }
}

/// Which remote map applies, derived from the zone's current source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFamily {
    Tuner,
    IpodUsb,
    Network,
    Other,
}

impl SourceFamily {
    pub fn of(source: u8) -> Self {
        if source == SOURCE_TUNER {
            SourceFamily::Tuner
        } else if source == SOURCE_IPOD_USB {
            SourceFamily::IpodUsb
        } else if NETWORK_SOURCES.contains(&source) {
            SourceFamily::Network
        } else {
            SourceFamily::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFamily::Tuner => "tuner",
            SourceFamily::IpodUsb => "iPod/USB",
            SourceFamily::Network => "network",
            SourceFamily::Other => "other",
        }
    }
}

/// Button → command map for one source family and zone
#[derive(Debug, Clone)]
pub struct RemoteMap {
    pub family: SourceFamily,
    pub zone: Zone,
    /// (button id, wire command)
    pub buttons: &'static [(&'static str, &'static str)],
}

/// Information about a specific receiver model
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub variant: ModelVariant,
    /// Model name as printed on the front panel (e.g., "VSX-1021")
    pub name: &'static str,
    /// Default TCP control port
    pub port: u16,
    /// Whether AST/VST replies carry the extended trailing fields
    pub extended_status: bool,
    /// Source codes this model does not support
    pub unsupported_sources: &'static [u8],
    /// Listening mode codes this model does not support
    pub unsupported_listening_modes: &'static [u16],
    pub remote_maps: &'static [RemoteMap],
}

impl ModelInfo {
    pub fn supports_source(&self, code: u8) -> bool {
        !self.unsupported_sources.contains(&code)
    }

    pub fn supports_listening_mode(&self, code: u16) -> bool {
        !self.unsupported_listening_modes.contains(&code)
    }

    /// Wire command for a remote button, if valid for the family and zone
    pub fn remote_command(
        &self,
        family: SourceFamily,
        zone: Zone,
        button: &str,
    ) -> Option<&'static str> {
        self.remote_maps
            .iter()
            .find(|m| m.family == family && m.zone == zone)
            .and_then(|m| m.buttons.iter().find(|(b, _)| *b == button))
            .map(|(_, cmd)| *cmd)
    }
}

/// Look up the capability record for a variant
pub fn get_model(variant: ModelVariant) -> &'static ModelInfo {
    pioneer::MODELS
        .iter()
        .find(|m| m.variant == variant)
        .unwrap_or(&pioneer::MODELS[0])
}

/// Look up a model by its front-panel name (case-insensitive)
pub fn find_by_name(name: &str) -> Option<&'static ModelInfo> {
    pioneer::MODELS
        .iter()
        .find(|m| m.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_variant_has_a_record() {
        for v in [
            ModelVariant::Vsx1021,
            ModelVariant::Vsx1022,
            ModelVariant::Vsx1122,
            ModelVariant::Vsx1123,
            ModelVariant::Sc75,
        ] {
            assert_eq!(get_model(v).variant, v);
        }
    }

    #[test]
    fn test_ports() {
        assert_eq!(ModelVariant::Vsx1021.info().port, 23);
        assert_eq!(ModelVariant::Vsx1022.info().port, 8102);
        assert_eq!(ModelVariant::Sc75.info().port, 8102);
    }

    #[test]
    fn test_source_family() {
        assert_eq!(SourceFamily::of(2), SourceFamily::Tuner);
        assert_eq!(SourceFamily::of(17), SourceFamily::IpodUsb);
        assert_eq!(SourceFamily::of(38), SourceFamily::Network);
        assert_eq!(SourceFamily::of(4), SourceFamily::Other);
    }

    #[test]
    fn test_remote_command() {
        let m = ModelVariant::Vsx1022.info();
        assert_eq!(
            m.remote_command(SourceFamily::Tuner, Zone::Zone1, "up"),
            Some("TPI")
        );
        assert_eq!(
            m.remote_command(SourceFamily::Other, Zone::Zone1, "enter"),
            Some("CEN")
        );
        assert_eq!(m.remote_command(SourceFamily::Other, Zone::Zone2, "enter"), None);
    }

    #[test]
    fn test_sibling_masks_differ() {
        // The 1122 also masks the adapter port; the 1022 does not
        assert!(ModelVariant::Vsx1022.info().supports_source(33));
        assert!(!ModelVariant::Vsx1122.info().supports_source(33));
    }

    #[test]
    fn test_find_by_name() {
        assert_eq!(
            find_by_name("vsx-1123").map(|m| m.variant),
            Some(ModelVariant::Vsx1123)
        );
        assert!(find_by_name("VSX-9000").is_none());
    }

    #[test]
    fn test_variant_deserializes_from_model_name() {
        let v: ModelVariant = serde_json::from_str("\"SC-75\"").unwrap();
        assert_eq!(v, ModelVariant::Sc75);
    }
}
