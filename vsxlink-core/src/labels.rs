//! User-visible labels learned from the receiver
//!
//! Source names (`RGB`), tuner preset names (`TQ`) and MCACC memory names
//! (`MCM`) are renamed on the receiver itself, so they are discovered at
//! runtime and persisted by the host. Every accessor falls back to a
//! defined default when nothing has been learned yet.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::protocol::tables;

/// A label the decoder discovered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LabelUpdate {
    Source { code: u8, name: String },
    Preset { id: String, name: String },
    Mcacc { memory: u8, name: String },
}

/// Per-device label store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceLabels {
    source_names: BTreeMap<u8, String>,
    preset_names: BTreeMap<String, String>,
    mcacc_names: BTreeMap<u8, String>,
}

impl DeviceLabels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of an input source, falling back to the factory name
    pub fn source_name(&self, code: u8) -> String {
        if let Some(name) = self.source_names.get(&code) {
            return name.clone();
        }
        tables::source_name(code)
            .map(str::to_string)
            .unwrap_or_else(|| format!("SOURCE {:02}", code))
    }

    /// Whether the receiver has reported a name for this source
    pub fn has_source_name(&self, code: u8) -> bool {
        self.source_names.contains_key(&code)
    }

    /// Name of a tuner preset (`A01`..`G09`), falling back to the id
    pub fn preset_name(&self, id: &str) -> String {
        self.preset_names
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    /// Name of an MCACC memory, falling back to `MEMORY n`
    pub fn mcacc_name(&self, memory: u8) -> String {
        self.mcacc_names
            .get(&memory)
            .cloned()
            .unwrap_or_else(|| format!("MEMORY {}", memory))
    }

    /// Store a label, returning true if it changed
    pub fn apply(&mut self, update: &LabelUpdate) -> bool {
        match update {
            LabelUpdate::Source { code, name } => {
                Self::set(&mut self.source_names, *code, name)
            }
            LabelUpdate::Preset { id, name } => Self::set(&mut self.preset_names, id.clone(), name),
            LabelUpdate::Mcacc { memory, name } => {
                Self::set(&mut self.mcacc_names, *memory, name)
            }
        }
    }

    fn set<K: Ord>(map: &mut BTreeMap<K, String>, key: K, name: &str) -> bool {
        match map.get(&key) {
            Some(old) if old == name => false,
            _ => {
                map.insert(key, name.to_string());
                true
            }
        }
    }
}
