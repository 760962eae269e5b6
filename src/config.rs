//! Bridge configuration
//!
//! A single JSON file lists the receivers to control. When no path is given
//! on the command line it is read from the platform configuration directory,
//! e.g. `~/.config/vsxlink/config.json` on Linux.
//!
//! ```json
//! {
//!   "tickMs": 100,
//!   "devices": [
//!     {
//!       "id": "den",
//!       "name": "Den",
//!       "host": "192.168.1.40",
//!       "model": "VSX-1022",
//!       "mirrors": [{ "id": "patio-level", "zone": "zone2" }]
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vsxlink_core::state::Zone;
use vsxlink_core::ModelVariant;

pub const DEFAULT_TICK_MS: u64 = 100;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Device {id:?}: {message}")]
    Device { id: String, message: String },

    #[error("No home directory to keep configuration and labels in")]
    NoProjectDirs,
}

pub fn get_project_dirs() -> Result<ProjectDirs, ConfigError> {
    ProjectDirs::from("org", "vsxlink", "vsxlink").ok_or(ConfigError::NoProjectDirs)
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(get_project_dirs()?.config_dir().join("config.json"))
}

/// A virtual level controller following one zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorConfig {
    pub id: String,
    pub zone: Zone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    pub id: String,
    /// Name used in log lines; defaults to the id
    #[serde(default)]
    pub name: Option<String>,
    pub host: Ipv4Addr,
    /// Overrides the model's default port
    #[serde(default)]
    pub port: Option<u16>,
    pub model: ModelVariant,
    #[serde(default)]
    pub mirrors: Vec<MirrorConfig>,
}

impl DeviceConfig {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.host, self.port.unwrap_or(self.model.info().port))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

fn default_tick_ms() -> u64 {
    DEFAULT_TICK_MS
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tick_ms: DEFAULT_TICK_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            devices: Vec::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let config: Config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Device and mirror ids must be unique and non-empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut ids = HashSet::new();
        let mut mirrors = HashSet::new();
        for device in &self.devices {
            let fail = |message: String| ConfigError::Device {
                id: device.id.clone(),
                message,
            };
            if device.id.trim().is_empty() {
                return Err(fail("id must not be empty".into()));
            }
            if !ids.insert(device.id.as_str()) {
                return Err(fail("id is used twice".into()));
            }
            if device.port == Some(0) {
                return Err(fail("port must not be 0".into()));
            }
            for mirror in &device.mirrors {
                if mirror.id.trim().is_empty() {
                    return Err(fail("mirror id must not be empty".into()));
                }
                if !mirrors.insert(mirror.id.as_str()) {
                    return Err(fail(format!("mirror {:?} is used twice", mirror.id)));
                }
            }
        }
        Ok(())
    }
}
