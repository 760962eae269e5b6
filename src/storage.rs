//! Persistent label storage.
//!
//! Source, tuner preset and MCACC names are learned from each receiver at
//! runtime. They are kept here so log lines use the right names straight
//! after a restart, before the first gather has finished.
//!
//! Storage path: `~/.local/share/vsxlink/labels/{device-id}.json`

use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use vsxlink_core::DeviceLabels;

use crate::config::{get_project_dirs, ConfigError};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Label storage {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot encode labels for {id:?}: {source}")]
    Encode {
        id: String,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Label files, one per device, with an in-memory cache
pub struct LabelStore {
    base_dir: PathBuf,
    cache: HashMap<String, DeviceLabels>,
}

impl LabelStore {
    /// Store under the platform data directory
    pub fn with_default_dir() -> Result<Self, StorageError> {
        let mut base_dir = get_project_dirs()?.data_dir().to_owned();
        base_dir.push("labels");
        Self::new(base_dir)
    }

    pub fn new(base_dir: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_dir).map_err(|source| StorageError::Io {
            path: base_dir.clone(),
            source,
        })?;
        debug!("Label directory: {}", base_dir.display());
        Ok(Self {
            base_dir,
            cache: HashMap::new(),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn file_path(&self, id: &str) -> PathBuf {
        // Sanitize id for filesystem (replace / with __)
        let safe_id = id.replace('/', "__");
        self.base_dir.join(format!("{}.json", safe_id))
    }

    /// Labels for a device. A missing or unreadable file yields defaults.
    pub fn load(&mut self, id: &str) -> DeviceLabels {
        if let Some(labels) = self.cache.get(id) {
            return labels.clone();
        }

        let path = self.file_path(id);
        if !path.exists() {
            debug!("No stored labels for {}", id);
            return DeviceLabels::default();
        }

        let labels = match fs::File::open(&path) {
            Ok(file) => match serde_json::from_reader(BufReader::new(file)) {
                Ok(labels) => {
                    debug!("Loaded labels for {}", id);
                    labels
                }
                Err(e) => {
                    warn!("Ignoring stored labels {}: {}", path.display(), e);
                    DeviceLabels::default()
                }
            },
            Err(e) => {
                warn!("Failed to open {}: {}", path.display(), e);
                DeviceLabels::default()
            }
        };
        self.cache.insert(id.to_string(), labels.clone());
        labels
    }

    /// Write a device's labels, skipping the write when nothing changed
    pub fn save(&mut self, id: &str, labels: &DeviceLabels) -> Result<(), StorageError> {
        if self.cache.get(id) == Some(labels) {
            return Ok(());
        }

        let path = self.file_path(id);
        let io_err = |source| StorageError::Io {
            path: path.clone(),
            source,
        };
        let file = fs::File::create(&path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, labels).map_err(|source| {
            StorageError::Encode {
                id: id.to_string(),
                source,
            }
        })?;
        writer.write_all(b"\n").map_err(io_err)?;
        writer.flush().map_err(io_err)?;

        info!("Stored labels for {} -> {}", id, path.display());
        self.cache.insert(id.to_string(), labels.clone());
        Ok(())
    }
}
