use std::fs;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use crate::area::OutputArea;
use crate::error::SidecarError;

/// Metadata kept next to a converted file that the file itself can't tell us
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataSidecar {
    pub original_name: String,
    #[serde(rename = "originalSize")]
    pub original_size_bytes: u64,
    pub converted_at: DateTime<Utc>,
}

impl MetadataSidecar {
    /// Sidecar stamped with the current time
    pub fn now(original_name: impl Into<String>, original_size_bytes: u64) -> Self {
        MetadataSidecar {
            original_name: original_name.into(),
            original_size_bytes,
            converted_at: Utc::now(),
        }
    }
}

/// Key-value store of sidecars, keyed by output base name
pub trait SidecarStore {
    /// Persist a sidecar, replacing any existing one
    fn write(&self, base_name: &str, sidecar: &MetadataSidecar) -> Result<(), SidecarError>;

    /// Missing and unparseable sidecars both read as `None`
    fn read(&self, base_name: &str) -> Option<MetadataSidecar>;

    /// Best-effort removal; never fails
    fn delete(&self, base_name: &str);
}

/// Sidecars as `<base>.meta.json` files in one directory
#[derive(Debug, Clone)]
pub struct JsonSidecarStore {
    dir: PathBuf,
}

impl JsonSidecarStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonSidecarStore { dir: dir.into() }
    }

    pub fn for_area(area: &OutputArea) -> Self {
        Self::new(area.sidecar_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the path to the sidecar file for an output base name
    pub fn sidecar_path(&self, base_name: &str) -> PathBuf {
        self.dir.join(format!("{}.meta.json", base_name))
    }
}

impl SidecarStore for JsonSidecarStore {
    fn write(&self, base_name: &str, sidecar: &MetadataSidecar) -> Result<(), SidecarError> {
        let path = self.sidecar_path(base_name);
        let json = serde_json::to_string(sidecar)?;
        fs::create_dir_all(&self.dir)
            .and_then(|_| fs::write(&path, json))
            .map_err(|source| SidecarError::Io { path, source })
    }

    fn read(&self, base_name: &str) -> Option<MetadataSidecar> {
        let path = self.sidecar_path(base_name);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                debug!("No sidecar for {}: {}", base_name, e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(sidecar) => Some(sidecar),
            Err(e) => {
                warn!("Ignoring unreadable sidecar {}: {}", path.display(), e);
                None
            }
        }
    }

    fn delete(&self, base_name: &str) {
        let path = self.sidecar_path(base_name);
        match fs::remove_file(&path) {
            Ok(()) => debug!("Deleted sidecar: {}", path.display()),
            Err(e) => debug!("No sidecar deleted for {}: {}", base_name, e),
        }
    }
}
