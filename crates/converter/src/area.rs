use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use crate::config::AppConfig;

/// Extension of converted outputs
pub const OUTPUT_EXTENSION: &str = "webp";

/// The on-disk locations shared by the runner, the gallery and deletion:
/// the output directory and the sidecar directory inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArea {
    output_dir: PathBuf,
    sidecar_dir: PathBuf,
}

impl OutputArea {
    pub fn new(output_dir: impl Into<PathBuf>, sidecar_dir_name: &str) -> Self {
        let output_dir = output_dir.into();
        let sidecar_dir = output_dir.join(sidecar_dir_name);
        OutputArea { output_dir, sidecar_dir }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(cfg.output_dir.clone(), &cfg.sidecar_dir_name)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn sidecar_dir(&self) -> &Path {
        &self.sidecar_dir
    }

    /// Path of the converted file for an output base name
    pub fn output_path(&self, base_name: &str) -> PathBuf {
        self.output_dir.join(format!("{}.{}", base_name, OUTPUT_EXTENSION))
    }

    /// Create both directories if missing. Safe to call repeatedly.
    pub fn ensure(&self) -> io::Result<&Path> {
        fs::create_dir_all(&self.output_dir)?;
        fs::create_dir_all(&self.sidecar_dir)?;
        Ok(&self.output_dir)
    }
}

/// Output base name for a source name: the file name without its last extension
pub fn base_name(source_name: &str) -> Option<String> {
    Path::new(source_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
