use std::path::{Path, PathBuf};
use std::time::SystemTime;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use walkdir::WalkDir;
use crate::area::{OutputArea, OUTPUT_EXTENSION};
use crate::error::DeleteError;
use crate::sidecar::SidecarStore;

/// A converted file joined with whatever its sidecar knows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryEntry {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    /// `None` when the sidecar is missing or unreadable
    pub original_size_bytes: Option<u64>,
}

impl GalleryEntry {
    /// Percentage saved relative to the original (negative when the output grew)
    pub fn savings_percent(&self) -> Option<f64> {
        match self.original_size_bytes {
            Some(original) if original > 0 => {
                Some((1.0 - self.size_bytes as f64 / original as f64) * 100.0)
            }
            _ => None,
        }
    }
}

/// Read-only view over the output area, plus deletion of outputs
pub struct Gallery<S> {
    area: OutputArea,
    store: S,
}

impl<S: SidecarStore> Gallery<S> {
    pub fn new(area: OutputArea, store: S) -> Self {
        Gallery { area, store }
    }

    pub fn area(&self) -> &OutputArea {
        &self.area
    }

    /// List converted files, newest first.
    ///
    /// Rebuilt from disk on every call. A missing or unreadable output
    /// directory is an empty gallery.
    pub fn list(&self) -> Vec<GalleryEntry> {
        let dir = self.area.output_dir();
        if !dir.is_dir() {
            debug!("Output directory does not exist: {}", dir.display());
            return Vec::new();
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Error reading output directory: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() || !has_output_extension(path) {
                continue;
            }

            // the file may vanish between listing and stat
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    debug!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            let created = metadata
                .created()
                .or_else(|_| metadata.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);

            let name = entry.file_name().to_string_lossy().to_string();
            let original_size_bytes = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|stem| self.store.read(stem))
                .map(|sidecar| sidecar.original_size_bytes);

            entries.push(GalleryEntry {
                name,
                path: path.to_path_buf(),
                size_bytes: metadata.len(),
                created_at: DateTime::<Utc>::from(created),
                original_size_bytes,
            });
        }

        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        entries
    }

    /// Delete a converted file and, best-effort, its sidecar.
    ///
    /// Only a failure to remove the output itself is reported.
    pub fn delete_output(&self, path: &Path) -> Result<(), DeleteError> {
        std::fs::remove_file(path).map_err(|source| DeleteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Deleted {}", path.display());

        // sidecars only exist for files inside our own output directory
        if !self.is_in_output_dir(path) {
            debug!("{} is outside the output area, keeping sidecars", path.display());
            return Ok(());
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            self.store.delete(stem);
        }
        Ok(())
    }

    fn is_in_output_dir(&self, path: &Path) -> bool {
        let Some(parent) = path.parent() else {
            return false;
        };
        let parent = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };
        let output_dir = self.area.output_dir();
        match (parent.canonicalize(), output_dir.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => parent == output_dir,
        }
    }
}

fn has_output_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(OUTPUT_EXTENSION))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sidecar::{JsonSidecarStore, MetadataSidecar};
    use std::fs;
    use std::thread::sleep;
    use std::time::Duration;

    fn gallery(root: &Path) -> Gallery<JsonSidecarStore> {
        let area = OutputArea::new(root.join("output"), ".metadata");
        area.ensure().unwrap();
        let store = JsonSidecarStore::for_area(&area);
        Gallery::new(area, store)
    }

    fn entry(size: u64, original: Option<u64>) -> GalleryEntry {
        GalleryEntry {
            name: "x.webp".to_string(),
            path: PathBuf::from("x.webp"),
            size_bytes: size,
            created_at: Utc::now(),
            original_size_bytes: original,
        }
    }

    #[test]
    fn test_lists_newest_first_with_partial_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = gallery(dir.path());
        let area = gallery.area().clone();

        for name in ["first", "second", "third"] {
            fs::write(area.output_path(name), name.as_bytes()).unwrap();
            sleep(Duration::from_millis(50));
        }
        fs::write(area.output_dir().join("notes.txt"), b"ignored").unwrap();
        JsonSidecarStore::for_area(&area)
            .write("second", &MetadataSidecar::now("second.png", 9000))
            .unwrap();

        let entries = gallery.list();

        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["third.webp", "second.webp", "first.webp"]);
        let originals: Vec<_> = entries.iter().map(|e| e.original_size_bytes).collect();
        assert_eq!(originals, vec![None, Some(9000), None]);
        assert_eq!(entries[0].size_bytes, 5);
        assert_eq!(entries[0].path, area.output_path("third"));
    }

    #[test]
    fn test_missing_output_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let area = OutputArea::new(dir.path().join("never-created"), ".metadata");
        let gallery = Gallery::new(area.clone(), JsonSidecarStore::for_area(&area));
        assert!(gallery.list().is_empty());
    }

    #[test]
    fn test_corrupt_sidecar_means_unknown_original() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = gallery(dir.path());
        let area = gallery.area().clone();
        fs::write(area.output_path("cat"), b"RIFF").unwrap();
        fs::write(area.sidecar_dir().join("cat.meta.json"), b"not json").unwrap();

        let entries = gallery.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].original_size_bytes, None);
    }

    #[test]
    fn test_delete_removes_output_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = gallery(dir.path());
        let area = gallery.area().clone();
        let store = JsonSidecarStore::for_area(&area);
        fs::write(area.output_path("dog"), b"RIFF").unwrap();
        store.write("dog", &MetadataSidecar::now("dog.jpg", 100)).unwrap();

        gallery.delete_output(&area.output_path("dog")).unwrap();

        assert!(!area.output_path("dog").exists());
        assert!(store.read("dog").is_none());
        assert!(gallery.list().is_empty());
    }

    #[test]
    fn test_delete_without_sidecar_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = gallery(dir.path());
        let area = gallery.area().clone();
        fs::write(area.output_path("lonely"), b"RIFF").unwrap();

        assert!(gallery.delete_output(&area.output_path("lonely")).is_ok());
        assert!(!area.output_path("lonely").exists());
    }

    #[test]
    fn test_delete_outside_output_area_keeps_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = gallery(dir.path());
        let area = gallery.area().clone();
        fs::write(area.output_path("photo"), b"RIFF").unwrap();
        JsonSidecarStore::for_area(&area)
            .write("photo", &MetadataSidecar::now("photo.png", 204800))
            .unwrap();

        let downloads = dir.path().join("downloads");
        fs::create_dir(&downloads).unwrap();
        let foreign = downloads.join("photo.webp");
        fs::write(&foreign, b"RIFF").unwrap();

        gallery.delete_output(&foreign).unwrap();

        assert!(!foreign.exists());
        let entries = gallery.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].original_size_bytes, Some(204800));
    }

    #[test]
    fn test_delete_through_equivalent_path_removes_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = gallery(dir.path());
        let area = gallery.area().clone();
        let store = JsonSidecarStore::for_area(&area);
        fs::write(area.output_path("cat"), b"RIFF").unwrap();
        store.write("cat", &MetadataSidecar::now("cat.png", 10)).unwrap();

        let roundabout = area.output_dir().join(".metadata/../cat.webp");
        gallery.delete_output(&roundabout).unwrap();

        assert!(store.read("cat").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_lists_symlinked_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = gallery(dir.path());
        let area = gallery.area().clone();
        let target = dir.path().join("elsewhere.webp");
        fs::write(&target, b"RIFFdata").unwrap();
        std::os::unix::fs::symlink(&target, area.output_path("linked")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("missing.webp"), area.output_path("broken")).unwrap();

        let entries = gallery.list();

        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["linked.webp"]);
        assert_eq!(entries[0].size_bytes, 8);
    }

    #[test]
    fn test_delete_missing_output_fails() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = gallery(dir.path());
        let missing = gallery.area().output_path("ghost");

        let err = gallery.delete_output(&missing).unwrap_err();
        assert!(err.to_string().contains("ghost.webp"));
    }

    #[test]
    fn test_savings_percent() {
        let saved = entry(250, Some(1000)).savings_percent().unwrap();
        assert!((saved - 75.0).abs() < 1e-9);

        let grew = entry(1500, Some(1000)).savings_percent().unwrap();
        assert!((grew + 50.0).abs() < 1e-9);

        assert_eq!(entry(10, None).savings_percent(), None);
        assert_eq!(entry(10, Some(0)).savings_percent(), None);
    }
}
