use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use log::{debug, info, warn};
use crate::job::ConversionInput;

/// Raster extensions picked up when a directory is submitted
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "tif", "tiff", "webp", "bmp"];

/// Check a path's extension against [`IMAGE_EXTENSIONS`], ignoring case
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Turn submitted paths into batch inputs.
///
/// Directories expand to the image files inside them, sorted by name
/// (descending into subdirectories only when `recursive`). Any other path
/// is passed through untouched, so unreadable ones surface as failed
/// results instead of disappearing.
pub fn collect_inputs(paths: &[PathBuf], recursive: bool) -> Vec<ConversionInput> {
    let mut inputs = Vec::new();

    for path in paths {
        if !path.is_dir() {
            inputs.push(ConversionInput::from_path(path));
            continue;
        }

        info!("Scanning directory: {}", path.display());
        let mut walker = WalkDir::new(path).min_depth(1).follow_links(false).sort_by_file_name();
        if !recursive {
            walker = walker.max_depth(1);
        }

        let mut found = 0;
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Error reading directory entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !is_image_path(entry.path()) {
                continue;
            }

            debug!("Found image: {}", entry.path().display());
            inputs.push(ConversionInput::from_path(entry.path()));
            found += 1;
        }

        info!("Found {} image(s) in {}", found, path.display());
    }

    inputs
}
