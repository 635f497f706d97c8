//! Source-volume scanner.
//!
//! Recursively walks the source tree, applies the exclusion rules for
//! camera-card housekeeping directories and OS droppings, classifies every
//! remaining file, and returns the three category lists.
//!
//! The scan is not atomic: a subtree that cannot be read is skipped and the
//! walk continues, so callers must not treat the result as guaranteed-complete.

use std::fs;
use std::path::Path;
use log::{debug, warn};
use uuid::Uuid;
use crate::classify::classify;
use crate::error::EngineError;
use crate::model::{Category, FileRecord};

/// Directories skipped when their path contains one of these literal
/// substrings (thumbnail caches, trash folders, Windows volume metadata).
pub const EXCLUDED_DIR_MARKERS: &[&str] = &[
    "THMBNL",
    ".Trash",
    "System Volume Information",
    "RECYCLER",
    "$RECYCLE.BIN",
];

/// The classified file lists produced by one scan.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub photos: Vec<FileRecord>,
    pub videos: Vec<FileRecord>,
    pub metadata: Vec<FileRecord>,
}

impl ScanOutcome {
    /// All collected records in scan order: photos, then videos, then metadata.
    pub fn all_files(&self) -> Vec<FileRecord> {
        let mut all =
            Vec::with_capacity(self.photos.len() + self.videos.len() + self.metadata.len());
        all.extend_from_slice(&self.photos);
        all.extend_from_slice(&self.videos);
        all.extend_from_slice(&self.metadata);
        all
    }
}

/// True when a file name should never be collected: AppleDouble resource
/// forks, Office lock files, and Finder metadata.
fn is_excluded_file(name: &str) -> bool {
    name.starts_with("._") || name.starts_with("~$") || name == ".DS_Store"
}

/// Scan the source tree and classify every file.
///
/// Metadata sidecars are collected only when `include_metadata` is true;
/// otherwise they are silently dropped. Files outside the three category
/// tables are not collected at all.
///
/// # Errors
/// Returns EngineError only when the root itself is missing or not a
/// directory. Unreadable subtrees below the root are skipped, not fatal.
pub fn scan(root: &Path, include_metadata: bool) -> Result<ScanOutcome, EngineError> {
    match fs::metadata(root) {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(EngineError::InvalidPath {
                    path: root.to_path_buf(),
                    reason: "Source must be a directory".to_string(),
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(EngineError::SourceNotFound {
                path: root.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(EngineError::SourceAccessDenied {
                path: root.to_path_buf(),
                source: e,
            });
        }
    }

    let mut outcome = ScanOutcome::default();
    walk(root, include_metadata, &mut outcome);
    debug!(
        "scan of {} found {} photos, {} videos, {} metadata files",
        root.display(),
        outcome.photos.len(),
        outcome.videos.len(),
        outcome.metadata.len()
    );
    Ok(outcome)
}

fn walk(dir: &Path, include_metadata: bool, outcome: &mut ScanOutcome) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("skipping unreadable directory {}: {}", dir.display(), e);
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry under {}: {}", dir.display(), e);
                continue;
            }
        };
        let path = entry.path();

        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                warn!("skipping {}: {}", path.display(), e);
                continue;
            }
        };

        if file_type.is_dir() {
            let path_str = path.to_string_lossy();
            if EXCLUDED_DIR_MARKERS
                .iter()
                .any(|marker| path_str.contains(marker))
            {
                debug!("excluded directory {}", path.display());
                continue;
            }
            walk(&path, include_metadata, outcome);
            continue;
        }

        let name = entry.file_name();
        let name = name.to_string_lossy();
        if is_excluded_file(&name) {
            continue;
        }

        let category = classify(&name);
        let list = match category {
            Category::Photo => &mut outcome.photos,
            Category::Video => &mut outcome.videos,
            Category::Metadata if include_metadata => &mut outcome.metadata,
            // Metadata with collection disabled, and Other files, are not
            // collected (not even counted).
            _ => continue,
        };

        let (size, modified) = match entry.metadata() {
            Ok(metadata) => (metadata.len(), metadata.modified().ok()),
            Err(e) => {
                warn!("skipping unreadable file {}: {}", path.display(), e);
                continue;
            }
        };

        list.push(FileRecord {
            id: Uuid::new_v4(),
            path,
            size,
            modified,
            category,
        });
    }
}
