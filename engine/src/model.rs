//! Core data model for backup runs.
//!
//! This module defines the main data structures for representing a card backup:
//! - FileRecord: a single media file discovered on the source volume
//! - DateBucket: all files sharing one capture date, plus previews
//! - BackupPlanEntry: one confirmed date bucket ready to be copied
//! - CopyOutcome / CopyStatus: per-file results of a copy run
//! - RunSummary: aggregate counters for a finished run

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The category of a media file, assigned by extension.
///
/// A file belongs to exactly one category; classification checks
/// Photo first, then Video, then Metadata, and falls back to Other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Still images, including camera raw formats
    Photo,
    /// Video clips and container formats
    Video,
    /// Sidecar metadata (XML/XMP)
    Metadata,
    /// Anything not matched by the extension tables
    Other,
}

impl Category {
    /// Destination subfolder name for this category.
    ///
    /// These names are part of the output-layout contract:
    /// `{destination}/{folder_name}/{final_name}`.
    pub fn folder_name(&self) -> &'static str {
        match self {
            Category::Photo => "PHOTOS",
            Category::Video => "VIDEOS",
            Category::Metadata => "METADATA",
            Category::Other => "OUTROS",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.folder_name())
    }
}

/// A single file discovered on the source volume.
///
/// Immutable once scanned; the copy run re-stats paths when it needs
/// fresh sizes, it never mutates the record.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Unique identifier for this record
    pub id: Uuid,

    /// Absolute path on the source volume
    pub path: PathBuf,

    /// Size in bytes at scan time
    pub size: u64,

    /// Modification time; None when the timestamp could not be read
    pub modified: Option<SystemTime>,

    /// Category assigned by extension
    pub category: Category,
}

impl FileRecord {
    /// Base name of the source file, lossily converted for display and logs.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A preview exemplar selected for a date bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    /// A photo to thumbnail (earliest or latest of the day)
    Photo(PathBuf),
    /// A video placeholder (used only when the day has no photos)
    Video(PathBuf),
}

/// All files sharing one derived capture date.
///
/// Built once per scan and read-only thereafter. The file list preserves
/// scan order (photos, then videos, then metadata); the copy run applies
/// its own `(modified, path)` ordering.
#[derive(Debug, Clone)]
pub struct DateBucket {
    /// Calendar day formatted `%Y-%m-%d`, or the `UNKNOWN-DATE` sentinel
    pub date_key: String,

    /// Files captured on this day
    pub files: Vec<FileRecord>,

    /// Aggregate size in bytes, summed over files that still existed
    /// when the bucket was built
    pub total_size: u64,

    /// Up to two preview exemplars (photo first/last, or one video)
    pub previews: Vec<Preview>,
}

impl DateBucket {
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Per-bucket policy controlling whether and how files are renamed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRule {
    /// When false, original base names are preserved unchanged
    pub enabled: bool,

    /// Optional prefix; produces `{prefix}_{num}{ext}` when set
    pub prefix: Option<String>,

    /// Reuse the first digit run of the original name (zero-padded to 4)
    /// instead of the sequential per-bucket counter
    pub keep_original_numbering: bool,
}

/// One confirmed date bucket, ready to be copied.
///
/// Created once per confirmed plan and consumed exactly once by the
/// copy run; not reused.
#[derive(Debug, Clone)]
pub struct BackupPlanEntry {
    /// Date key of the bucket this entry was built from
    pub date_key: String,

    /// Destination directory for this date (category subfolders go under it)
    pub destination: PathBuf,

    /// Rename policy for this bucket
    pub rule: RenameRule,

    /// The files to copy (subset or all of the bucket)
    pub files: Vec<FileRecord>,
}

impl BackupPlanEntry {
    /// Build a plan entry covering every file of a bucket.
    pub fn for_bucket(bucket: &DateBucket, destination: PathBuf, rule: RenameRule) -> Self {
        BackupPlanEntry {
            date_key: bucket.date_key.clone(),
            destination,
            rule,
            files: bucket.files.clone(),
        }
    }
}

/// The result of processing one file during a copy run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CopyStatus {
    /// File copied and the destination size matched the source
    Copied,
    /// Destination already held a same-size file; copy not performed
    SkippedIdentical,
    /// Post-copy size verification failed; counted as an error
    SizeMismatch,
    /// An I/O failure prevented the copy; counted as an error
    Failed(String),
}

impl CopyStatus {
    /// The literal Portuguese status label written to the backup log.
    ///
    /// These four labels are part of the log-format contract and must
    /// not be reworded.
    pub fn label(&self) -> String {
        match self {
            CopyStatus::Copied => "Copiado".to_string(),
            CopyStatus::SkippedIdentical => "Ignorado (idêntico)".to_string(),
            CopyStatus::SizeMismatch => "Erro (tamanho diferente)".to_string(),
            CopyStatus::Failed(message) => format!("Erro: {}", message),
        }
    }

    /// True for SizeMismatch and Failed, the two outcomes counted as errors.
    pub fn is_error(&self) -> bool {
        matches!(self, CopyStatus::SizeMismatch | CopyStatus::Failed(_))
    }
}

impl std::fmt::Display for CopyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Per-file outcome of a copy run, in processing order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyOutcome {
    /// Base name of the source file
    pub source_name: String,

    /// Category the file was filed under
    pub category: Category,

    /// Name the file was given at the destination
    pub new_name: String,

    /// What happened to this file
    pub status: CopyStatus,

    /// Bytes written for this file (0 unless Copied)
    pub bytes_copied: u64,
}

impl CopyOutcome {
    /// One detail line of the backup log:
    /// `{basename} -> {CATEGORY} -> {newName}: {statusLabel}`.
    pub fn detail_line(&self) -> String {
        format!(
            "{} -> {} -> {}: {}",
            self.source_name,
            self.category.folder_name(),
            self.new_name,
            self.status.label()
        )
    }
}

/// Aggregate counters for a finished copy run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique identifier for this run
    pub run_id: Uuid,

    /// All files attempted (every outcome, including skips and errors)
    pub processed: usize,

    /// SizeMismatch + Failed outcomes
    pub errors: usize,

    /// Copied count reported to the caller: processed - errors.
    /// Includes SkippedIdentical files, preserving the original
    /// user-visible semantics.
    pub copied_count: usize,

    /// Bytes written by Copied outcomes only
    pub total_bytes: u64,

    /// Wall time of the run
    pub elapsed: Duration,

    /// Directory the backup log is written into (first plan entry's
    /// destination); None when the plan was empty
    pub log_destination: Option<PathBuf>,
}

/// The result of analysing a source volume: classified file lists plus
/// date buckets.
///
/// This value is returned by [`crate::job::analyze`] and threaded
/// explicitly into planning and the copy run; the engine keeps no
/// analysis state of its own.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Source root that was scanned
    pub source: PathBuf,

    /// Whether metadata sidecars were collected
    pub include_metadata: bool,

    /// All photos found, in scan order
    pub photos: Vec<FileRecord>,

    /// All videos found, in scan order
    pub videos: Vec<FileRecord>,

    /// Metadata sidecars (empty when collection was disabled)
    pub metadata: Vec<FileRecord>,

    /// Files grouped by capture date, keyed ascending
    pub buckets: BTreeMap<String, DateBucket>,
}

impl AnalysisResult {
    pub fn total_files(&self) -> usize {
        self.photos.len() + self.videos.len() + self.metadata.len()
    }

    /// Sum of the scanned sizes of every collected file.
    pub fn total_size(&self) -> u64 {
        self.photos
            .iter()
            .chain(&self.videos)
            .chain(&self.metadata)
            .map(|record| record.size)
            .sum()
    }

    /// Capacity estimate for the caller's disk-space confirmation:
    /// the sum of all bucket sizes.
    pub fn required_bytes(&self) -> u64 {
        self.buckets.values().map(|bucket| bucket.total_size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_files() == 0
    }
}
