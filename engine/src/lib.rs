//! # CardBackup Engine - Media Backup Library
//!
//! A headless backup engine for removable media volumes (camera cards) in
//! Rust. Designed as the foundation for multiple UIs (CLI, GUI, automation).
//!
//! ## Overview
//!
//! The engine discovers media files on a source volume, groups them by
//! capture date, and copies the confirmed date buckets into a structured
//! destination tree with optional renaming and size verification.
//! It features:
//! - Recursive scanning with camera-card exclusion rules
//! - Classification into photo/video/metadata by extension tables
//! - Date bucketing with preview exemplars and capacity estimates
//! - Deterministic per-bucket rename planning
//! - Per-file error isolation (a failure never aborts the run)
//! - Progress reporting via callbacks and a pollable event channel
//! - A persisted, parseable backup log
//!
//! ## Basic Usage
//!
//! ```no_run
//! use engine::{analyze, default_destination, run_backup, BackupPlanEntry, RenameRule};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Analyse the card
//! let analysis = analyze(Path::new("/media/card"), true)?;
//! println!("Found {} files", analysis.total_files());
//!
//! // Confirm every date bucket with default destinations, no renaming
//! let plan: Vec<BackupPlanEntry> = analysis
//!     .buckets
//!     .values()
//!     .map(|bucket| {
//!         BackupPlanEntry::for_bucket(
//!             bucket,
//!             default_destination(Path::new("/backup"), &bucket.date_key),
//!             RenameRule::default(),
//!         )
//!     })
//!     .collect();
//!
//! // Run the backup
//! let run = run_backup(&plan, None)?;
//! println!("{} files, {} errors", run.summary.processed, run.summary.errors);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **model**: Core data structures (FileRecord, DateBucket, RunSummary, enums)
//! - **error**: Error types and handling
//! - **classify**: Extension tables and category assignment
//! - **scanner**: Source-volume traversal and exclusion rules
//! - **grouper**: Date bucketing and preview selection
//! - **rename**: Example and final destination names
//! - **fs_ops**: Low-level filesystem operations
//! - **job**: Run orchestration (analyze, plan, run)
//! - **summary**: Aggregate counters and the backup log
//! - **progress**: Progress callback trait
//! - **worker**: Background threads and the pollable event stream

pub mod model;
pub mod error;
pub mod classify;
pub mod scanner;
pub mod grouper;
pub mod rename;
pub mod fs_ops;
pub mod job;
pub mod summary;
pub mod progress;
pub mod worker;

// Re-export main types and functions
pub use model::{
    AnalysisResult, BackupPlanEntry, Category, CopyOutcome, CopyStatus, DateBucket, FileRecord,
    Preview, RenameRule, RunSummary,
};
pub use error::EngineError;
pub use classify::classify;
pub use scanner::{scan, ScanOutcome};
pub use grouper::{date_key, format_date_br, group, UNKNOWN_DATE_KEY};
pub use rename::{example_name, final_name};
pub use job::{analyze, default_destination, run_backup, validate_plan, BackupRun};
pub use summary::{build_summary, format_size, summary_block, write_log};
pub use progress::ProgressCallback;
pub use worker::{spawn_analysis, spawn_backup, BackupRequest, Event};
