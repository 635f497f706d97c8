//! Progress reporting trait.
//!
//! This module defines the ProgressCallback trait, which allows decoupling
//! the backup engine from any specific UI technology (CLI, GUI, etc.).
//!
//! All methods are called synchronously from the copy run, in processing
//! order; the reported percentage is monotonically non-decreasing.

use crate::model::RunSummary;

/// Trait for receiving progress updates from a copy run.
///
/// Implement this trait to receive callbacks during run execution.
/// The worker module provides a channel-backed implementation; the CLI
/// consumes its events.
pub trait ProgressCallback: Send {
    /// Called once before the first file is processed.
    fn on_run_started(&self, total_files: usize);

    /// Called when a date bucket is about to be processed.
    ///
    /// `percent` reflects files processed so far across the whole plan.
    fn on_bucket_started(&self, percent: f32, date_key: &str, file_count: usize);

    /// Called after each file is processed (copied, skipped, or failed).
    ///
    /// `current_file` labels the file just handled; `status_line` is the
    /// log-formatted outcome for display.
    fn on_file_completed(&self, percent: f32, current_file: &str, status_line: &str);

    /// Called when the run is complete (all files processed).
    fn on_run_completed(&self, summary: &RunSummary);
}
