//! Run orchestration module.
//!
//! This module provides the backup lifecycle functions:
//! - Analysing a source volume (scan + date grouping)
//! - Building and validating a backup plan
//! - Executing the copy run
//!
//! A run never aborts on a per-file failure: every outcome is recorded and
//! processing continues with the next file. Only plan validation can reject
//! a run, and it does so before anything is written.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;
use log::{debug, warn};
use crate::error::EngineError;
use crate::fs_ops;
use crate::grouper;
use crate::model::{AnalysisResult, BackupPlanEntry, CopyOutcome, CopyStatus, FileRecord, RunSummary};
use crate::progress::ProgressCallback;
use crate::rename;
use crate::scanner;
use crate::summary;

/// The full result of a copy run: aggregate summary plus the per-file
/// outcomes in processing order.
#[derive(Debug)]
pub struct BackupRun {
    pub summary: RunSummary,
    pub outcomes: Vec<CopyOutcome>,
}

impl BackupRun {
    /// Log detail lines, one per outcome, in processing order.
    pub fn detail_lines(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .map(CopyOutcome::detail_line)
            .collect()
    }
}

/// Analyse a source volume: scan, classify, and group by capture date.
///
/// Returns the explicit analysis value that planning and the copy run
/// consume; the engine holds no state between calls.
///
/// # Errors
/// Returns EngineError if the source root is missing or unreadable.
pub fn analyze(source: &Path, include_metadata: bool) -> Result<AnalysisResult, EngineError> {
    let outcome = scanner::scan(source, include_metadata)?;
    let buckets = grouper::group(&outcome.all_files());
    Ok(AnalysisResult {
        source: source.to_path_buf(),
        include_metadata,
        photos: outcome.photos,
        videos: outcome.videos,
        metadata: outcome.metadata,
        buckets,
    })
}

/// Default destination directory for a date bucket: `{root}/{date_key}`.
pub fn default_destination(destination_root: &Path, date_key: &str) -> PathBuf {
    destination_root.join(date_key)
}

/// Validate a plan before the run starts.
///
/// Fail fast: a selected bucket with an empty destination path rejects the
/// whole plan and nothing is written.
pub fn validate_plan(plan: &[BackupPlanEntry]) -> Result<(), EngineError> {
    for entry in plan {
        if entry.destination.as_os_str().is_empty() {
            return Err(EngineError::EmptyDestination {
                date_key: entry.date_key.clone(),
            });
        }
    }
    Ok(())
}

/// Execute a backup plan.
///
/// Buckets are processed in ascending date-key order and, within a bucket,
/// files are sorted by `(modification time, path)`; this ordering is the
/// deterministic contract for numbering and log output. Progress is
/// reported synchronously after every file and the percentage is
/// monotonically non-decreasing.
///
/// # Errors
/// Returns EngineError only when plan validation fails. Per-file failures
/// are recorded as outcomes and never abort the run.
pub fn run_backup(
    plan: &[BackupPlanEntry],
    progress_callback: Option<&dyn ProgressCallback>,
) -> Result<BackupRun, EngineError> {
    validate_plan(plan)?;

    let start = Instant::now();
    let total_files: usize = plan.iter().map(|entry| entry.files.len()).sum();

    // A zero-file plan short-circuits to a trivially successful summary.
    if total_files == 0 {
        let summary = summary::build_summary(&[], start.elapsed(), None);
        if let Some(callback) = progress_callback {
            callback.on_run_completed(&summary);
        }
        return Ok(BackupRun {
            summary,
            outcomes: Vec::new(),
        });
    }

    let mut ordered: Vec<&BackupPlanEntry> = plan.iter().collect();
    ordered.sort_by(|a, b| a.date_key.cmp(&b.date_key));
    let log_destination = ordered.first().map(|entry| entry.destination.clone());

    if let Some(callback) = progress_callback {
        callback.on_run_started(total_files);
    }

    // Numbering state is an explicit map keyed by date, inserted on first
    // use; it persists across all categories within a bucket for the
    // duration of the run.
    let mut counters: HashMap<String, u32> = HashMap::new();
    let mut created_dirs: HashSet<PathBuf> = HashSet::new();
    let mut outcomes: Vec<CopyOutcome> = Vec::with_capacity(total_files);
    let mut processed: usize = 0;

    for entry in ordered {
        let mut files = entry.files.clone();
        files.sort_by(|a, b| (a.modified, a.path.as_path()).cmp(&(b.modified, b.path.as_path())));

        if let Some(callback) = progress_callback {
            callback.on_bucket_started(
                percent_of(processed, total_files),
                &entry.date_key,
                files.len(),
            );
        }
        debug!(
            "starting bucket {} with {} files",
            entry.date_key,
            files.len()
        );

        let counter = counters.entry(entry.date_key.clone()).or_insert(1);
        for record in &files {
            let source_name = record.file_name();
            let new_name = rename::final_name(&source_name, &entry.rule, *counter);
            let (status, bytes_copied) =
                copy_one(record, &entry.destination, &new_name, &mut created_dirs);

            // The counter advances once per attempted file, whatever the
            // outcome.
            *counter += 1;
            processed += 1;

            if let Some(callback) = progress_callback {
                callback.on_file_completed(
                    percent_of(processed, total_files),
                    &format!("Copiando: {}", source_name),
                    &format!("{} -> {}", status.label(), new_name),
                );
            }

            outcomes.push(CopyOutcome {
                source_name,
                category: record.category,
                new_name,
                status,
                bytes_copied,
            });
        }
    }

    let summary = summary::build_summary(&outcomes, start.elapsed(), log_destination);
    if let Some(callback) = progress_callback {
        callback.on_run_completed(&summary);
    }

    Ok(BackupRun { summary, outcomes })
}

fn percent_of(processed: usize, total: usize) -> f32 {
    (processed as f32 / total as f32) * 100.0
}

/// Process one file, mapping any failure into a per-file outcome.
fn copy_one(
    record: &FileRecord,
    destination: &Path,
    new_name: &str,
    created_dirs: &mut HashSet<PathBuf>,
) -> (CopyStatus, u64) {
    match try_copy(record, destination, new_name, created_dirs) {
        Ok(result) => result,
        Err(e) => {
            warn!("failed to back up {}: {}", record.path.display(), e);
            (CopyStatus::Failed(e.to_string()), 0)
        }
    }
}

fn try_copy(
    record: &FileRecord,
    destination: &Path,
    new_name: &str,
    created_dirs: &mut HashSet<PathBuf>,
) -> Result<(CopyStatus, u64), EngineError> {
    let subfolder = destination.join(record.category.folder_name());
    if !created_dirs.contains(&subfolder) {
        fs_ops::ensure_dir_exists(&subfolder)?;
        created_dirs.insert(subfolder.clone());
    }

    let source_size = fs_ops::file_size(&record.path).map_err(|e| EngineError::ReadError {
        path: record.path.clone(),
        source: e,
    })?;

    let target = subfolder.join(new_name);
    if let Ok(existing_size) = fs_ops::file_size(&target) {
        if existing_size == source_size {
            return Ok((CopyStatus::SkippedIdentical, 0));
        }
    }

    fs_ops::copy_file_with_mtime(&record.path, &target)?;

    let copied_size = fs_ops::file_size(&target).map_err(|e| EngineError::ReadError {
        path: target.clone(),
        source: e,
    })?;
    Ok(verify_size(source_size, copied_size))
}

/// Post-copy verification: size equality is the sole integrity check.
fn verify_size(source_size: u64, copied_size: u64) -> (CopyStatus, u64) {
    if copied_size == source_size {
        (CopyStatus::Copied, copied_size)
    } else {
        (CopyStatus::SizeMismatch, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use std::time::{Duration, SystemTime};
    use crate::model::RenameRule;

    fn write_with_mtime(path: &Path, contents: &[u8], mtime: SystemTime) {
        fs::write(path, contents).expect("Failed to write file");
        filetime::set_file_mtime(path, filetime::FileTime::from_system_time(mtime))
            .expect("Failed to set mtime");
    }

    /// Source tree from the reference scenario: two photos (100 B, 200 B)
    /// on one day and a video (300 B) on the next, metadata disabled.
    fn reference_source(root: &Path) -> (SystemTime, SystemTime) {
        let day1 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_704_110_400);
        let day2 = day1 + Duration::from_secs(86_400);
        write_with_mtime(&root.join("DSC00001.JPG"), &[0u8; 100], day1);
        write_with_mtime(&root.join("DSC00002.JPG"), &[0u8; 200], day1);
        write_with_mtime(&root.join("C0001.MP4"), &[0u8; 300], day2);
        (day1, day2)
    }

    fn plan_all(analysis: &AnalysisResult, dest_root: &Path, rule: RenameRule) -> Vec<BackupPlanEntry> {
        analysis
            .buckets
            .values()
            .map(|bucket| {
                BackupPlanEntry::for_bucket(
                    bucket,
                    default_destination(dest_root, &bucket.date_key),
                    rule.clone(),
                )
            })
            .collect()
    }

    #[test]
    fn test_analyze_reference_scenario() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("card");
        fs::create_dir(&src).expect("Failed to create src dir");
        reference_source(&src);

        let analysis = analyze(&src, false).expect("Failed to analyze");
        assert_eq!(analysis.photos.len(), 2);
        assert_eq!(analysis.videos.len(), 1);
        assert!(analysis.metadata.is_empty());
        assert_eq!(analysis.buckets.len(), 2);
        assert_eq!(analysis.total_size(), 600);
        assert_eq!(analysis.required_bytes(), 600);
    }

    #[test]
    fn test_end_to_end_backup() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("card");
        let dst = temp_dir.path().join("backup");
        fs::create_dir(&src).expect("Failed to create src dir");
        fs::create_dir(&dst).expect("Failed to create dst dir");
        reference_source(&src);

        let analysis = analyze(&src, false).expect("Failed to analyze");
        let plan = plan_all(&analysis, &dst, RenameRule::default());
        let run = run_backup(&plan, None).expect("Failed to run backup");

        assert_eq!(run.summary.processed, 3);
        assert_eq!(run.summary.errors, 0);
        assert_eq!(run.summary.copied_count, 3);
        assert_eq!(run.summary.total_bytes, 600);

        let keys: Vec<&String> = analysis.buckets.keys().collect();
        assert!(dst.join(keys[0]).join("PHOTOS").join("DSC00001.JPG").is_file());
        assert!(dst.join(keys[0]).join("PHOTOS").join("DSC00002.JPG").is_file());
        assert!(dst.join(keys[1]).join("VIDEOS").join("C0001.MP4").is_file());
    }

    #[test]
    fn test_second_run_skips_everything() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("card");
        let dst = temp_dir.path().join("backup");
        fs::create_dir(&src).expect("Failed to create src dir");
        fs::create_dir(&dst).expect("Failed to create dst dir");
        reference_source(&src);

        let analysis = analyze(&src, false).expect("Failed to analyze");
        let plan = plan_all(&analysis, &dst, RenameRule::default());
        run_backup(&plan, None).expect("Failed first run");

        let second = run_backup(&plan, None).expect("Failed second run");
        assert_eq!(second.summary.processed, 3);
        assert_eq!(second.summary.errors, 0);
        assert_eq!(second.summary.total_bytes, 0);
        assert!(second
            .outcomes
            .iter()
            .all(|o| o.status == CopyStatus::SkippedIdentical));
        // The reported copied count still includes skips.
        assert_eq!(second.summary.copied_count, 3);
    }

    #[test]
    fn test_size_mismatch_classification() {
        assert_eq!(verify_size(100, 100), (CopyStatus::Copied, 100));
        assert_eq!(verify_size(100, 60), (CopyStatus::SizeMismatch, 0));
    }

    #[test]
    fn test_changed_destination_is_recopied() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("card");
        let dst = temp_dir.path().join("backup");
        fs::create_dir(&src).expect("Failed to create src dir");
        fs::create_dir(&dst).expect("Failed to create dst dir");
        reference_source(&src);

        let analysis = analyze(&src, false).expect("Failed to analyze");
        let plan = plan_all(&analysis, &dst, RenameRule::default());
        run_backup(&plan, None).expect("Failed first run");

        // Truncate one destination file; the skip check no longer matches
        // and the file is copied again.
        let keys: Vec<&String> = analysis.buckets.keys().collect();
        let target = dst.join(keys[0]).join("PHOTOS").join("DSC00001.JPG");
        fs::write(&target, b"stub").expect("Failed to truncate");

        let second = run_backup(&plan, None).expect("Failed second run");
        assert_eq!(second.summary.errors, 0);
        assert_eq!(second.summary.total_bytes, 100);
        assert_eq!(
            fs::metadata(&target).expect("Failed to stat").len(),
            100
        );
    }

    #[test]
    fn test_file_failure_does_not_abort_run() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("card");
        let dst = temp_dir.path().join("backup");
        fs::create_dir(&src).expect("Failed to create src dir");
        fs::create_dir(&dst).expect("Failed to create dst dir");
        reference_source(&src);

        let analysis = analyze(&src, false).expect("Failed to analyze");
        let plan = plan_all(&analysis, &dst, RenameRule::default());

        // Block the first bucket's PHOTOS subfolder with a plain file so
        // directory creation fails for both photos.
        let keys: Vec<&String> = analysis.buckets.keys().collect();
        fs::create_dir(dst.join(keys[0])).expect("Failed to create date dir");
        fs::write(dst.join(keys[0]).join("PHOTOS"), b"blocker").expect("Failed to write blocker");

        let run = run_backup(&plan, None).expect("Failed to run backup");
        assert_eq!(run.summary.processed, 3);
        assert_eq!(run.summary.errors, 2);
        assert_eq!(run.summary.copied_count, 1);
        assert_eq!(run.summary.total_bytes, 300);
        assert!(matches!(run.outcomes[0].status, CopyStatus::Failed(_)));
        assert!(matches!(run.outcomes[1].status, CopyStatus::Failed(_)));
        assert_eq!(run.outcomes[2].status, CopyStatus::Copied);
    }

    #[test]
    fn test_empty_plan_short_circuits() {
        let run = run_backup(&[], None).expect("Failed to run empty plan");
        assert_eq!(run.summary.processed, 0);
        assert_eq!(run.summary.errors, 0);
        assert_eq!(run.summary.copied_count, 0);
        assert_eq!(run.summary.total_bytes, 0);
        assert!(run.summary.log_destination.is_none());
        assert!(run.outcomes.is_empty());
    }

    #[test]
    fn test_validate_plan_rejects_empty_destination() {
        let entry = BackupPlanEntry {
            date_key: "2024-01-01".to_string(),
            destination: PathBuf::new(),
            rule: RenameRule::default(),
            files: Vec::new(),
        };
        let result = run_backup(&[entry], None);
        assert!(matches!(
            result,
            Err(EngineError::EmptyDestination { .. })
        ));
    }

    #[test]
    fn test_numbering_is_shared_across_categories() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("card");
        let dst = temp_dir.path().join("backup");
        fs::create_dir(&src).expect("Failed to create src dir");
        fs::create_dir(&dst).expect("Failed to create dst dir");

        // Same day, no digit runs, distinct mtimes to pin the ordering.
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_704_110_400);
        write_with_mtime(&src.join("sunrise.JPG"), &[0u8; 10], base);
        write_with_mtime(&src.join("sunset.MOV"), &[0u8; 20], base + Duration::from_secs(60));

        let analysis = analyze(&src, false).expect("Failed to analyze");
        let rule = RenameRule {
            enabled: true,
            prefix: Some("dia".to_string()),
            keep_original_numbering: false,
        };
        let plan = plan_all(&analysis, &dst, rule);
        let run = run_backup(&plan, None).expect("Failed to run backup");

        let names: Vec<&str> = run.outcomes.iter().map(|o| o.new_name.as_str()).collect();
        assert_eq!(names, vec!["dia_0001.jpg", "dia_0002.mov"]);
    }

    #[test]
    fn test_buckets_run_in_ascending_date_order() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("card");
        let dst = temp_dir.path().join("backup");
        fs::create_dir(&src).expect("Failed to create src dir");
        fs::create_dir(&dst).expect("Failed to create dst dir");
        reference_source(&src);

        let analysis = analyze(&src, false).expect("Failed to analyze");
        // Hand the plan over in reverse order; the run must sort it.
        let mut plan = plan_all(&analysis, &dst, RenameRule::default());
        plan.reverse();

        let run = run_backup(&plan, None).expect("Failed to run backup");
        let categories: Vec<&str> = run
            .outcomes
            .iter()
            .map(|o| o.category.folder_name())
            .collect();
        assert_eq!(categories, vec!["PHOTOS", "PHOTOS", "VIDEOS"]);
    }

    // Test helper: records callback invocations for order and monotonicity
    // assertions.
    struct RecordingCallback {
        percents: Mutex<Vec<f32>>,
        events: Mutex<Vec<String>>,
    }

    impl RecordingCallback {
        fn new() -> Self {
            RecordingCallback {
                percents: Mutex::new(Vec::new()),
                events: Mutex::new(Vec::new()),
            }
        }
    }

    impl ProgressCallback for RecordingCallback {
        fn on_run_started(&self, total_files: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("started({})", total_files));
        }

        fn on_bucket_started(&self, _percent: f32, date_key: &str, _file_count: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("bucket({})", date_key));
        }

        fn on_file_completed(&self, percent: f32, _current_file: &str, status_line: &str) {
            self.percents.lock().unwrap().push(percent);
            self.events
                .lock()
                .unwrap()
                .push(format!("file({})", status_line));
        }

        fn on_run_completed(&self, _summary: &RunSummary) {
            self.events.lock().unwrap().push("completed".to_string());
        }
    }

    #[test]
    fn test_progress_is_monotonic_and_complete() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("card");
        let dst = temp_dir.path().join("backup");
        fs::create_dir(&src).expect("Failed to create src dir");
        fs::create_dir(&dst).expect("Failed to create dst dir");
        reference_source(&src);

        let analysis = analyze(&src, false).expect("Failed to analyze");
        let plan = plan_all(&analysis, &dst, RenameRule::default());

        let callback = RecordingCallback::new();
        run_backup(&plan, Some(&callback)).expect("Failed to run backup");

        let percents = callback.percents.lock().unwrap().clone();
        assert_eq!(percents.len(), 3);
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*percents.last().unwrap(), 100.0);

        let events = callback.events.lock().unwrap().clone();
        assert_eq!(events.first().map(String::as_str), Some("started(3)"));
        assert_eq!(events.last().map(String::as_str), Some("completed"));
    }
}
