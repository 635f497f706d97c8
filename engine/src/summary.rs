//! Run summary and backup log.
//!
//! Aggregates the counters of a finished copy run and renders the
//! human-readable Portuguese log that is persisted next to the backup.
//! The log header, summary labels, and per-file detail lines are a
//! stable format consumed by downstream tooling.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use chrono::Local;
use uuid::Uuid;
use crate::error::EngineError;
use crate::model::{CopyOutcome, CopyStatus, RunSummary};

const SEPARATOR: &str = "========================================";

/// Aggregate the outcomes of a copy run.
///
/// `processed` counts every outcome; `errors` counts SizeMismatch and
/// Failed; the copied count reported to the caller is processed minus
/// errors and therefore includes SkippedIdentical files. `total_bytes`
/// sums successful copies only.
pub fn build_summary(
    outcomes: &[CopyOutcome],
    elapsed: Duration,
    log_destination: Option<PathBuf>,
) -> RunSummary {
    let processed = outcomes.len();
    let errors = outcomes
        .iter()
        .filter(|outcome| outcome.status.is_error())
        .count();
    let total_bytes = outcomes
        .iter()
        .filter(|outcome| outcome.status == CopyStatus::Copied)
        .map(|outcome| outcome.bytes_copied)
        .sum();

    RunSummary {
        run_id: Uuid::new_v4(),
        processed,
        errors,
        copied_count: processed - errors,
        total_bytes,
        elapsed,
        log_destination,
    }
}

/// Human-readable size with the tiering users of the original tool expect:
/// bytes, whole kilobytes, one-decimal megabytes, two-decimal gigabytes.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let kb = bytes as f64 / 1024.0;
    if kb < 1024.0 {
        return format!("{:.0} KB", kb);
    }
    let mb = kb / 1024.0;
    if mb < 1024.0 {
        return format!("{:.1} MB", mb);
    }
    format!("{:.2} GB", mb / 1024.0)
}

/// The labeled summary block shared by the log file and the caller-facing
/// completion message.
pub fn summary_block(summary: &RunSummary) -> String {
    let mut block = String::new();
    let _ = writeln!(block, "RESUMO DO BACKUP");
    let _ = writeln!(block, "{}", SEPARATOR);
    let _ = writeln!(block, "Arquivos copiados: {}", summary.copied_count);
    let _ = writeln!(block, "Erros: {}", summary.errors);
    let _ = writeln!(block, "Tamanho total: {}", format_size(summary.total_bytes));
    let _ = writeln!(block, "Tempo total: {} segundos", summary.elapsed.as_secs());
    let _ = write!(block, "{}", SEPARATOR);
    block
}

/// Persist the backup log.
///
/// The log is written into the summary's log destination (the first plan
/// entry's directory) or `destination` as the fallback root when the plan
/// was empty, named `backup_log_{YYYYMMDD_HHMMSS}.txt`.
///
/// # Errors
/// Returns LogWriteFailed when the file cannot be written. Callers report
/// this as a non-fatal event; it never changes the run's classification.
pub fn write_log(
    summary: &RunSummary,
    source: &Path,
    destination: &Path,
    detail_lines: &[String],
) -> Result<PathBuf, EngineError> {
    let log_dir = summary
        .log_destination
        .as_deref()
        .unwrap_or(destination);
    let now = Local::now();
    let log_path = log_dir.join(format!("backup_log_{}.txt", now.format("%Y%m%d_%H%M%S")));

    let mut content = String::new();
    let _ = writeln!(content, "BACKUP LOG - {}", now.format("%d/%m/%Y %H:%M:%S"));
    let _ = writeln!(content, "Origem: {}", source.display());
    let _ = writeln!(content, "Destino: {}", destination.display());
    let _ = writeln!(content);
    let _ = writeln!(content, "{}", summary_block(summary));
    let _ = writeln!(content);
    let _ = writeln!(content, "{}", SEPARATOR);
    let _ = writeln!(content, "DETALHES");
    let _ = writeln!(content, "{}", SEPARATOR);
    let _ = writeln!(content);
    let _ = writeln!(content, "{}", detail_lines.join("\n"));

    fs::write(&log_path, content).map_err(|e| EngineError::LogWriteFailed {
        path: log_path.clone(),
        source: e,
    })?;
    Ok(log_path)
}
