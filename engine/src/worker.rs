//! Background workers and the caller-facing event stream.
//!
//! Scanning and copying each execute on a single dedicated thread; the
//! caller polls the channel receiver on a fixed interval and drains all
//! pending events (at-least-once delivery, in emission order). Only one
//! backup run may be active at a time: a run-in-progress flag rejects
//! concurrent start requests. There is no cancellation once a run starts.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use crossbeam_channel::Sender;
use log::debug;
use crate::error::EngineError;
use crate::grouper::format_date_br;
use crate::job;
use crate::model::{AnalysisResult, BackupPlanEntry, RunSummary};
use crate::progress::ProgressCallback;
use crate::summary;

/// Events delivered to the caller's poll loop.
#[derive(Debug)]
pub enum Event {
    /// Source analysis finished (or failed before producing a result)
    AnalysisFinished(Result<AnalysisResult, EngineError>),
    /// One file (or bucket header) was processed
    Progress {
        percent: f32,
        current_file: String,
        status_line: String,
    },
    /// A free-form log line for the caller's log pane
    LogLine(String),
    /// The copy run finished; the summary is final
    RunFinished(RunSummary),
}

/// Everything a backup run needs from the caller.
#[derive(Debug)]
pub struct BackupRequest {
    /// Source root, echoed into the backup log header
    pub source: PathBuf,
    /// Destination root, used as the log fallback directory
    pub destination_root: PathBuf,
    /// The confirmed plan entries
    pub plan: Vec<BackupPlanEntry>,
}

/// Spawn a background thread that analyses the source volume.
///
/// Completion is delivered as [`Event::AnalysisFinished`]; the thread never
/// panics on scan errors.
pub fn spawn_analysis(
    source: PathBuf,
    include_metadata: bool,
    sender: Sender<Event>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let result = job::analyze(&source, include_metadata);
        let _ = sender.send(Event::AnalysisFinished(result));
    })
}

/// Spawn a background thread that executes a backup plan.
///
/// The plan is validated synchronously: an invalid plan is rejected here,
/// before any thread is spawned or directory created. A second start while
/// `running` is set is rejected with [`EngineError::RunInProgress`]; the
/// flag clears when the run finishes.
pub fn spawn_backup(
    request: BackupRequest,
    sender: Sender<Event>,
    running: Arc<AtomicBool>,
) -> Result<thread::JoinHandle<()>, EngineError> {
    job::validate_plan(&request.plan)?;

    if running
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Err(EngineError::RunInProgress);
    }

    Ok(thread::spawn(move || {
        let callback = ChannelProgress {
            sender: sender.clone(),
        };
        match job::run_backup(&request.plan, Some(&callback)) {
            Ok(run) => {
                let _ = sender.send(Event::LogLine(summary::summary_block(&run.summary)));
                match summary::write_log(
                    &run.summary,
                    &request.source,
                    &request.destination_root,
                    &run.detail_lines(),
                ) {
                    Ok(log_path) => debug!("backup log written to {}", log_path.display()),
                    // Non-fatal: the run keeps its classification.
                    Err(e) => {
                        let _ = sender.send(Event::LogLine(format!(
                            "ERRO: Não foi possível salvar o log: {}",
                            e
                        )));
                    }
                }
                let _ = sender.send(Event::RunFinished(run.summary));
            }
            Err(e) => {
                // Unreachable after the synchronous validation above, but a
                // failure must still clear the flag and inform the caller.
                let _ = sender.send(Event::LogLine(format!("ERRO: {}", e)));
            }
        }
        running.store(false, Ordering::SeqCst);
    }))
}

/// A ProgressCallback implementation that forwards run progress to the
/// caller's event channel.
struct ChannelProgress {
    sender: Sender<Event>,
}

impl ProgressCallback for ChannelProgress {
    fn on_run_started(&self, total_files: usize) {
        let _ = self.sender.send(Event::LogLine(format!(
            "Backup iniciado: {} arquivos",
            total_files
        )));
    }

    fn on_bucket_started(&self, percent: f32, date_key: &str, file_count: usize) {
        let date = format_date_br(date_key);
        let _ = self.sender.send(Event::Progress {
            percent,
            current_file: format!("Processando data: {}", date),
            status_line: format!("Iniciando backup de {} ({} arquivos)", date, file_count),
        });
    }

    fn on_file_completed(&self, percent: f32, current_file: &str, status_line: &str) {
        let _ = self.sender.send(Event::Progress {
            percent,
            current_file: current_file.to_string(),
            status_line: status_line.to_string(),
        });
    }

    fn on_run_completed(&self, _summary: &RunSummary) {
        // RunFinished is sent by the worker thread after the log is
        // persisted.
    }
}
