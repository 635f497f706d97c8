//! CardBackup - Command-line interface for the media backup engine.
//!
//! This is a headless driver for the backup engine. It analyses a card,
//! prints the per-date report, builds a plan from the command-line options,
//! and consumes the engine's event stream while the copy run executes on
//! its background worker.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use engine::{
    default_destination, example_name, format_date_br, format_size, spawn_analysis, spawn_backup,
    summary_block, AnalysisResult, BackupPlanEntry, BackupRequest, Event, FileRecord, RenameRule,
    RunSummary,
};

/// How often the event queue is drained while a worker is active.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// CardBackup - structured media backups from camera cards
#[derive(Parser, Debug)]
#[command(name = "cardbackup")]
#[command(version = "0.1.0")]
#[command(about = "Back up media files grouped by capture date")]
struct Args {
    /// Source directory (the mounted card)
    #[arg(long, value_name = "PATH")]
    src: PathBuf,

    /// Destination root for the backup tree
    #[arg(long, value_name = "PATH")]
    dst: PathBuf,

    /// Do not collect XMP/XML metadata sidecars
    #[arg(long)]
    skip_metadata: bool,

    /// Print the analysis report and exit without copying
    #[arg(long)]
    analyze_only: bool,

    /// Comma-separated date keys to back up (default: all dates)
    #[arg(long, value_name = "DATES")]
    dates: Option<String>,

    /// Rename files while copying
    #[arg(long)]
    rename: bool,

    /// Prefix for renamed files (produces {prefix}_{num}{ext})
    #[arg(long, value_name = "PREFIX", requires = "rename")]
    prefix: Option<String>,

    /// Ignore the original numbering and use a sequential counter
    #[arg(long, requires = "rename")]
    renumber: bool,

    /// Print every per-file status line
    #[arg(long)]
    verbose: bool,
}

fn print_progress_bar(percent: u32) -> String {
    let filled = (percent / 5) as usize;
    let empty = 20 - filled;
    format!("[{}{}] {}%", "=".repeat(filled), " ".repeat(empty), percent)
}

fn list_size(records: &[FileRecord]) -> u64 {
    records.iter().map(|record| record.size).sum()
}

/// Render the per-date analysis report the way the desktop shell shows it.
fn print_analysis(analysis: &AnalysisResult) {
    println!("ANÁLISE DO CARTÃO");
    println!("{}", "=".repeat(50));
    println!();
    println!("Arquivos encontrados: {}", analysis.total_files());
    println!("Tamanho total: {}", format_size(analysis.total_size()));
    println!();
    println!(
        "Fotos: {} ({})",
        analysis.photos.len(),
        format_size(list_size(&analysis.photos))
    );
    println!(
        "Vídeos: {} ({})",
        analysis.videos.len(),
        format_size(list_size(&analysis.videos))
    );
    println!(
        "Metadados: {} ({})",
        analysis.metadata.len(),
        format_size(list_size(&analysis.metadata))
    );
    println!();
    println!("Detalhes por data ({} dias):", analysis.buckets.len());
    println!("{}", "-".repeat(40));
    for bucket in analysis.buckets.values() {
        println!(
            "- {}: {} arquivos ({})",
            format_date_br(&bucket.date_key),
            bucket.file_count(),
            format_size(bucket.total_size)
        );
    }
}

/// Wait for the analysis worker, draining any interleaved events.
fn wait_for_analysis(rx: &Receiver<Event>) -> Result<AnalysisResult, String> {
    loop {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(Event::AnalysisFinished(result)) => {
                return result.map_err(|e| format!("Analysis failed: {}", e));
            }
            Ok(_) => continue,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                return Err("Analysis worker disconnected".to_string());
            }
        }
    }
}

/// Drain the event queue on a fixed interval until the run finishes.
fn watch_backup(rx: &Receiver<Event>, verbose: bool) -> Result<RunSummary, String> {
    loop {
        let first = match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                return Err("Backup worker disconnected".to_string());
            }
        };
        // Drain everything that queued up since the last poll.
        for event in std::iter::once(first).chain(rx.try_iter()) {
            match event {
                Event::Progress {
                    percent,
                    current_file,
                    status_line,
                } => {
                    eprint!(
                        "\rProgress: {} | {}",
                        print_progress_bar(percent as u32),
                        current_file
                    );
                    let _ = std::io::Write::flush(&mut std::io::stderr());
                    if verbose {
                        eprintln!();
                        eprintln!("  {}", status_line);
                    }
                }
                Event::LogLine(line) => {
                    eprintln!();
                    eprintln!("{}", line);
                }
                Event::RunFinished(summary) => {
                    eprintln!();
                    return Ok(summary);
                }
                Event::AnalysisFinished(_) => {}
            }
        }
    }
}

fn selected_keys(analysis: &AnalysisResult, dates: &Option<String>) -> Result<Vec<String>, String> {
    let all: Vec<String> = analysis.buckets.keys().cloned().collect();
    let Some(filter) = dates else {
        return Ok(all);
    };

    let mut selected = Vec::new();
    for key in filter.split(',').map(str::trim).filter(|k| !k.is_empty()) {
        if !analysis.buckets.contains_key(key) {
            return Err(format!(
                "Unknown date '{}'. Available dates: {}",
                key,
                all.join(", ")
            ));
        }
        selected.push(key.to_string());
    }
    if selected.is_empty() {
        return Err("No dates selected".to_string());
    }
    Ok(selected)
}

/// Parse and validate command-line arguments, then drive the engine
fn main() {
    env_logger::init();
    let args = Args::parse();

    let exit_code = match run_cli(&args) {
        Ok(()) => 0,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            2
        }
    };

    std::process::exit(exit_code);
}

/// Main CLI logic - separated for testability
fn run_cli(args: &Args) -> Result<(), String> {
    if !args.src.exists() {
        return Err(format!(
            "Source directory does not exist: {}",
            args.src.display()
        ));
    }
    if !args.src.is_dir() {
        return Err(format!("Source is not a directory: {}", args.src.display()));
    }

    // Analyse the card on its background worker.
    let (tx, rx) = unbounded();
    let analysis_handle = spawn_analysis(args.src.clone(), !args.skip_metadata, tx);
    let analysis = wait_for_analysis(&rx)?;
    let _ = analysis_handle.join();

    print_analysis(&analysis);

    if analysis.is_empty() {
        println!();
        println!("Nothing to back up.");
        return Ok(());
    }
    if args.analyze_only {
        return Ok(());
    }

    println!();
    println!(
        "Espaço necessário: {}",
        format_size(analysis.required_bytes())
    );

    // Build the plan: one entry per selected date, same rule everywhere.
    let rule = RenameRule {
        enabled: args.rename,
        prefix: args.prefix.clone(),
        keep_original_numbering: !args.renumber,
    };
    let plan: Vec<BackupPlanEntry> = selected_keys(&analysis, &args.dates)?
        .iter()
        .map(|key| {
            let bucket = &analysis.buckets[key];
            if rule.enabled {
                if let Some(example) = example_name(bucket, &rule) {
                    println!(
                        "Exemplo para {}: {}",
                        format_date_br(key),
                        example
                    );
                }
            }
            BackupPlanEntry::for_bucket(
                bucket,
                default_destination(&args.dst, key),
                rule.clone(),
            )
        })
        .collect();

    let (tx, rx) = unbounded();
    let running = Arc::new(AtomicBool::new(false));
    let request = BackupRequest {
        source: args.src.clone(),
        destination_root: args.dst.clone(),
        plan,
    };
    let backup_handle =
        spawn_backup(request, tx, running).map_err(|e| format!("Backup rejected: {}", e))?;

    let summary = watch_backup(&rx, args.verbose)?;
    let _ = backup_handle.join();

    println!();
    println!("{}", summary_block(&summary));

    if summary.errors > 0 {
        Err("One or more files failed to back up".to_string())
    } else {
        Ok(())
    }
}
