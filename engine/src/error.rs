//! Error types for the backup engine.
//!
//! The primary error type is `EngineError`, which represents run-level errors
//! that prevent a backup from starting or a log from being written. Per-file
//! copy failures are recorded in CopyOutcome, not as EngineError, and never
//! abort a run.

use std::fmt::{Display, self};
use std::path::PathBuf;
use std::io;
use std::error::Error;

/// Errors that can occur at the run level.
///
/// These errors are raised before a run starts (validation) or around it
/// (log persistence). Per-file failures during the copy loop are recorded
/// in the outcome list, not in this enum.
#[derive(Debug)]
pub enum EngineError {
    /// Source directory does not exist
    SourceNotFound { path: PathBuf },

    /// Source directory is not accessible (permissions)
    SourceAccessDenied { path: PathBuf, source: io::Error },

    /// Path is not usable for the requested operation
    InvalidPath { path: PathBuf, reason: String },

    /// A selected date bucket has an empty destination path
    EmptyDestination { date_key: String },

    /// A backup run is already active; concurrent starts are rejected
    RunInProgress,

    /// Failed to read from a source file
    ReadError { path: PathBuf, source: io::Error },

    /// Failed to write to a destination file
    WriteError { path: PathBuf, source: io::Error },

    /// Failed to create a directory
    DirectoryCreationFailed { path: PathBuf, source: io::Error },

    /// The backup log could not be persisted; reported to the caller but
    /// never downgrades the run's success classification
    LogWriteFailed { path: PathBuf, source: io::Error },

    /// Catch-all for unexpected errors
    Unknown { message: String },
}

impl Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceNotFound { path } => {
                write!(f, "Source directory not found: {}", path.display())
            }
            Self::SourceAccessDenied { path, .. } => {
                write!(f, "Source directory access denied: {}", path.display())
            }
            Self::InvalidPath { path, reason } => {
                write!(f, "Invalid path: {} ({})", path.display(), reason)
            }
            Self::EmptyDestination { date_key } => {
                write!(f, "Empty destination path for date {}", date_key)
            }
            Self::RunInProgress => {
                write!(f, "A backup run is already in progress")
            }
            Self::ReadError { path, .. } => {
                write!(f, "Failed to read file: {}", path.display())
            }
            Self::WriteError { path, .. } => {
                write!(f, "Failed to write file: {}", path.display())
            }
            Self::DirectoryCreationFailed { path, .. } => {
                write!(f, "Failed to create directory: {}", path.display())
            }
            Self::LogWriteFailed { path, .. } => {
                write!(f, "Failed to write backup log: {}", path.display())
            }
            Self::Unknown { message } => {
                write!(f, "Engine error: {}", message)
            }
        }
    }
}

impl Error for EngineError {}

impl EngineError {
    /// Extract the OS error code from this error, if available.
    pub fn raw_os_error(&self) -> Option<u32> {
        match self {
            Self::SourceAccessDenied { source, .. }
            | Self::ReadError { source, .. }
            | Self::WriteError { source, .. }
            | Self::DirectoryCreationFailed { source, .. }
            | Self::LogWriteFailed { source, .. } => {
                source.raw_os_error().map(|e| e as u32)
            }
            _ => None,
        }
    }
}

impl From<io::Error> for EngineError {
    fn from(err: io::Error) -> Self {
        EngineError::Unknown {
            message: err.to_string(),
        }
    }
}
