//! Error types for the backup engine

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias using hostadm-backup's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// A single archive that could not be removed during pruning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRemoval {
    pub path: PathBuf,
    /// Distinguishes "already gone" from permission and other failures
    pub kind: io::ErrorKind,
    pub message: String,
}

impl FailedRemoval {
    pub fn new(path: &Path, err: &io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Backup engine errors
#[derive(Error, Debug)]
pub enum Error {
    /// Source is missing or not a directory
    #[error("Invalid source {}: {reason}", .path.display())]
    InvalidSource { path: PathBuf, reason: String },

    /// Destination directory cannot be created or written
    #[error("Destination {} is not writable: {message}", .path.display())]
    DestinationUnwritable { path: PathBuf, message: String },

    /// The archiving step failed (including a same-second name collision)
    #[error(
        "Archiving {} into {} failed{}: {message}",
        .source_dir.display(),
        .archive.display(),
        status_suffix(.status)
    )]
    ArchiveToolFailure {
        source_dir: PathBuf,
        archive: PathBuf,
        status: Option<i32>,
        message: String,
    },

    /// One or more old archives could not be removed
    #[error("Failed to remove {} old archive(s): {}", .failures.len(), summarize(.failures))]
    DeletionFailure { failures: Vec<FailedRemoval> },

    /// Destination directory could not be enumerated
    #[error("Failed to list archives in {}: {source}", .path.display())]
    ListFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Advisory destination lock could not be taken
    #[error("Failed to lock destination {}: {source}", .path.display())]
    LockFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Malformed request
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },
}

fn status_suffix(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!(" (exit status {})", code),
        None => String::new(),
    }
}

fn summarize(failures: &[FailedRemoval]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.path.display(), f.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    pub fn invalid_source(path: &Path, reason: impl Into<String>) -> Self {
        Self::InvalidSource {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn destination_unwritable(path: &Path, message: impl Into<String>) -> Self {
        Self::DestinationUnwritable {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn archive_tool_failure(
        source_dir: &Path,
        archive: &Path,
        status: Option<i32>,
        message: impl Into<String>,
    ) -> Self {
        Self::ArchiveToolFailure {
            source_dir: source_dir.to_path_buf(),
            archive: archive.to_path_buf(),
            status,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}
