//! hostadm Backup Engine
//!
//! This crate creates timestamped `.tar.gz` archives of a directory and
//! enforces a keep-last-N retention policy over earlier archives of the
//! same source.
//!
//! # Features
//!
//! - **Deterministic naming**: `backup-<host>-<source>-<YYYYMMDD-HHMMSS>.tar.gz`;
//!   the file name is the only metadata store
//! - **Safe writes**: archives are written to a hidden partial file and moved
//!   into place with a no-clobber rename
//! - **Retention**: newest-by-mtime first, ties broken by name; best-effort
//!   deletion with aggregated failures
//! - **Dry runs**: every decision is reported and audited with "would" framing,
//!   nothing on disk changes
//! - **Optional destination lock**: serializes concurrent runs on one destination
//!
//! # Examples
//!
//! ```no_run
//! use hostadm_backup::{BackupConfig, BackupEngine, BackupRequest};
//!
//! fn main() -> Result<(), hostadm_backup::Error> {
//!     let engine = BackupEngine::new(BackupConfig::new("web01"));
//!     let request = BackupRequest::new("/srv/data", "/var/backups").with_retention(7);
//!
//!     let outcome = engine.backup(&request)?;
//!     println!("Backup created: {}", outcome.archive.path.display());
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod engine;
pub mod error;
pub mod lock;
pub mod naming;
pub mod retention;

// Re-export commonly used types
pub use archive::{Archiver, ArchiveToolError, NativeArchiver, SourceTree, TarCommand};
pub use engine::{
    ArchiveOutcome, BackupConfig, BackupEngine, BackupOutcome, BackupRequest, PruneStatus,
};
pub use error::{Error, FailedRemoval, Result};
pub use lock::{DestinationLock, LOCK_FILE_NAME};
pub use naming::{ArchiveName, ARCHIVE_EXTENSION, TIMESTAMP_FORMAT};
pub use retention::{list_archives, ArchiveEntry, PruneReport};
