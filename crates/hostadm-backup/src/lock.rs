//! Advisory lock on a destination directory
//!
//! Two runs against the same destination otherwise race on retention.
//! Holding [`DestinationLock`] serializes them; the lock is released when
//! the guard is dropped.

use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Sentinel file name; never matches the archive naming grammar
pub const LOCK_FILE_NAME: &str = ".hostadm-backup.lock";

/// Exclusive lock guard for a destination directory
#[derive(Debug)]
pub struct DestinationLock {
    _file: File,
    path: PathBuf,
}

impl DestinationLock {
    /// Block until the exclusive lock on `dest_dir` is held
    pub fn acquire(dest_dir: &Path) -> Result<Self> {
        let path = dest_dir.join(LOCK_FILE_NAME);
        let lock_error = |source| Error::LockFailure {
            path: path.clone(),
            source,
        };

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(lock_error)?;

        tracing::debug!("Waiting for lock {}", path.display());
        FileExt::lock_exclusive(&file).map_err(lock_error)?;
        tracing::debug!("Acquired lock {}", path.display());

        Ok(Self { _file: file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
