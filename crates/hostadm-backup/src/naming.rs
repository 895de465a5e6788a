//! Archive naming
//!
//! Archives are named `backup-<host>-<source>-<YYYYMMDD-HHMMSS>.tar.gz`.
//! The file name is the only metadata store: retention finds the archives
//! of a source by parsing names back with [`ArchiveName::parse`].

use chrono::{NaiveDateTime, Timelike};
use std::path::Path;

use crate::error::{Error, Result};

/// Leading literal of every archive name
pub const ARCHIVE_PREFIX: &str = "backup";

/// Extension of every archive name
pub const ARCHIVE_EXTENSION: &str = ".tar.gz";

/// Timestamp layout; lexicographic order equals chronological order
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Length of a rendered timestamp (`YYYYMMDD-HHMMSS`)
const TIMESTAMP_LEN: usize = 15;

/// Base name used when the source is the filesystem root
const ROOT_BASE_NAME: &str = "root";

/// Structured form of an archive file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    pub host: String,
    pub source_base: String,
    pub timestamp: NaiveDateTime,
}

impl ArchiveName {
    /// Build a name, sanitizing host and source so neither carries a path separator.
    /// Sub-second precision is dropped.
    pub fn new(host: &str, source_base: &str, timestamp: NaiveDateTime) -> Self {
        let timestamp = timestamp.with_nanosecond(0).unwrap_or(timestamp);
        Self {
            host: sanitize_component(host),
            source_base: sanitize_component(source_base),
            timestamp,
        }
    }

    /// The prefix shared by every archive of `(host, source_base)`
    pub fn prefix(host: &str, source_base: &str) -> String {
        format!(
            "{}-{}-{}-",
            ARCHIVE_PREFIX,
            sanitize_component(host),
            sanitize_component(source_base)
        )
    }

    /// Rendered file name
    pub fn file_name(&self) -> String {
        format!(
            "{}{}{}",
            Self::prefix(&self.host, &self.source_base),
            self.timestamp.format(TIMESTAMP_FORMAT),
            ARCHIVE_EXTENSION
        )
    }

    /// Parse `file_name` as an archive of `(host, source_base)`.
    ///
    /// Returns `None` unless the name is exactly prefix + timestamp +
    /// extension, so `data` never matches archives of `data-old`.
    pub fn parse(file_name: &str, host: &str, source_base: &str) -> Option<Self> {
        let rest = file_name.strip_prefix(&Self::prefix(host, source_base))?;
        let stamp = rest.strip_suffix(ARCHIVE_EXTENSION)?;
        if stamp.len() != TIMESTAMP_LEN {
            return None;
        }
        let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
        Some(Self::new(host, source_base, timestamp))
    }
}

/// Replace path separators and trim surrounding whitespace
pub fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

/// Base name of a source directory
///
/// `.`/`..` and trailing-dot paths are resolved against the filesystem
/// first, so `backup --source .` is named after the current directory.
pub fn source_base_name(source_dir: &Path) -> Result<String> {
    let resolved = match source_dir.file_name() {
        Some(name) => return Ok(sanitize_component(&name.to_string_lossy())),
        None => source_dir
            .canonicalize()
            .map_err(|e| Error::invalid_source(source_dir, e.to_string()))?,
    };

    Ok(match resolved.file_name() {
        Some(name) => sanitize_component(&name.to_string_lossy()),
        None => ROOT_BASE_NAME.to_string(),
    })
}
