//! Keep-last-N retention over archives in a destination directory
//!
//! Archives of one `(host, source)` pair are ordered newest first by
//! modification time, ties broken by file name descending (the timestamp
//! suffix sorts chronologically). Everything past the first `retention`
//! entries is removed, oldest first. Removal is best-effort: a file that
//! cannot be deleted is recorded and the remaining files are still tried.

use hostadm_core::{AuditAction, AuditEntry, AuditSink};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{Error, FailedRemoval, Result};
use crate::naming::ArchiveName;

/// An archive found in the destination directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: PathBuf,
    pub file_name: String,
    pub modified: SystemTime,
}

/// Outcome of a retention pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub retention: usize,

    /// Archives kept, newest first
    pub kept: Vec<PathBuf>,

    /// Archives removed (or that would be removed), oldest first
    pub removed: Vec<PathBuf>,

    /// Archives that could not be removed
    pub failures: Vec<FailedRemoval>,

    pub simulated: bool,
}

impl PruneReport {
    fn disabled(dry_run: bool) -> Self {
        Self {
            simulated: dry_run,
            ..Self::default()
        }
    }

    /// True when every selected archive was removed
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Turn deletion failures into [`Error::DeletionFailure`]
    pub fn into_result(self) -> Result<Self> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(Error::DeletionFailure {
                failures: self.failures,
            })
        }
    }
}

/// List archives of `(host, source_base)` in `dest_dir`, newest first.
///
/// A missing directory holds no archives.
pub fn list_archives(dest_dir: &Path, host: &str, source_base: &str) -> Result<Vec<ArchiveEntry>> {
    let read_dir = match fs::read_dir(dest_dir) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(Error::ListFailure {
                path: dest_dir.to_path_buf(),
                source,
            })
        }
    };

    let list_error = |source: io::Error| Error::ListFailure {
        path: dest_dir.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();
    for dir_entry in read_dir {
        let dir_entry = dir_entry.map_err(list_error)?;
        let file_name = dir_entry.file_name().to_string_lossy().into_owned();

        if ArchiveName::parse(&file_name, host, source_base).is_none() {
            continue;
        }

        let metadata = dir_entry.metadata().map_err(list_error)?;
        if !metadata.is_file() {
            continue;
        }

        entries.push(ArchiveEntry {
            path: dir_entry.path(),
            file_name,
            modified: metadata.modified().map_err(list_error)?,
        });
    }

    sort_newest_first(&mut entries);
    Ok(entries)
}

/// Order by modification time, then file name, both descending
pub fn sort_newest_first(entries: &mut [ArchiveEntry]) {
    entries.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| b.file_name.cmp(&a.file_name))
    });
}

/// Split a newest-first list into (kept, expired); expired is oldest first
pub fn select_expired(
    mut entries: Vec<ArchiveEntry>,
    retention: usize,
) -> (Vec<ArchiveEntry>, Vec<ArchiveEntry>) {
    if retention == 0 || entries.len() <= retention {
        return (entries, Vec::new());
    }
    let mut expired = entries.split_off(retention);
    expired.reverse();
    (entries, expired)
}

/// Remove archives of `(host, source_base)` beyond the newest `retention`.
///
/// `retention == 0` disables pruning. In dry-run mode nothing is deleted;
/// the report lists what would be removed.
pub fn prune_old_archives(
    dest_dir: &Path,
    host: &str,
    source_base: &str,
    retention: usize,
    dry_run: bool,
    audit: &dyn AuditSink,
) -> Result<PruneReport> {
    prune_with_pending(dest_dir, host, source_base, retention, dry_run, None, audit)
}

/// Same as [`prune_old_archives`], counting `pending` as the newest archive.
///
/// A dry run has not written its archive yet; passing the would-be path
/// keeps the simulated decisions identical to what a real run would do.
pub fn prune_with_pending(
    dest_dir: &Path,
    host: &str,
    source_base: &str,
    retention: usize,
    dry_run: bool,
    pending: Option<&Path>,
    audit: &dyn AuditSink,
) -> Result<PruneReport> {
    if retention == 0 {
        tracing::debug!("Retention disabled, skipping prune of {}", dest_dir.display());
        return Ok(PruneReport::disabled(dry_run));
    }

    let mut entries = list_archives(dest_dir, host, source_base)?;
    if let Some(pending) = pending {
        if !entries.iter().any(|e| e.path == pending) {
            entries.push(ArchiveEntry {
                path: pending.to_path_buf(),
                file_name: pending
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                modified: SystemTime::now(),
            });
            sort_newest_first(&mut entries);
        }
    }
    let (kept, expired) = select_expired(entries, retention);

    tracing::debug!(
        "Retention {}: keeping {}, expiring {} archive(s) in {}",
        retention,
        kept.len(),
        expired.len(),
        dest_dir.display()
    );

    let mut report = PruneReport {
        retention,
        kept: kept.into_iter().map(|e| e.path).collect(),
        simulated: dry_run,
        ..PruneReport::default()
    };

    for entry in expired {
        let audit_entry = AuditEntry::new(
            host,
            AuditAction::RemoveArchive,
            entry.path.display().to_string(),
        )
        .simulated(dry_run);

        if dry_run {
            audit.record(&audit_entry);
            report.removed.push(entry.path);
            continue;
        }

        match fs::remove_file(&entry.path) {
            Ok(()) => {
                audit.record(&audit_entry);
                report.removed.push(entry.path);
            }
            Err(e) => {
                tracing::warn!("Failed to remove {}: {}", entry.path.display(), e);
                let failure = FailedRemoval::new(&entry.path, &e);
                audit.record(
                    &AuditEntry::new(
                        host,
                        AuditAction::Failure,
                        entry.path.display().to_string(),
                    )
                    .with_detail(format!("remove failed ({:?}): {}", failure.kind, e)),
                );
                report.failures.push(failure);
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use hostadm_core::MemoryAudit;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    const HOST: &str = "web01";
    const SOURCE: &str = "data";

    fn stamp(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 2)
            .unwrap()
            .and_hms_opt(3, minute, 0)
            .unwrap()
    }

    /// Create an archive named for `minute` with an mtime `age_secs` in the past
    fn make_archive(dir: &Path, minute: u32, age_secs: u64) -> PathBuf {
        let name = ArchiveName::new(HOST, SOURCE, stamp(minute)).file_name();
        let path = dir.join(name);
        fs::write(&path, b"archive").unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
        path
    }

    fn remaining(dir: &Path) -> Vec<PathBuf> {
        list_archives(dir, HOST, SOURCE)
            .unwrap()
            .into_iter()
            .map(|e| e.path)
            .collect()
    }

    #[test]
    fn test_list_ignores_foreign_files() {
        let temp = TempDir::new().unwrap();
        let ours = make_archive(temp.path(), 1, 10);
        fs::write(temp.path().join("backup-web01-data-old-20260102-030100.tar.gz"), b"x").unwrap();
        fs::write(temp.path().join("backup-web02-data-20260102-030100.tar.gz"), b"x").unwrap();
        fs::write(temp.path().join("notes.txt"), b"x").unwrap();
        fs::write(temp.path().join(".hostadm-abc.partial"), b"x").unwrap();
        fs::create_dir(temp.path().join("backup-web01-data-20260102-030900.tar.gz")).unwrap();

        assert_eq!(remaining(temp.path()), vec![ours]);
    }

    #[test]
    fn test_list_missing_directory_is_empty() {
        let temp = TempDir::new().unwrap();
        let entries = list_archives(&temp.path().join("absent"), HOST, SOURCE).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_sort_by_mtime_not_name() {
        let temp = TempDir::new().unwrap();
        // Name says newest, mtime says oldest
        let renamed = make_archive(temp.path(), 50, 300);
        let newest = make_archive(temp.path(), 10, 5);
        let middle = make_archive(temp.path(), 20, 100);

        assert_eq!(remaining(temp.path()), vec![newest, middle, renamed]);
    }

    #[test]
    fn test_ties_broken_by_name_descending() {
        let now = SystemTime::now();
        let entry = |minute: u32| ArchiveEntry {
            path: PathBuf::from(format!("/b/{}", minute)),
            file_name: ArchiveName::new(HOST, SOURCE, stamp(minute)).file_name(),
            modified: now,
        };
        let mut entries = vec![entry(1), entry(3), entry(2)];
        sort_newest_first(&mut entries);

        let order: Vec<_> = entries.iter().map(|e| e.path.clone()).collect();
        assert_eq!(
            order,
            vec![
                PathBuf::from("/b/3"),
                PathBuf::from("/b/2"),
                PathBuf::from("/b/1")
            ]
        );
    }

    #[test]
    fn test_prune_keeps_newest_n() {
        let temp = TempDir::new().unwrap();
        let oldest = make_archive(temp.path(), 1, 400);
        let older = make_archive(temp.path(), 2, 300);
        let newer = make_archive(temp.path(), 3, 200);
        let newest = make_archive(temp.path(), 4, 100);
        let audit = MemoryAudit::new();

        let report = prune_old_archives(temp.path(), HOST, SOURCE, 2, false, &audit).unwrap();

        assert!(report.is_clean());
        assert_eq!(report.removed, vec![oldest.clone(), older.clone()]);
        assert_eq!(report.kept, vec![newest.clone(), newer.clone()]);
        assert_eq!(remaining(temp.path()), vec![newest, newer]);
        assert!(!oldest.exists());
        assert_eq!(audit.entries().len(), 2);
        assert!(audit.lines()[0].contains("removed archive"));
    }

    #[test]
    fn test_prune_fewer_than_retention_is_noop() {
        let temp = TempDir::new().unwrap();
        make_archive(temp.path(), 1, 100);
        make_archive(temp.path(), 2, 50);
        let audit = MemoryAudit::new();

        let report = prune_old_archives(temp.path(), HOST, SOURCE, 5, false, &audit).unwrap();

        assert!(report.removed.is_empty());
        assert_eq!(report.kept.len(), 2);
        assert!(audit.entries().is_empty());
    }

    #[test]
    fn test_prune_zero_retention_never_removes() {
        let temp = TempDir::new().unwrap();
        for minute in 0..6 {
            make_archive(temp.path(), minute, 600 - u64::from(minute) * 10);
        }
        let audit = MemoryAudit::new();

        let report = prune_old_archives(temp.path(), HOST, SOURCE, 0, false, &audit).unwrap();

        assert!(report.removed.is_empty());
        assert_eq!(remaining(temp.path()).len(), 6);
    }

    #[test]
    fn test_prune_empty_directory() {
        let temp = TempDir::new().unwrap();
        let audit = MemoryAudit::new();
        let report = prune_old_archives(temp.path(), HOST, SOURCE, 3, false, &audit).unwrap();
        assert!(report.kept.is_empty());
        assert!(report.removed.is_empty());
    }

    #[test]
    fn test_prune_dry_run_deletes_nothing() {
        let temp = TempDir::new().unwrap();
        let oldest = make_archive(temp.path(), 1, 300);
        make_archive(temp.path(), 2, 200);
        make_archive(temp.path(), 3, 100);
        let audit = MemoryAudit::new();

        let report = prune_old_archives(temp.path(), HOST, SOURCE, 2, true, &audit).unwrap();

        assert!(report.simulated);
        assert_eq!(report.removed, vec![oldest.clone()]);
        assert!(oldest.exists());
        assert_eq!(remaining(temp.path()).len(), 3);
        assert_eq!(
            audit.lines(),
            vec![format!("[{}] would remove archive {}", HOST, oldest.display())]
        );
    }

    #[test]
    fn test_pending_archive_counts_toward_retention() {
        let temp = TempDir::new().unwrap();
        let oldest = make_archive(temp.path(), 1, 300);
        let older = make_archive(temp.path(), 2, 200);
        let newest = make_archive(temp.path(), 3, 100);
        let pending = temp
            .path()
            .join(ArchiveName::new(HOST, SOURCE, stamp(4)).file_name());
        let audit = MemoryAudit::new();

        let report = prune_with_pending(
            temp.path(),
            HOST,
            SOURCE,
            2,
            true,
            Some(&pending),
            &audit,
        )
        .unwrap();

        assert_eq!(report.kept, vec![pending, newest]);
        assert_eq!(report.removed, vec![oldest, older]);
    }

    #[test]
    fn test_select_expired_oldest_first() {
        let now = SystemTime::now();
        let entries: Vec<_> = (0..5u64)
            .map(|i| ArchiveEntry {
                path: PathBuf::from(format!("/b/{}", i)),
                file_name: format!("{}", i),
                modified: now - Duration::from_secs(i * 10),
            })
            .collect();

        let (kept, expired) = select_expired(entries, 2);
        let kept: Vec<_> = kept.into_iter().map(|e| e.path).collect();
        let expired: Vec<_> = expired.into_iter().map(|e| e.path).collect();
        assert_eq!(kept, vec![PathBuf::from("/b/0"), PathBuf::from("/b/1")]);
        assert_eq!(
            expired,
            vec![
                PathBuf::from("/b/4"),
                PathBuf::from("/b/3"),
                PathBuf::from("/b/2")
            ]
        );
    }

    #[test]
    fn test_into_result_aggregates_failures() {
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let report = PruneReport {
            retention: 1,
            failures: vec![
                FailedRemoval::new(Path::new("/b/a"), &denied),
                FailedRemoval::new(Path::new("/b/b"), &denied),
            ],
            ..PruneReport::default()
        };

        match report.into_result() {
            Err(Error::DeletionFailure { failures }) => assert_eq!(failures.len(), 2),
            other => panic!("expected DeletionFailure, got {:?}", other),
        }
    }
}
