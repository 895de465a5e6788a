//! Backup engine: archive creation followed by retention pruning.
//!
//! The two steps are not atomic. A failed archive skips pruning; a failed
//! prune leaves the new archive in place and the outcome is reported as a
//! partial success.

use chrono::NaiveDateTime;
use hostadm_core::{AuditAction, AuditEntry, AuditSink, HostConfig, TracingAudit};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::archive::{self, Archiver, SourceTree, DEFAULT_COMPRESSION_LEVEL};
use crate::error::{Error, Result};
use crate::lock::DestinationLock;
use crate::naming::{source_base_name, ArchiveName};
use crate::retention::{self, PruneReport};

/// Prefix of in-progress archive files; they never match the archive grammar
const PARTIAL_PREFIX: &str = ".hostadm-";
const PARTIAL_SUFFIX: &str = ".partial";

/// Engine configuration, passed in explicitly rather than read from the process
#[derive(Debug, Clone, PartialEq)]
pub struct BackupConfig {
    /// Host identifier embedded in archive names
    pub host: String,

    pub archiver: hostadm_core::ArchiverKind,

    /// Gzip level for the native archiver (1-9)
    pub compression_level: u32,

    /// Hold an advisory lock on the destination during real runs
    pub lock_destination: bool,
}

impl BackupConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            archiver: hostadm_core::ArchiverKind::Native,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            lock_destination: false,
        }
    }

    /// Derive engine settings from the loaded host configuration
    pub fn from_host_config(config: &HostConfig) -> Self {
        let host = config
            .host
            .clone()
            .unwrap_or_else(hostadm_core::detect_hostname);
        Self {
            host,
            archiver: config.backup.archiver,
            compression_level: config.backup.compression_level,
            lock_destination: config.backup.lock_destination,
        }
    }

    pub fn with_lock(mut self, lock_destination: bool) -> Self {
        self.lock_destination = lock_destination;
        self
    }
}

/// One backup invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRequest {
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
    /// Archives to keep for this source; 0 disables pruning
    pub retention: usize,
    pub dry_run: bool,
}

impl BackupRequest {
    pub fn new(source_dir: impl Into<PathBuf>, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            dest_dir: dest_dir.into(),
            retention: 0,
            dry_run: false,
        }
    }

    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Result of the archive step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOutcome {
    /// Final archive path (the would-be path for dry runs)
    pub path: PathBuf,
    pub name: ArchiveName,
    /// Equivalent shell command
    pub command: String,
    /// Archive size; `None` for dry runs
    pub size_bytes: Option<u64>,
    pub simulated: bool,
}

/// Result of the prune step
#[derive(Debug)]
pub enum PruneStatus {
    /// Retention is 0
    Disabled,
    /// Pruning ran; the report may still carry deletion failures
    Completed(PruneReport),
    /// Pruning could not run (e.g. the destination could not be listed)
    Failed(Error),
}

/// Result of a full backup run
#[derive(Debug)]
pub struct BackupOutcome {
    pub archive: ArchiveOutcome,
    pub prune: PruneStatus,
}

impl BackupOutcome {
    /// Archive created but pruning failed in whole or in part
    pub fn is_partial(&self) -> bool {
        match &self.prune {
            PruneStatus::Disabled => false,
            PruneStatus::Completed(report) => !report.is_clean(),
            PruneStatus::Failed(_) => true,
        }
    }

    /// Paths removed (or that would be removed) by the prune step
    pub fn removed(&self) -> &[PathBuf] {
        match &self.prune {
            PruneStatus::Completed(report) => &report.removed,
            _ => &[],
        }
    }
}

type Clock = Box<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Backup engine
pub struct BackupEngine {
    config: BackupConfig,
    archiver: Box<dyn Archiver>,
    audit: Box<dyn AuditSink>,
    clock: Clock,
}

impl BackupEngine {
    /// Create an engine using the configured archiver, tracing audit and UTC clock
    pub fn new(config: BackupConfig) -> Self {
        let archiver = archive::for_kind(config.archiver, config.compression_level);
        Self {
            config,
            archiver,
            audit: Box::new(TracingAudit),
            clock: Box::new(|| chrono::Utc::now().naive_utc()),
        }
    }

    pub fn with_archiver(mut self, archiver: Box<dyn Archiver>) -> Self {
        self.archiver = archiver;
        self
    }

    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Replace the timestamp source used for archive names
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDateTime + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Create one archive, then prune older archives of the same source
    pub fn backup(&self, request: &BackupRequest) -> Result<BackupOutcome> {
        // The lock guard, when taken, is held until both steps are done
        let (source, archive, _lock) = self.audited(request, || {
            let source = self.resolve_source(&request.source_dir)?;
            self.prepare_destination(&request.dest_dir, request.dry_run)?;
            let lock = self.lock_destination(request)?;
            let archive = self.write_archive(&source, request)?;
            Ok((source, archive, lock))
        })?;

        let prune = self.prune_step(request, &source.top_level, &archive);

        Ok(BackupOutcome { archive, prune })
    }

    /// Create one archive without pruning
    pub fn create_archive(&self, request: &BackupRequest) -> Result<ArchiveOutcome> {
        self.audited(request, || {
            let source = self.resolve_source(&request.source_dir)?;
            self.prepare_destination(&request.dest_dir, request.dry_run)?;
            self.write_archive(&source, request)
        })
    }

    /// Remove archives of `(host, source_base)` beyond the newest `retention`
    pub fn prune_old_archives(
        &self,
        dest_dir: &Path,
        host: &str,
        source_base: &str,
        retention: usize,
        dry_run: bool,
    ) -> Result<PruneReport> {
        retention::prune_old_archives(dest_dir, host, source_base, retention, dry_run, &*self.audit)
            .inspect_err(|e| self.record_failure(dest_dir, e, dry_run))
    }

    fn prune_step(
        &self,
        request: &BackupRequest,
        source_base: &str,
        archive: &ArchiveOutcome,
    ) -> PruneStatus {
        if request.retention == 0 {
            return PruneStatus::Disabled;
        }

        let pending = archive.simulated.then_some(archive.path.as_path());
        let result = retention::prune_with_pending(
            &request.dest_dir,
            &self.config.host,
            source_base,
            request.retention,
            request.dry_run,
            pending,
            &*self.audit,
        );

        match result {
            Ok(report) => PruneStatus::Completed(report),
            Err(e) => {
                self.record_failure(&request.dest_dir, &e, request.dry_run);
                PruneStatus::Failed(e)
            }
        }
    }

    /// Run `step`, recording any error against the request's source
    fn audited<T>(&self, request: &BackupRequest, step: impl FnOnce() -> Result<T>) -> Result<T> {
        step().inspect_err(|e| self.record_failure(&request.source_dir, e, request.dry_run))
    }

    fn record_failure(&self, target: &Path, err: &Error, dry_run: bool) {
        self.audit.record(
            &AuditEntry::new(
                &self.config.host,
                AuditAction::Failure,
                target.display().to_string(),
            )
            .simulated(dry_run)
            .with_detail(err.to_string()),
        );
    }

    fn lock_destination(&self, request: &BackupRequest) -> Result<Option<DestinationLock>> {
        if !self.config.lock_destination || request.dry_run {
            return Ok(None);
        }
        DestinationLock::acquire(&request.dest_dir).map(Some)
    }

    fn resolve_source(&self, source_dir: &Path) -> Result<SourceTree> {
        let metadata = match fs::metadata(source_dir) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::invalid_source(source_dir, "does not exist"))
            }
            Err(e) => return Err(Error::invalid_source(source_dir, e.to_string())),
        };
        if !metadata.is_dir() {
            return Err(Error::invalid_source(source_dir, "not a directory"));
        }

        let root = source_dir
            .canonicalize()
            .map_err(|e| Error::invalid_source(source_dir, e.to_string()))?;
        let top_level = source_base_name(source_dir)?;

        Ok(SourceTree { root, top_level })
    }

    /// Make sure `dest_dir` is a directory; dry runs only check
    fn prepare_destination(&self, dest_dir: &Path, dry_run: bool) -> Result<()> {
        match fs::metadata(dest_dir) {
            Ok(metadata) if metadata.is_dir() => return Ok(()),
            Ok(_) => {
                return Err(Error::destination_unwritable(
                    dest_dir,
                    "exists and is not a directory",
                ))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::destination_unwritable(dest_dir, e.to_string())),
        }

        if dry_run {
            tracing::debug!("Would create destination {}", dest_dir.display());
            return Ok(());
        }

        tracing::debug!("Creating destination {}", dest_dir.display());
        fs::create_dir_all(dest_dir)
            .map_err(|e| Error::destination_unwritable(dest_dir, e.to_string()))
    }

    fn write_archive(&self, source: &SourceTree, request: &BackupRequest) -> Result<ArchiveOutcome> {
        let name = ArchiveName::new(&self.config.host, &source.top_level, (self.clock)());
        let path = request.dest_dir.join(name.file_name());
        let command = self.archiver.describe(source, &path);

        if path.exists() {
            return Err(Error::archive_tool_failure(
                &source.root,
                &path,
                None,
                "an archive with this name already exists (two runs within one second)",
            ));
        }

        let audit_entry = AuditEntry::new(
            &self.config.host,
            AuditAction::CreateArchive,
            path.display().to_string(),
        )
        .simulated(request.dry_run)
        .with_detail(command.clone());

        if request.dry_run {
            self.audit.record(&audit_entry);
            return Ok(ArchiveOutcome {
                path,
                name,
                command,
                size_bytes: None,
                simulated: true,
            });
        }

        let partial = tempfile::Builder::new()
            .prefix(PARTIAL_PREFIX)
            .suffix(PARTIAL_SUFFIX)
            .tempfile_in(&request.dest_dir)
            .map_err(|e| Error::destination_unwritable(&request.dest_dir, e.to_string()))?;

        tracing::debug!("Running: {}", command);
        self.archiver
            .archive(source, partial.path())
            .map_err(|e| Error::archive_tool_failure(&source.root, &path, e.status, e.message))?;

        partial.persist_noclobber(&path).map_err(|e| {
            let message = if e.error.kind() == io::ErrorKind::AlreadyExists {
                "an archive with this name already exists (two runs within one second)".to_string()
            } else {
                format!("failed to move archive into place: {}", e.error)
            };
            Error::archive_tool_failure(&source.root, &path, None, message)
        })?;

        let size_bytes = fs::metadata(&path).map(|m| m.len()).ok();
        self.audit.record(&audit_entry);

        Ok(ArchiveOutcome {
            path,
            name,
            command,
            size_bytes,
            simulated: false,
        })
    }
}
