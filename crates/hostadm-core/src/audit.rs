//! Audit trail for administrative actions
//!
//! Every mutation decision (and every simulated one) is handed to an
//! [`AuditSink`]. The JSON lines sink appends one record per action to a
//! file under an exclusive lock; the tracing sink only emits log events.

use chrono::{DateTime, Utc};
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::Result;

/// Kind of action recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    CreateArchive,
    RemoveArchive,
    AddUser,
    DeleteUser,
    ModifyUser,
    AddGroup,
    DeleteGroup,
    AddMember,
    RemoveMember,
    Failure,
}

impl AuditAction {
    /// Verb pair used to render the entry: (performed, simulated)
    fn verbs(&self) -> (&'static str, &'static str) {
        match self {
            AuditAction::CreateArchive => ("created archive", "would create archive"),
            AuditAction::RemoveArchive => ("removed archive", "would remove archive"),
            AuditAction::AddUser => ("added user", "would add user"),
            AuditAction::DeleteUser => ("deleted user", "would delete user"),
            AuditAction::ModifyUser => ("modified user", "would modify user"),
            AuditAction::AddGroup => ("added group", "would add group"),
            AuditAction::DeleteGroup => ("deleted group", "would delete group"),
            AuditAction::AddMember => ("added member", "would add member"),
            AuditAction::RemoveMember => ("removed member", "would remove member"),
            AuditAction::Failure => ("failed", "would fail"),
        }
    }
}

/// A single audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub host: String,
    pub action: AuditAction,
    /// Path or account name the action applies to
    pub target: String,
    /// True for dry-run decisions
    pub simulated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEntry {
    pub fn new(host: impl Into<String>, action: AuditAction, target: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            host: host.into(),
            action,
            target: target.into(),
            simulated: false,
            detail: None,
        }
    }

    pub fn simulated(mut self, simulated: bool) -> Self {
        self.simulated = simulated;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for AuditEntry {
    /// Real and simulated entries carry the same information and differ
    /// only in the "would" framing of the verb.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (done, would) = self.action.verbs();
        let verb = if self.simulated { would } else { done };
        write!(f, "[{}] {} {}", self.host, verb, self.target)?;
        if let Some(detail) = &self.detail {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}

/// Append-only destination for audit entries
///
/// Recording never fails the caller: a sink that cannot persist an entry
/// reports the problem through `tracing` and carries on.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// Sink that only emits `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAudit;

impl AuditSink for TracingAudit {
    fn record(&self, entry: &AuditEntry) {
        match entry.action {
            AuditAction::Failure => tracing::error!(target: "audit", "{}", entry),
            _ => tracing::info!(target: "audit", "{}", entry),
        }
    }
}

/// JSON lines audit log (file-locked appends, mirrored to tracing)
#[derive(Debug, Clone)]
pub struct JsonlAuditLog {
    path: PathBuf,
}

impl JsonlAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry (atomic, file-locked)
    pub fn append(&self, entry: &AuditEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // Released when `file` is dropped
        FileExt::lock_exclusive(&file)?;

        let line = serde_json::to_string(entry)?;
        writeln!(file, "{}", line)?;
        file.sync_all()?;

        Ok(())
    }

    /// Read back every entry in the log; blank lines are skipped
    pub fn entries(&self) -> Result<Vec<AuditEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(fs::File::open(&self.path)?);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }
}

impl AuditSink for JsonlAuditLog {
    fn record(&self, entry: &AuditEntry) {
        TracingAudit.record(entry);
        if let Err(e) = self.append(entry) {
            tracing::warn!("Failed to write audit log {}: {}", self.path.display(), e);
        }
    }
}

/// In-memory sink, used when embedding the engines and in tests
#[derive(Debug, Default, Clone)]
pub struct MemoryAudit {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded entries
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Rendered lines, in recording order
    pub fn lines(&self) -> Vec<String> {
        self.entries().iter().map(ToString::to_string).collect()
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, entry: &AuditEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry.clone());
        }
    }
}
