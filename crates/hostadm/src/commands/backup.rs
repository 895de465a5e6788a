//! Backup command

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, ValueEnum};
use hostadm_backup::{BackupConfig, BackupEngine, BackupOutcome, BackupRequest, PruneStatus};
use hostadm_core::ArchiverKind;
use serde::Serialize;
use std::path::PathBuf;

use super::{audit_sink, load_config, CommandStatus};
use crate::output;

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Directory to archive
    #[arg(short, long)]
    pub source: Utf8PathBuf,

    /// Directory archives are written to [default: backup.default-dest]
    #[arg(short, long)]
    pub dest: Option<Utf8PathBuf>,

    /// Archives to keep for this source; 0 disables pruning [default: backup.retention]
    #[arg(short, long)]
    pub retention: Option<usize>,

    /// Dry-run mode (show what would be created and removed)
    #[arg(long)]
    pub dry_run: bool,

    /// Archiving strategy
    #[arg(long, value_enum)]
    pub archiver: Option<ArchiverChoice>,

    /// Compression level for the native archiver (1-9)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=9))]
    pub compression: Option<u32>,

    /// Hold an advisory lock on the destination while running
    #[arg(long)]
    pub lock: bool,

    /// Output the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ArchiverChoice {
    /// In-process tar + gzip
    Native,

    /// External `tar -czf`
    Tar,
}

impl ArchiverChoice {
    /// Convert CLI choice to the config type.
    fn to_kind(self) -> ArchiverKind {
        match self {
            ArchiverChoice::Native => ArchiverKind::Native,
            ArchiverChoice::Tar => ArchiverKind::Tar,
        }
    }
}

/// Machine-readable result of a backup run
#[derive(Debug, Serialize)]
struct BackupReport {
    archive: PathBuf,
    command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
    dry_run: bool,
    retention: usize,
    kept: Vec<PathBuf>,
    removed: Vec<PathBuf>,
    failures: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prune_error: Option<String>,
    partial: bool,
}

impl BackupReport {
    fn new(outcome: &BackupOutcome, retention: usize) -> Self {
        let (kept, removed, failures, prune_error) = match &outcome.prune {
            PruneStatus::Disabled => (Vec::new(), Vec::new(), Vec::new(), None),
            PruneStatus::Completed(report) => (
                report.kept.clone(),
                report.removed.clone(),
                report
                    .failures
                    .iter()
                    .map(|f| format!("{}: {}", f.path.display(), f.message))
                    .collect(),
                None,
            ),
            PruneStatus::Failed(e) => (Vec::new(), Vec::new(), Vec::new(), Some(e.to_string())),
        };

        Self {
            archive: outcome.archive.path.clone(),
            command: outcome.archive.command.clone(),
            size_bytes: outcome.archive.size_bytes,
            dry_run: outcome.archive.simulated,
            retention,
            kept,
            removed,
            failures,
            prune_error,
            partial: outcome.is_partial(),
        }
    }
}

pub fn run(args: BackupArgs, config_path: Option<&Utf8Path>) -> Result<CommandStatus> {
    let config = load_config(config_path)?;

    // CLI flags override the layered configuration
    let mut engine_config = BackupConfig::from_host_config(&config);
    if let Some(choice) = args.archiver {
        engine_config.archiver = choice.to_kind();
    }
    if let Some(level) = args.compression {
        engine_config.compression_level = level;
    }
    if args.lock {
        engine_config.lock_destination = true;
    }

    let dest = args
        .dest
        .clone()
        .unwrap_or_else(|| config.backup.default_dest.clone());
    let retention = args.retention.unwrap_or(config.backup.retention);

    if !args.json {
        output::header("Backup");
        output::kv("Host", &engine_config.host);
        output::kv("Source", args.source.as_str());
        output::kv("Destination", dest.as_str());
        output::kv("Archiver", &engine_config.archiver.to_string());
        output::kv(
            "Retention",
            &if retention == 0 {
                "disabled".to_string()
            } else {
                format!("keep last {}", retention)
            },
        );
        if args.dry_run {
            output::warning("DRY RUN MODE - nothing will be written or removed");
        }
        println!();
    }

    let request = BackupRequest::new(args.source.as_std_path(), dest.as_std_path())
        .with_retention(retention)
        .with_dry_run(args.dry_run);
    let engine = BackupEngine::new(engine_config).with_audit(audit_sink(&config));

    let spinner = (!args.json && !args.dry_run).then(|| output::spinner("Creating archive..."));
    let result = engine.backup(&request);
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let outcome = result?;

    if args.json {
        let report = BackupReport::new(&outcome, retention);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&outcome);
    }

    Ok(if outcome.is_partial() {
        CommandStatus::Partial
    } else {
        CommandStatus::Success
    })
}

fn print_summary(outcome: &BackupOutcome) {
    let archive = &outcome.archive;
    if archive.simulated {
        output::info(&format!("Would create {}", archive.path.display()));
        output::kv("Command", &archive.command);
    } else {
        output::success(&format!("Created {}", archive.path.display()));
        if let Some(size) = archive.size_bytes {
            output::kv("Size", &format_bytes(size));
        }
    }

    match &outcome.prune {
        PruneStatus::Disabled => {}
        PruneStatus::Completed(report) => {
            let verb = if report.simulated {
                "Would remove"
            } else {
                "Removed"
            };
            for path in &report.removed {
                output::info(&format!("{} {}", verb, path.display()));
            }
            output::kv(
                "Retention",
                &format!(
                    "{} kept, {} {}",
                    report.kept.len(),
                    report.removed.len(),
                    if report.simulated {
                        "to remove"
                    } else {
                        "removed"
                    }
                ),
            );
            for failure in &report.failures {
                output::warning(&format!(
                    "Could not remove {}: {}",
                    failure.path.display(),
                    failure.message
                ));
            }
        }
        PruneStatus::Failed(e) => output::warning(&format!("Pruning skipped: {}", e)),
    }

    if outcome.is_partial() {
        output::warning("Backup created but retention pruning did not complete");
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
