//! Command implementations

pub mod backup;
pub mod group;
pub mod user;

use anyhow::{Context, Result};
use camino::Utf8Path;
use hostadm_accounts::AccountManager;
use hostadm_core::{AuditSink, ConfigLoader, HostConfig, JsonlAuditLog, TracingAudit};
use std::process::ExitCode;

/// How a command finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    /// The main action succeeded but a follow-up step did not
    Partial,
    Failed,
}

impl CommandStatus {
    pub fn exit_code(self) -> ExitCode {
        match self {
            CommandStatus::Success => ExitCode::SUCCESS,
            CommandStatus::Failed => ExitCode::from(1),
            CommandStatus::Partial => ExitCode::from(3),
        }
    }
}

/// Load the layered host configuration
pub(crate) fn load_config(path: Option<&Utf8Path>) -> Result<HostConfig> {
    ConfigLoader::new(path.map(Utf8Path::to_path_buf))
        .load()
        .context("Failed to load configuration")
}

/// Audit sink selected by `audit.log-file`
pub(crate) fn audit_sink(config: &HostConfig) -> Box<dyn AuditSink> {
    match &config.audit.log_file {
        Some(path) => Box::new(JsonlAuditLog::new(path.as_std_path())),
        None => Box::new(TracingAudit),
    }
}

/// Account manager wired to the configured audit sink
pub(crate) fn account_manager(config_path: Option<&Utf8Path>, dry_run: bool) -> Result<AccountManager> {
    let config = load_config(config_path)?;
    Ok(AccountManager::from_host_config(&config)
        .with_audit(audit_sink(&config))
        .with_dry_run(dry_run))
}

/// Mutations need root; dry runs and listings do not
pub(crate) fn ensure_root(accounts: &AccountManager) -> Result<()> {
    if accounts.is_dry_run() {
        return Ok(());
    }
    accounts.require_root()?;
    Ok(())
}

/// Report the outcome of one account mutation
pub(crate) fn report_mutation(accounts: &AccountManager, done: &str) {
    if accounts.is_dry_run() {
        crate::output::info(&format!("Dry run: {} (nothing changed)", done));
    } else {
        crate::output::success(done);
    }
}
