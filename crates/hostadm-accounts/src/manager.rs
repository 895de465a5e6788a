//! Account operations
//!
//! Each mutation validates its arguments, builds exactly one OS command and
//! runs it. Outcomes go to the audit sink, which also logs them; in dry-run mode
//! the command is described and audited but never executed.

use camino::Utf8PathBuf;
use hostadm_core::{AuditAction, AuditEntry, AuditSink, HostConfig, TracingAudit};

use crate::command::{CommandRunner, OsCommand, SystemRunner};
use crate::database::{self, is_regular_id, GroupEntry, PasswdEntry};
use crate::error::{Error, Result};
use crate::names::validate_name;

/// Options for [`AccountManager::add_user`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserOptions {
    pub shell: Option<String>,
    pub home: Option<Utf8PathBuf>,
    pub comment: Option<String>,
    /// Supplementary groups
    pub groups: Vec<String>,
    /// Create a system account (`-r`)
    pub system: bool,
    /// Create the home directory (`-m`)
    pub create_home: bool,
}

/// Changes applied by [`AccountManager::modify_user`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub shell: Option<String>,
    pub comment: Option<String>,
    /// Supplementary groups to add; existing memberships are kept
    pub append_groups: Vec<String>,
    pub lock: bool,
    pub unlock: bool,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.shell.is_none()
            && self.comment.is_none()
            && self.append_groups.is_empty()
            && !self.lock
            && !self.unlock
    }
}

/// Thin wrapper over the shadow-utils tools
pub struct AccountManager {
    host: String,
    runner: Box<dyn CommandRunner>,
    audit: Box<dyn AuditSink>,
    dry_run: bool,
    min_uid: u32,
    passwd_file: Utf8PathBuf,
    group_file: Utf8PathBuf,
}

impl AccountManager {
    pub fn new(host: impl Into<String>) -> Self {
        Self::from_host_config_with_host(host.into(), &HostConfig::default())
    }

    pub fn from_host_config(config: &HostConfig) -> Self {
        let host = config
            .host
            .clone()
            .unwrap_or_else(hostadm_core::detect_hostname);
        Self::from_host_config_with_host(host, config)
    }

    fn from_host_config_with_host(host: String, config: &HostConfig) -> Self {
        Self {
            host,
            runner: Box::new(SystemRunner),
            audit: Box::new(TracingAudit),
            dry_run: false,
            min_uid: config.accounts.min_uid,
            passwd_file: config.accounts.passwd_file.clone(),
            group_file: config.accounts.group_file.clone(),
        }
    }

    pub fn with_runner(mut self, runner: Box<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Read accounts from alternate passwd/group files
    pub fn with_databases(
        mut self,
        passwd_file: impl Into<Utf8PathBuf>,
        group_file: impl Into<Utf8PathBuf>,
    ) -> Self {
        self.passwd_file = passwd_file.into();
        self.group_file = group_file.into();
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Fail unless the effective user is root
    pub fn require_root(&self) -> Result<()> {
        let output = self.runner.run(&OsCommand::new("id").arg("-u"))?.check("id")?;
        match output.stdout.trim() {
            "0" => Ok(()),
            uid => Err(Error::permission_denied(format!(
                "account management requires root (running as uid {})",
                uid
            ))),
        }
    }

    pub fn add_user(&self, name: &str, options: &UserOptions) -> Result<()> {
        validate_name(name)?;
        validate_groups(&options.groups)?;
        validate_shell(options.shell.as_deref())?;
        validate_comment(options.comment.as_deref())?;

        let command = OsCommand::new("useradd")
            .flag("-m", options.create_home)
            .flag("-r", options.system)
            .opt("-s", options.shell.as_deref())
            .opt("-d", options.home.as_ref().map(|h| h.as_str()))
            .opt("-c", options.comment.as_deref())
            .opt("-G", join_groups(&options.groups).as_deref())
            .arg(name);

        self.execute(AuditAction::AddUser, name, command)
    }

    pub fn delete_user(&self, name: &str, remove_home: bool) -> Result<()> {
        validate_name(name)?;
        let command = OsCommand::new("userdel").flag("-r", remove_home).arg(name);
        self.execute(AuditAction::DeleteUser, name, command)
    }

    pub fn modify_user(&self, name: &str, changes: &UserChanges) -> Result<()> {
        validate_name(name)?;
        if changes.is_empty() {
            return Err(Error::invalid_argument(format!(
                "no changes requested for user '{}'",
                name
            )));
        }
        if changes.lock && changes.unlock {
            return Err(Error::invalid_argument(
                "cannot lock and unlock an account at the same time",
            ));
        }
        validate_groups(&changes.append_groups)?;
        validate_shell(changes.shell.as_deref())?;
        validate_comment(changes.comment.as_deref())?;

        let groups = join_groups(&changes.append_groups);
        let command = OsCommand::new("usermod")
            .opt("-s", changes.shell.as_deref())
            .opt("-c", changes.comment.as_deref())
            .flag("-a", groups.is_some())
            .opt("-G", groups.as_deref())
            .flag("-L", changes.lock)
            .flag("-U", changes.unlock)
            .arg(name);

        self.execute(AuditAction::ModifyUser, name, command)
    }

    pub fn add_group(&self, name: &str, system: bool) -> Result<()> {
        validate_name(name)?;
        let command = OsCommand::new("groupadd").flag("-r", system).arg(name);
        self.execute(AuditAction::AddGroup, name, command)
    }

    pub fn delete_group(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let command = OsCommand::new("groupdel").arg(name);
        self.execute(AuditAction::DeleteGroup, name, command)
    }

    pub fn add_user_to_group(&self, user: &str, group: &str) -> Result<()> {
        validate_name(user)?;
        validate_name(group)?;
        let command = OsCommand::new("usermod").arg("-aG").arg(group).arg(user);
        self.execute(AuditAction::AddMember, &format!("{}:{}", group, user), command)
    }

    pub fn remove_user_from_group(&self, user: &str, group: &str) -> Result<()> {
        validate_name(user)?;
        validate_name(group)?;
        let command = OsCommand::new("gpasswd").arg("-d").arg(user).arg(group);
        self.execute(
            AuditAction::RemoveMember,
            &format!("{}:{}", group, user),
            command,
        )
    }

    /// Users from the passwd database; system accounts only on request
    pub fn list_users(&self, include_system: bool) -> Result<Vec<PasswdEntry>> {
        let users = database::read_passwd(&self.passwd_file)?;
        Ok(users
            .into_iter()
            .filter(|u| include_system || is_regular_id(u.uid, self.min_uid))
            .collect())
    }

    /// Groups from the group database; system groups only on request
    pub fn list_groups(&self, include_system: bool) -> Result<Vec<GroupEntry>> {
        let groups = database::read_group(&self.group_file)?;
        Ok(groups
            .into_iter()
            .filter(|g| include_system || is_regular_id(g.gid, self.min_uid))
            .collect())
    }

    fn execute(&self, action: AuditAction, target: &str, command: OsCommand) -> Result<()> {
        let entry = AuditEntry::new(&self.host, action, target)
            .simulated(self.dry_run)
            .with_detail(command.to_string());

        if self.dry_run {
            tracing::debug!("Would run: {}", command);
            self.audit.record(&entry);
            return Ok(());
        }

        tracing::debug!("Running: {}", command);
        let result = self
            .runner
            .run(&command)
            .and_then(|output| output.check(&command.program));

        match result {
            Ok(_) => {
                self.audit.record(&entry);
                Ok(())
            }
            Err(e) => {
                self.audit.record(
                    &AuditEntry::new(&self.host, AuditAction::Failure, target)
                        .with_detail(e.to_string()),
                );
                Err(e)
            }
        }
    }
}

fn validate_groups(groups: &[String]) -> Result<()> {
    groups.iter().try_for_each(|g| validate_name(g))
}

fn validate_shell(shell: Option<&str>) -> Result<()> {
    match shell {
        Some(shell) if !shell.starts_with('/') || shell.contains(':') => Err(
            Error::invalid_argument(format!("shell must be an absolute path: '{}'", shell)),
        ),
        _ => Ok(()),
    }
}

fn validate_comment(comment: Option<&str>) -> Result<()> {
    match comment {
        Some(comment) if comment.contains([':', '\n']) => Err(Error::invalid_argument(
            "comment must not contain ':' or newlines",
        )),
        _ => Ok(()),
    }
}

fn join_groups(groups: &[String]) -> Option<String> {
    (!groups.is_empty()).then(|| groups.join(","))
}
