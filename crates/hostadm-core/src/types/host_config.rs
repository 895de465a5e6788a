//! Host configuration types
//!
//! `HostConfig` is the single configuration value the CLI hands to the
//! backup engine and the account wrappers. Nothing in the libraries reads
//! process-wide state on its own.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Complete host configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct HostConfig {
    /// Host identifier override. Detected from the system when absent.
    #[serde(default)]
    pub host: Option<String>,

    /// Backup defaults
    #[serde(default)]
    pub backup: BackupDefaults,

    /// Audit log settings
    #[serde(default)]
    pub audit: AuditConfig,

    /// Account listing settings
    #[serde(default)]
    pub accounts: AccountsConfig,
}

/// Backup defaults applied when the CLI does not override them
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct BackupDefaults {
    /// Directory archives are written to
    #[serde(default = "default_dest")]
    pub default_dest: Utf8PathBuf,

    /// Number of archives to keep per source (0 disables pruning)
    #[serde(default)]
    pub retention: usize,

    /// Archiving strategy
    #[serde(default)]
    pub archiver: ArchiverKind,

    /// Gzip level for the native archiver (1-9)
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,

    /// Hold an advisory lock on the destination during real runs
    #[serde(default)]
    pub lock_destination: bool,
}

impl Default for BackupDefaults {
    fn default() -> Self {
        Self {
            default_dest: default_dest(),
            retention: 0,
            archiver: ArchiverKind::default(),
            compression_level: default_compression_level(),
            lock_destination: false,
        }
    }
}

fn default_dest() -> Utf8PathBuf {
    Utf8PathBuf::from("/var/backups")
}

fn default_compression_level() -> u32 {
    6
}

/// How archives are produced
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArchiverKind {
    /// In-process tar + gzip
    #[default]
    Native,
    /// External `tar -czf`
    Tar,
}

impl fmt::Display for ArchiverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiverKind::Native => write!(f, "native"),
            ArchiverKind::Tar => write!(f, "tar"),
        }
    }
}

impl FromStr for ArchiverKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(ArchiverKind::Native),
            "tar" => Ok(ArchiverKind::Tar),
            other => Err(Error::invalid_config(format!(
                "Unknown archiver '{}'. Valid archivers: native, tar",
                other
            ))),
        }
    }
}

/// Audit log settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct AuditConfig {
    /// Append-only JSON lines file. `None` keeps audit entries in the log stream only.
    #[serde(default = "default_audit_log")]
    pub log_file: Option<Utf8PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_file: default_audit_log(),
        }
    }
}

fn default_audit_log() -> Option<Utf8PathBuf> {
    Some(Utf8PathBuf::from("/var/log/hostadm/audit.jsonl"))
}

/// Account listing settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct AccountsConfig {
    /// Lowest uid/gid treated as a regular (non-system) account
    #[serde(default = "default_min_uid")]
    pub min_uid: u32,

    /// Location of the passwd database
    #[serde(default = "default_passwd_file")]
    pub passwd_file: Utf8PathBuf,

    /// Location of the group database
    #[serde(default = "default_group_file")]
    pub group_file: Utf8PathBuf,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            min_uid: default_min_uid(),
            passwd_file: default_passwd_file(),
            group_file: default_group_file(),
        }
    }
}

fn default_min_uid() -> u32 {
    1000
}

fn default_passwd_file() -> Utf8PathBuf {
    Utf8PathBuf::from("/etc/passwd")
}

fn default_group_file() -> Utf8PathBuf {
    Utf8PathBuf::from("/etc/group")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HostConfig::default();
        assert_eq!(config.host, None);
        assert_eq!(config.backup.default_dest, "/var/backups");
        assert_eq!(config.backup.retention, 0);
        assert_eq!(config.backup.archiver, ArchiverKind::Native);
        assert_eq!(config.backup.compression_level, 6);
        assert!(!config.backup.lock_destination);
        assert_eq!(config.accounts.min_uid, 1000);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
backup:
  retention: 5
  archiver: tar
"#;
        let config: HostConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.backup.retention, 5);
        assert_eq!(config.backup.archiver, ArchiverKind::Tar);
        assert_eq!(config.backup.default_dest, "/var/backups");
        assert_eq!(
            config.audit.log_file.as_deref(),
            Some(camino::Utf8Path::new("/var/log/hostadm/audit.jsonl"))
        );
    }

    #[test]
    fn test_yaml_paths() {
        let yaml = r#"
backup:
  default-dest: /srv/backups
audit:
  log-file: /tmp/audit.jsonl
accounts:
  passwd-file: /tmp/passwd
  group-file: /tmp/group
"#;
        let config: HostConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.backup.default_dest, "/srv/backups");
        assert_eq!(config.accounts.passwd_file, "/tmp/passwd");
        assert_eq!(config.accounts.group_file, "/tmp/group");

        let rendered = serde_yaml_ng::to_string(&config).unwrap();
        assert!(rendered.contains("log-file: /tmp/audit.jsonl"));
    }

    #[test]
    fn test_audit_log_can_be_disabled() {
        let config: HostConfig = serde_yaml_ng::from_str("audit:\n  log-file: null\n").unwrap();
        assert!(config.audit.log_file.is_none());
    }

    #[test]
    fn test_archiver_from_str() {
        assert_eq!("native".parse::<ArchiverKind>().unwrap(), ArchiverKind::Native);
        assert_eq!(" TAR ".parse::<ArchiverKind>().unwrap(), ArchiverKind::Tar);
        assert!("zip".parse::<ArchiverKind>().is_err());
    }
}
