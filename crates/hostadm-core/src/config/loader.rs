//! Layered configuration loader
//!
//! Loads configuration from multiple sources with the following precedence (low to high):
//! 1. Built-in defaults
//! 2. Config file (`--config`, `HOSTADM_CONFIG`, or /etc/hostadm/config.yaml)
//! 3. Environment variables (HOSTADM_* prefix)
//! 4. CLI flags (handled by caller)

use crate::error::{Error, Result};
use crate::types::HostConfig;
use camino::{Utf8Path, Utf8PathBuf};
use std::env;
use std::fs;

/// System-wide configuration file
pub const SYSTEM_CONFIG_PATH: &str = "/etc/hostadm/config.yaml";

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "HOSTADM_CONFIG";

/// Configuration loader
pub struct ConfigLoader {
    /// Explicitly requested config file, if any
    explicit_path: Option<Utf8PathBuf>,

    /// Fallback file consulted when no explicit path is given
    default_path: Utf8PathBuf,
}

impl ConfigLoader {
    /// Create a loader that honours `explicit_path` or falls back to the system file
    pub fn new(explicit_path: Option<Utf8PathBuf>) -> Self {
        Self {
            explicit_path,
            default_path: Utf8PathBuf::from(SYSTEM_CONFIG_PATH),
        }
    }

    /// Create a loader with a custom fallback location
    pub fn with_default_path(mut self, default_path: Utf8PathBuf) -> Self {
        self.default_path = default_path;
        self
    }

    /// Resolve which file to read. An explicit path must exist; the
    /// fallback is optional.
    fn resolve_path(&self) -> Result<Option<Utf8PathBuf>> {
        let explicit = self
            .explicit_path
            .clone()
            .or_else(|| env::var(CONFIG_ENV_VAR).ok().map(Utf8PathBuf::from));

        match explicit {
            Some(path) if path.exists() => Ok(Some(path)),
            Some(path) => Err(Error::config_not_found(path.as_str())),
            None if self.default_path.exists() => Ok(Some(self.default_path.clone())),
            None => Ok(None),
        }
    }

    /// Load configuration with layered precedence
    pub fn load(&self) -> Result<HostConfig> {
        let mut config = match self.resolve_path()? {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path);
                Self::load_yaml_file(&path)?
            }
            None => {
                tracing::debug!("No configuration file found, using defaults");
                HostConfig::default()
            }
        };

        config = Self::apply_env_overrides(config)?;
        Self::validate(&config)?;

        Ok(config)
    }

    /// Load a YAML file and parse it
    fn load_yaml_file(path: &Utf8Path) -> Result<HostConfig> {
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(HostConfig::default());
        }
        serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut config: HostConfig) -> Result<HostConfig> {
        if let Ok(val) = env::var("HOSTADM_HOST") {
            if !val.trim().is_empty() {
                config.host = Some(val.trim().to_string());
            }
        }

        if let Ok(val) = env::var("HOSTADM_BACKUP_DEST") {
            config.backup.default_dest = Utf8PathBuf::from(val);
        }

        if let Ok(val) = env::var("HOSTADM_BACKUP_RETENTION") {
            config.backup.retention = val.trim().parse().map_err(|_| {
                Error::invalid_config("HOSTADM_BACKUP_RETENTION must be a non-negative number")
            })?;
        }

        if let Ok(val) = env::var("HOSTADM_ARCHIVER") {
            config.backup.archiver = val.parse()?;
        }

        if let Ok(val) = env::var("HOSTADM_AUDIT_LOG") {
            config.audit.log_file = if val.is_empty() || val == "none" {
                None
            } else {
                Some(Utf8PathBuf::from(val))
            };
        }

        Ok(config)
    }

    fn validate(config: &HostConfig) -> Result<()> {
        let level = config.backup.compression_level;
        if !(1..=9).contains(&level) {
            return Err(Error::invalid_config(format!(
                "backup.compression-level must be 1-9, got {}",
                level
            )));
        }

        if let Some(host) = &config.host {
            if host.is_empty() || host.contains('/') {
                return Err(Error::invalid_config(format!(
                    "host '{}' must be non-empty and contain no path separators",
                    host
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArchiverKind;
    use serial_test::serial;
    use tempfile::TempDir;

    const ENV_VARS: &[&str] = &[
        CONFIG_ENV_VAR,
        "HOSTADM_HOST",
        "HOSTADM_BACKUP_DEST",
        "HOSTADM_BACKUP_RETENTION",
        "HOSTADM_ARCHIVER",
        "HOSTADM_AUDIT_LOG",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            env::remove_var(var);
        }
    }

    fn utf8(path: std::path::PathBuf) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(path).expect("Invalid UTF-8 path")
    }

    fn loader_without_system_file(temp: &TempDir) -> ConfigLoader {
        ConfigLoader::new(None).with_default_path(utf8(temp.path().join("absent.yaml")))
    }

    #[test]
    #[serial]
    fn test_defaults_when_no_file() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let config = loader_without_system_file(&temp).load().unwrap();
        assert_eq!(config, HostConfig::default());
    }

    #[test]
    #[serial]
    fn test_load_from_explicit_file() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let path = utf8(temp.path().join("hostadm.yaml"));
        fs::write(
            &path,
            r#"
host: build-01
backup:
  default-dest: /srv/backups
  retention: 3
  lock-destination: true
"#,
        )
        .unwrap();

        let config = ConfigLoader::new(Some(path)).load().unwrap();
        assert_eq!(config.host.as_deref(), Some("build-01"));
        assert_eq!(config.backup.default_dest, "/srv/backups");
        assert_eq!(config.backup.retention, 3);
        assert!(config.backup.lock_destination);
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file_is_error() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let path = utf8(temp.path().join("nope.yaml"));
        let err = ConfigLoader::new(Some(path)).load().unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        let temp = TempDir::new().unwrap();

        env::set_var("HOSTADM_HOST", "env-host");
        env::set_var("HOSTADM_BACKUP_DEST", "/tmp/env-dest");
        env::set_var("HOSTADM_BACKUP_RETENTION", "4");
        env::set_var("HOSTADM_ARCHIVER", "tar");
        env::set_var("HOSTADM_AUDIT_LOG", "none");

        let config = loader_without_system_file(&temp).load().unwrap();
        assert_eq!(config.host.as_deref(), Some("env-host"));
        assert_eq!(config.backup.default_dest, "/tmp/env-dest");
        assert_eq!(config.backup.retention, 4);
        assert_eq!(config.backup.archiver, ArchiverKind::Tar);
        assert!(config.audit.log_file.is_none());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_retention_env() {
        clear_env();
        let temp = TempDir::new().unwrap();
        env::set_var("HOSTADM_BACKUP_RETENTION", "-1");

        let err = loader_without_system_file(&temp).load().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_compression_level_validated() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let path = utf8(temp.path().join("hostadm.yaml"));
        fs::write(&path, "backup:\n  compression-level: 12\n").unwrap();

        let err = ConfigLoader::new(Some(path)).load().unwrap_err();
        assert!(err.to_string().contains("compression-level"));
    }

    #[test]
    #[serial]
    fn test_empty_file_yields_defaults() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let path = utf8(temp.path().join("hostadm.yaml"));
        fs::write(&path, "\n").unwrap();

        let config = ConfigLoader::new(Some(path)).load().unwrap();
        assert_eq!(config, HostConfig::default());
    }
}
