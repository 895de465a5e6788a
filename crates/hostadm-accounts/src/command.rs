//! OS command execution seam
//!
//! Account operations build an [`OsCommand`] and hand it to a
//! [`CommandRunner`]. The system runner spawns the program; tests substitute
//! a recording runner.

use std::fmt;
use std::process::Command;

use crate::error::{Error, Result};

/// A program invocation with its argument vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl OsCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append `flag value` when `value` is present
    pub fn opt(self, flag: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.arg(flag).arg(value),
            None => self,
        }
    }

    /// Append `flag` when `enabled`
    pub fn flag(self, flag: &str, enabled: bool) -> Self {
        if enabled {
            self.arg(flag)
        } else {
            self
        }
    }
}

impl fmt::Display for OsCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg.replace('\'', r"'\''"))?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when terminated by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Turn a non-zero exit into [`Error::CommandFailed`]
    pub fn check(self, program: &str) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::command_failed(
                program,
                self.status,
                self.stderr.trim(),
            ))
        }
    }
}

/// Runs OS commands
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion. Spawn failures are errors; a non-zero
    /// exit is reported through [`CommandOutput::status`].
    fn run(&self, command: &OsCommand) -> Result<CommandOutput>;
}

/// Runner backed by `std::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &OsCommand) -> Result<CommandOutput> {
        tracing::debug!("Running: {}", command);

        let output = Command::new(&command.program)
            .args(&command.args)
            .output()
            .map_err(|source| Error::CommandSpawn {
                program: command.program.clone(),
                source,
            })?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_helpers() {
        let cmd = OsCommand::new("useradd")
            .flag("-m", true)
            .flag("-r", false)
            .opt("-s", Some("/bin/bash"))
            .opt("-d", None)
            .arg("alice");
        assert_eq!(cmd.args, vec!["-m", "-s", "/bin/bash", "alice"]);
    }

    #[test]
    fn test_display_quotes_whitespace() {
        let cmd = OsCommand::new("usermod")
            .opt("-c", Some("Alice O'Neil"))
            .arg("alice");
        assert_eq!(cmd.to_string(), r"usermod -c 'Alice O'\''Neil' alice");
    }

    #[test]
    fn test_check_maps_failure() {
        let output = CommandOutput {
            status: Some(6),
            stdout: String::new(),
            stderr: "groupdel: group 'ops' does not exist\n".to_string(),
        };
        match output.check("groupdel").unwrap_err() {
            Error::CommandFailed {
                program,
                status,
                stderr,
            } => {
                assert_eq!(program, "groupdel");
                assert_eq!(status, Some(6));
                assert_eq!(stderr, "groupdel: group 'ops' does not exist");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_system_runner_captures_output() {
        let output = SystemRunner
            .run(&OsCommand::new("sh").arg("-c").arg("echo out; echo err >&2; exit 3"))
            .unwrap();
        assert_eq!(output.status, Some(3));
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[test]
    fn test_system_runner_missing_program() {
        let err = SystemRunner
            .run(&OsCommand::new("/nonexistent/hostadm-test-program"))
            .unwrap_err();
        assert!(matches!(err, Error::CommandSpawn { .. }));
    }
}
