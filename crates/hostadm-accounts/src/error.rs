//! Error types for account management

use std::io;
use thiserror::Error;

/// Result type alias for account operations
pub type Result<T> = std::result::Result<T, Error>;

/// Account management errors
#[derive(Error, Debug)]
pub enum Error {
    /// User or group name rejected before any command ran
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The OS tool ran and exited unsuccessfully
    #[error("{program} failed{}: {stderr}", status_suffix(.status))]
    CommandFailed {
        program: String,
        status: Option<i32>,
        stderr: String,
    },

    /// The OS tool could not be started at all
    #[error("Failed to run {program}: {source}")]
    CommandSpawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Failed to read {path}: {source}")]
    Database {
        path: String,
        #[source]
        source: io::Error,
    },
}

fn status_suffix(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!(" (exit status {})", code),
        None => " (terminated by signal)".to_string(),
    }
}

impl Error {
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn command_failed(
        program: impl Into<String>,
        status: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            program: program.into(),
            status,
            stderr: stderr.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display() {
        let err = Error::command_failed("useradd", Some(9), "user 'alice' already exists");
        assert_eq!(
            err.to_string(),
            "useradd failed (exit status 9): user 'alice' already exists"
        );

        let err = Error::command_failed("userdel", None, "");
        assert!(err.to_string().contains("terminated by signal"));
    }

    #[test]
    fn test_invalid_name_display() {
        let err = Error::invalid_name("Bob", "must start with a lowercase letter or underscore");
        assert!(err.to_string().starts_with("Invalid name 'Bob'"));
    }
}
