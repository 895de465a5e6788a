//! User and group name validation

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Error, Result};

/// Longest name accepted by the shadow-utils tools
pub const MAX_NAME_LEN: usize = 32;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_-]*\$?$").expect("name regex is valid"));

/// Check a user or group name before it reaches an OS command
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_name(name, "must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(Error::invalid_name(
            name,
            format!("must be at most {} characters", MAX_NAME_LEN),
        ));
    }
    if !NAME_RE.is_match(name) {
        return Err(Error::invalid_name(
            name,
            "must start with a lowercase letter or '_' and contain only lowercase letters, digits, '_' or '-' (optionally ending in '$')",
        ));
    }
    Ok(())
}
