//! Shared utility functions for hostadm crates

use std::fs;

/// Fallback when no host name can be determined
pub const UNKNOWN_HOST: &str = "unknown";

/// Detect the host name of this machine
///
/// Checks, in order, the HOSTNAME environment variable, /etc/hostname and
/// /proc/sys/kernel/hostname. Only the first label is kept so archive
/// names stay short on hosts configured with a fully qualified name.
pub fn detect_hostname() -> String {
    let candidates = [
        std::env::var("HOSTNAME").ok(),
        fs::read_to_string("/etc/hostname").ok(),
        fs::read_to_string("/proc/sys/kernel/hostname").ok(),
    ];

    candidates
        .into_iter()
        .flatten()
        .map(|raw| short_hostname(&raw))
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_HOST.to_string())
}

/// Trim whitespace and strip the domain part of a host name
pub fn short_hostname(raw: &str) -> String {
    raw.trim()
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string()
}
