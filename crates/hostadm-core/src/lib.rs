//! # hostadm-core
//!
//! Core library for the hostadm CLI providing:
//! - Layered configuration loading (defaults, YAML file, environment)
//! - Shared configuration types
//! - Host identity helpers
//! - Audit trail sinks

pub mod audit;
pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use audit::{AuditAction, AuditEntry, AuditSink, JsonlAuditLog, MemoryAudit, TracingAudit};
pub use config::ConfigLoader;
pub use error::{Error, Result};
pub use types::{ArchiverKind, HostConfig};
pub use utils::detect_hostname;
