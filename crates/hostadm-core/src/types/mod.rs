//! Type definitions for hostadm configuration

mod host_config;

pub use host_config::*;
