//! Configuration loading

mod loader;

pub use loader::{ConfigLoader, CONFIG_ENV_VAR, SYSTEM_CONFIG_PATH};
