//! # hostadm-accounts
//!
//! Local user and group management for hostadm. Every operation validates
//! its arguments and delegates to one shadow-utils command (`useradd`,
//! `userdel`, `usermod`, `groupadd`, `groupdel`, `gpasswd`). Listings are
//! read directly from the passwd and group databases.
//!
//! ```no_run
//! use hostadm_accounts::{AccountManager, UserOptions};
//!
//! fn main() -> Result<(), hostadm_accounts::Error> {
//!     let accounts = AccountManager::new("web01");
//!     accounts.require_root()?;
//!     accounts.add_user(
//!         "alice",
//!         &UserOptions {
//!             create_home: true,
//!             shell: Some("/bin/bash".into()),
//!             ..Default::default()
//!         },
//!     )?;
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod database;
pub mod error;
pub mod manager;
pub mod names;

pub use command::{CommandOutput, CommandRunner, OsCommand, SystemRunner};
pub use database::{GroupEntry, PasswdEntry};
pub use error::{Error, Result};
pub use manager::{AccountManager, UserChanges, UserOptions};
pub use names::validate_name;
