//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

// Re-export command types for convenience
pub use crate::commands::backup::BackupArgs;

/// hostadm - host-local backups and account management
#[derive(Parser, Debug)]
#[command(name = "hostadm")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to config file [default: /etc/hostadm/config.yaml]
    #[arg(long, global = true, env = "HOSTADM_CONFIG")]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Archive a directory and prune older archives
    Backup(BackupArgs),

    /// User account management
    #[command(subcommand)]
    User(UserCommands),

    /// Group management
    #[command(subcommand)]
    Group(GroupCommands),
}

/// Options shared by every mutating account command
#[derive(Args, Debug, Clone, Copy)]
pub struct MutationArgs {
    /// Show the command that would run without running it
    #[arg(long)]
    pub dry_run: bool,
}

// User commands
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Create a user
    Add(UserAddArgs),

    /// Delete a user
    #[command(alias = "delete")]
    Del(UserDelArgs),

    /// Modify a user
    Mod(UserModArgs),

    /// List users
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct UserAddArgs {
    /// Login name
    pub name: String,

    /// Login shell
    #[arg(short, long)]
    pub shell: Option<String>,

    /// Home directory
    #[arg(short = 'd', long)]
    pub home: Option<Utf8PathBuf>,

    /// Full name or other comment (GECOS)
    #[arg(short, long)]
    pub comment: Option<String>,

    /// Supplementary groups (comma-separated or repeated)
    #[arg(short = 'G', long, value_delimiter = ',')]
    pub groups: Vec<String>,

    /// Create a system account
    #[arg(short = 'r', long)]
    pub system: bool,

    /// Do not create the home directory
    #[arg(long)]
    pub no_create_home: bool,

    #[command(flatten)]
    pub mutation: MutationArgs,
}

#[derive(Args, Debug)]
pub struct UserDelArgs {
    /// Login name
    pub name: String,

    /// Remove the home directory and mail spool
    #[arg(short, long)]
    pub remove_home: bool,

    #[command(flatten)]
    pub mutation: MutationArgs,
}

#[derive(Args, Debug)]
pub struct UserModArgs {
    /// Login name
    pub name: String,

    /// New login shell
    #[arg(short, long)]
    pub shell: Option<String>,

    /// New comment (GECOS)
    #[arg(short, long)]
    pub comment: Option<String>,

    /// Add the user to these groups (comma-separated or repeated)
    #[arg(short = 'G', long = "append-groups", value_delimiter = ',')]
    pub append_groups: Vec<String>,

    /// Lock the password
    #[arg(short = 'L', long, conflicts_with = "unlock")]
    pub lock: bool,

    /// Unlock the password
    #[arg(short = 'U', long)]
    pub unlock: bool,

    #[command(flatten)]
    pub mutation: MutationArgs,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Include system accounts (id below the configured minimum, and nobody)
    #[arg(short, long)]
    pub all: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Group commands
#[derive(Subcommand, Debug)]
pub enum GroupCommands {
    /// Create a group
    Add(GroupAddArgs),

    /// Delete a group
    #[command(alias = "delete")]
    Del(GroupDelArgs),

    /// List groups
    List(ListArgs),

    /// Add a user to a group
    AddMember(MemberArgs),

    /// Remove a user from a group
    RemoveMember(MemberArgs),
}

#[derive(Args, Debug)]
pub struct GroupAddArgs {
    /// Group name
    pub name: String,

    /// Create a system group
    #[arg(short = 'r', long)]
    pub system: bool,

    #[command(flatten)]
    pub mutation: MutationArgs,
}

#[derive(Args, Debug)]
pub struct GroupDelArgs {
    /// Group name
    pub name: String,

    #[command(flatten)]
    pub mutation: MutationArgs,
}

#[derive(Args, Debug)]
pub struct MemberArgs {
    /// Group name
    pub group: String,

    /// Login name
    pub user: String,

    #[command(flatten)]
    pub mutation: MutationArgs,
}
