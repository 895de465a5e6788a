//! User account commands

use anyhow::Result;
use camino::Utf8Path;
use hostadm_accounts::{PasswdEntry, UserChanges, UserOptions};
use tabled::{settings::Style, Table, Tabled};

use super::{account_manager, ensure_root, report_mutation, CommandStatus};
use crate::cli::{ListArgs, UserAddArgs, UserCommands, UserDelArgs, UserModArgs};
use crate::output;

pub fn run(cmd: UserCommands, config_path: Option<&Utf8Path>) -> Result<CommandStatus> {
    match cmd {
        UserCommands::Add(args) => add(args, config_path),
        UserCommands::Del(args) => delete(args, config_path),
        UserCommands::Mod(args) => modify(args, config_path),
        UserCommands::List(args) => list(args, config_path),
    }
}

fn add(args: UserAddArgs, config_path: Option<&Utf8Path>) -> Result<CommandStatus> {
    let accounts = account_manager(config_path, args.mutation.dry_run)?;
    ensure_root(&accounts)?;

    let options = UserOptions {
        shell: args.shell,
        home: args.home,
        comment: args.comment,
        groups: args.groups,
        system: args.system,
        create_home: !args.no_create_home,
    };
    accounts.add_user(&args.name, &options)?;

    report_mutation(&accounts, &format!("User '{}' added", args.name));
    Ok(CommandStatus::Success)
}

fn delete(args: UserDelArgs, config_path: Option<&Utf8Path>) -> Result<CommandStatus> {
    let accounts = account_manager(config_path, args.mutation.dry_run)?;
    ensure_root(&accounts)?;

    accounts.delete_user(&args.name, args.remove_home)?;

    report_mutation(&accounts, &format!("User '{}' deleted", args.name));
    Ok(CommandStatus::Success)
}

fn modify(args: UserModArgs, config_path: Option<&Utf8Path>) -> Result<CommandStatus> {
    let accounts = account_manager(config_path, args.mutation.dry_run)?;

    let changes = UserChanges {
        shell: args.shell,
        comment: args.comment,
        append_groups: args.append_groups,
        lock: args.lock,
        unlock: args.unlock,
    };
    // Reject an empty change set before asking for privileges
    if changes.is_empty() {
        anyhow::bail!(
            "Nothing to change for user '{}' (use --shell, --comment, --append-groups, --lock or --unlock)",
            args.name
        );
    }

    ensure_root(&accounts)?;
    accounts.modify_user(&args.name, &changes)?;

    report_mutation(&accounts, &format!("User '{}' modified", args.name));
    Ok(CommandStatus::Success)
}

#[derive(Tabled)]
struct UserRow {
    name: String,
    uid: u32,
    gid: u32,
    home: String,
    shell: String,
}

impl From<&PasswdEntry> for UserRow {
    fn from(entry: &PasswdEntry) -> Self {
        Self {
            name: entry.name.clone(),
            uid: entry.uid,
            gid: entry.gid,
            home: entry.home.clone(),
            shell: entry.shell.clone(),
        }
    }
}

fn list(args: ListArgs, config_path: Option<&Utf8Path>) -> Result<CommandStatus> {
    let accounts = account_manager(config_path, false)?;
    let users = accounts.list_users(args.all)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&users)?);
        return Ok(CommandStatus::Success);
    }

    if users.is_empty() {
        output::info("No users found");
        return Ok(CommandStatus::Success);
    }

    let mut table = Table::new(users.iter().map(UserRow::from));
    table.with(Style::sharp());
    println!("{}", table);

    Ok(CommandStatus::Success)
}
