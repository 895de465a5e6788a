//! Group commands

use anyhow::Result;
use camino::Utf8Path;
use hostadm_accounts::GroupEntry;
use tabled::{settings::Style, Table, Tabled};

use super::{account_manager, ensure_root, report_mutation, CommandStatus};
use crate::cli::{GroupAddArgs, GroupCommands, GroupDelArgs, ListArgs, MemberArgs};
use crate::output;

pub fn run(cmd: GroupCommands, config_path: Option<&Utf8Path>) -> Result<CommandStatus> {
    match cmd {
        GroupCommands::Add(args) => add(args, config_path),
        GroupCommands::Del(args) => delete(args, config_path),
        GroupCommands::List(args) => list(args, config_path),
        GroupCommands::AddMember(args) => add_member(args, config_path),
        GroupCommands::RemoveMember(args) => remove_member(args, config_path),
    }
}

fn add(args: GroupAddArgs, config_path: Option<&Utf8Path>) -> Result<CommandStatus> {
    let accounts = account_manager(config_path, args.mutation.dry_run)?;
    ensure_root(&accounts)?;

    accounts.add_group(&args.name, args.system)?;

    report_mutation(&accounts, &format!("Group '{}' added", args.name));
    Ok(CommandStatus::Success)
}

fn delete(args: GroupDelArgs, config_path: Option<&Utf8Path>) -> Result<CommandStatus> {
    let accounts = account_manager(config_path, args.mutation.dry_run)?;
    ensure_root(&accounts)?;

    accounts.delete_group(&args.name)?;

    report_mutation(&accounts, &format!("Group '{}' deleted", args.name));
    Ok(CommandStatus::Success)
}

fn add_member(args: MemberArgs, config_path: Option<&Utf8Path>) -> Result<CommandStatus> {
    let accounts = account_manager(config_path, args.mutation.dry_run)?;
    ensure_root(&accounts)?;

    accounts.add_user_to_group(&args.user, &args.group)?;

    report_mutation(
        &accounts,
        &format!("User '{}' added to group '{}'", args.user, args.group),
    );
    Ok(CommandStatus::Success)
}

fn remove_member(args: MemberArgs, config_path: Option<&Utf8Path>) -> Result<CommandStatus> {
    let accounts = account_manager(config_path, args.mutation.dry_run)?;
    ensure_root(&accounts)?;

    accounts.remove_user_from_group(&args.user, &args.group)?;

    report_mutation(
        &accounts,
        &format!("User '{}' removed from group '{}'", args.user, args.group),
    );
    Ok(CommandStatus::Success)
}

#[derive(Tabled)]
struct GroupRow {
    name: String,
    gid: u32,
    members: String,
}

impl From<&GroupEntry> for GroupRow {
    fn from(entry: &GroupEntry) -> Self {
        Self {
            name: entry.name.clone(),
            gid: entry.gid,
            members: entry.members.join(","),
        }
    }
}

fn list(args: ListArgs, config_path: Option<&Utf8Path>) -> Result<CommandStatus> {
    let accounts = account_manager(config_path, false)?;
    let groups = accounts.list_groups(args.all)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(CommandStatus::Success);
    }

    if groups.is_empty() {
        output::info("No groups found");
        return Ok(CommandStatus::Success);
    }

    let mut table = Table::new(groups.iter().map(GroupRow::from));
    table.with(Style::sharp());
    println!("{}", table);

    Ok(CommandStatus::Success)
}
