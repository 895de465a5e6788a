//! Read-only parsing of the passwd and group databases

use camino::Utf8Path;
use serde::Serialize;
use std::fs;

use crate::error::{Error, Result};

/// The overflow id (`nobody`/`nogroup`), never a regular account
pub const NOBODY_ID: u32 = 65534;

/// One `/etc/passwd` record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswdEntry {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub comment: String,
    pub home: String,
    pub shell: String,
}

/// One `/etc/group` record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupEntry {
    pub name: String,
    pub gid: u32,
    pub members: Vec<String>,
}

/// Whether an id belongs to a regular (human) account
pub fn is_regular_id(id: u32, min_id: u32) -> bool {
    id >= min_id && id != NOBODY_ID
}

/// Iterate over data lines, skipping blanks, comments and NIS markers
fn records(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim_end()))
        .filter(|(_, line)| {
            !line.is_empty() && !line.starts_with('#') && !line.starts_with(['+', '-'])
        })
}

/// Parse passwd content; malformed lines are logged and skipped
pub fn parse_passwd(content: &str) -> Vec<PasswdEntry> {
    records(content)
        .filter_map(|(line_no, line)| {
            let fields: Vec<&str> = line.split(':').collect();
            let parsed = match fields.as_slice() {
                [name, _, uid, gid, comment, home, shell] => uid
                    .parse()
                    .ok()
                    .zip(gid.parse().ok())
                    .map(|(uid, gid)| PasswdEntry {
                        name: name.to_string(),
                        uid,
                        gid,
                        comment: comment.to_string(),
                        home: home.to_string(),
                        shell: shell.to_string(),
                    }),
                _ => None,
            };
            if parsed.is_none() {
                tracing::warn!("Skipping malformed passwd line {}", line_no);
            }
            parsed
        })
        .collect()
}

/// Parse group content; malformed lines are logged and skipped
pub fn parse_group(content: &str) -> Vec<GroupEntry> {
    records(content)
        .filter_map(|(line_no, line)| {
            let fields: Vec<&str> = line.split(':').collect();
            let parsed = match fields.as_slice() {
                [name, _, gid, members] => gid.parse().ok().map(|gid| GroupEntry {
                    name: name.to_string(),
                    gid,
                    members: members
                        .split(',')
                        .filter(|m| !m.is_empty())
                        .map(str::to_string)
                        .collect(),
                }),
                _ => None,
            };
            if parsed.is_none() {
                tracing::warn!("Skipping malformed group line {}", line_no);
            }
            parsed
        })
        .collect()
}

fn read_database(path: &Utf8Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::Database {
        path: path.to_string(),
        source,
    })
}

pub fn read_passwd(path: &Utf8Path) -> Result<Vec<PasswdEntry>> {
    Ok(parse_passwd(&read_database(path)?))
}

pub fn read_group(path: &Utf8Path) -> Result<Vec<GroupEntry>> {
    Ok(parse_group(&read_database(path)?))
}
