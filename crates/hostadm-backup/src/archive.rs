//! Archiving collaborators
//!
//! An [`Archiver`] compresses a directory tree into a single file whose only
//! top-level entry is the directory's own name. Two implementations are
//! provided: [`NativeArchiver`] streams tar + gzip in-process, and
//! [`TarCommand`] shells out to the system `tar`.

use flate2::write::GzEncoder;
use flate2::Compression;
use hostadm_core::ArchiverKind;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tar::Builder as TarBuilder;
use walkdir::WalkDir;

/// Default compression level (6 = balanced speed/ratio).
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// The directory being archived
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    /// Canonical path of the directory
    pub root: PathBuf,

    /// Name of the single top-level entry inside the archive
    pub top_level: String,
}

impl SourceTree {
    /// Arguments for `tar` that reproduce this tree under `top_level`
    ///
    /// The common case is `-C <parent> <name>`. When the directory's real
    /// name differs from `top_level` (a symlinked or renamed source), tar is
    /// run inside the directory and `.` is rewritten to `top_level`; link
    /// targets are left alone.
    fn tar_args(&self, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-czf".into(), output.into()];
        match (self.root.parent(), self.root.file_name()) {
            (Some(parent), Some(name)) if name.to_string_lossy() == self.top_level => {
                args.extend(["-C".into(), parent.into(), name.to_os_string()]);
            }
            _ => {
                let transform = format!("s,^\\.,{},S", escape_replacement(&self.top_level));
                args.extend([
                    "-C".into(),
                    self.root.clone().into_os_string(),
                    "--transform".into(),
                    transform.into(),
                    ".".into(),
                ]);
            }
        }
        args
    }
}

/// Escape a sed replacement for a `,`-delimited expression
fn escape_replacement(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | ',' | '&') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Quote an argument for display in a POSIX shell
fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=+,@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

/// Failure reported by an archiver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveToolError {
    /// Exit status of an external tool, if one ran
    pub status: Option<i32>,
    pub message: String,
}

impl ArchiveToolError {
    fn io(context: &str, err: std::io::Error) -> Self {
        Self {
            status: None,
            message: format!("{}: {}", context, err),
        }
    }
}

/// Compresses a directory tree into a single named file
pub trait Archiver: Send + Sync {
    /// Write an archive of `source` to `output`
    fn archive(&self, source: &SourceTree, output: &Path) -> Result<(), ArchiveToolError>;

    /// Shell command equivalent to [`Archiver::archive`], used for dry runs
    fn describe(&self, source: &SourceTree, output: &Path) -> String {
        let mut command = String::from("tar");
        for arg in source.tar_args(output) {
            command.push(' ');
            command.push_str(&shell_quote(&arg.to_string_lossy()));
        }
        command
    }
}

/// Build the archiver selected in configuration
pub fn for_kind(kind: ArchiverKind, compression_level: u32) -> Box<dyn Archiver> {
    match kind {
        ArchiverKind::Native => Box::new(NativeArchiver::new(compression_level)),
        ArchiverKind::Tar => Box::new(TarCommand::new()),
    }
}

/// In-process tar + gzip archiver
#[derive(Debug, Clone)]
pub struct NativeArchiver {
    compression_level: u32,
}

impl NativeArchiver {
    pub fn new(compression_level: u32) -> Self {
        Self {
            compression_level: compression_level.clamp(1, 9),
        }
    }

    pub fn compression_level(&self) -> u32 {
        self.compression_level
    }

    fn write_archive(&self, source: &SourceTree, output: &Path) -> Result<usize, ArchiveToolError> {
        let file = File::create(output)
            .map_err(|e| ArchiveToolError::io("Failed to create archive file", e))?;
        let encoder = GzEncoder::new(
            BufWriter::new(file),
            Compression::new(self.compression_level),
        );
        let mut tar = TarBuilder::new(encoder);
        tar.follow_symlinks(false);

        let top_level = Path::new(&source.top_level);
        let mut entry_count = 0;

        for entry in WalkDir::new(&source.root).follow_links(false) {
            let entry = entry.map_err(|e| ArchiveToolError {
                status: None,
                message: format!("Failed to walk directory: {}", e),
            })?;

            let rel_path = entry
                .path()
                .strip_prefix(&source.root)
                .map_err(|e| ArchiveToolError {
                    status: None,
                    message: format!("Failed to compute relative path: {}", e),
                })?;
            let name = top_level.join(rel_path);
            let file_type = entry.file_type();

            let appended = if file_type.is_dir() {
                tar.append_dir(&name, entry.path())
            } else if file_type.is_file() || file_type.is_symlink() {
                tar.append_path_with_name(entry.path(), &name)
            } else {
                tracing::debug!("Skipping special file: {:?}", entry.path());
                continue;
            };
            appended.map_err(|e| {
                ArchiveToolError::io(&format!("Failed to add {}", entry.path().display()), e)
            })?;

            entry_count += 1;
        }

        let encoder = tar
            .into_inner()
            .map_err(|e| ArchiveToolError::io("Failed to finish tar stream", e))?;
        let mut writer = encoder
            .finish()
            .map_err(|e| ArchiveToolError::io("Failed to finish gzip stream", e))?;
        writer
            .flush()
            .map_err(|e| ArchiveToolError::io("Failed to flush archive", e))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|e| ArchiveToolError::io("Failed to sync archive", e))?;

        Ok(entry_count)
    }
}

impl Default for NativeArchiver {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl Archiver for NativeArchiver {
    fn archive(&self, source: &SourceTree, output: &Path) -> Result<(), ArchiveToolError> {
        let entries = self.write_archive(source, output)?;
        tracing::debug!(
            "Archived {} entries from {} into {}",
            entries,
            source.root.display(),
            output.display()
        );
        Ok(())
    }
}

/// External `tar -czf` archiver
#[derive(Debug, Clone)]
pub struct TarCommand {
    program: PathBuf,
}

impl TarCommand {
    /// Use the `tar` found on PATH
    pub fn new() -> Self {
        let program = which::which("tar").unwrap_or_else(|_| PathBuf::from("tar"));
        Self { program }
    }

    /// Use a specific executable
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for TarCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl Archiver for TarCommand {
    fn archive(&self, source: &SourceTree, output: &Path) -> Result<(), ArchiveToolError> {
        let result = Command::new(&self.program)
            .args(source.tar_args(output))
            .output()
            .map_err(|e| {
                ArchiveToolError::io(&format!("Failed to run {}", self.program.display()), e)
            })?;

        if result.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            match result.status.code() {
                Some(_) => format!("{} exited unsuccessfully", self.program.display()),
                None => format!("{} was terminated by a signal", self.program.display()),
            }
        } else {
            stderr
        };

        Err(ArchiveToolError {
            status: result.status.code(),
            message,
        })
    }
}
