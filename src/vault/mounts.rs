//! Mount-table lookups used to decide whether a directory is a live mount.

use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::{Captures, Regex};
use tracing::debug;

use super::command::{is_binary_available, run_command};

const DEFAULT_MOUNTINFO_PATH: &str = "/proc/self/mountinfo";
const DEFAULT_PROC_MOUNTS_PATH: &str = "/proc/mounts";
const MOUNTINFO_TARGET_FIELD: usize = 4;
const PROC_MOUNTS_TARGET_FIELD: usize = 1;

static OCTAL_ESCAPE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\([0-7]{3})")
        .unwrap_or_else(|error| panic!("octal escape pattern must compile: {error}"))
});

/// Sources consulted, in order, when checking mount state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountTable {
    findmnt_binary: Option<String>,
    mountinfo_path: PathBuf,
    proc_mounts_path: PathBuf,
}

impl MountTable {
    /// Uses `findmnt` from `PATH` and the kernel proc files.
    pub fn new() -> Self {
        Self::with_findmnt("findmnt")
    }

    /// Uses a custom `findmnt` binary and the kernel proc files.
    pub fn with_findmnt(findmnt_binary: impl Into<String>) -> Self {
        Self::with_sources(
            Some(findmnt_binary.into()),
            DEFAULT_MOUNTINFO_PATH,
            DEFAULT_PROC_MOUNTS_PATH,
        )
    }

    /// Uses custom sources. `None` skips the `findmnt` query.
    pub fn with_sources(
        findmnt_binary: Option<String>,
        mountinfo_path: impl Into<PathBuf>,
        proc_mounts_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            findmnt_binary,
            mountinfo_path: mountinfo_path.into(),
            proc_mounts_path: proc_mounts_path.into(),
        }
    }

    /// Returns `true` when `mount_point` appears as a mount target.
    pub fn is_mounted(&self, mount_point: &Path) -> bool {
        let target = normalize_mount_path(mount_point);

        if let Some(findmnt) = self.findmnt_binary.as_deref() {
            if is_binary_available(findmnt) && self.findmnt_reports(findmnt, &target) {
                return true;
            }
        }

        if let Ok(raw) = fs::read_to_string(&self.mountinfo_path) {
            if contains_target(parse_mountinfo_targets(&raw), &target) {
                return true;
            }
        }

        match fs::read_to_string(&self.proc_mounts_path) {
            Ok(raw) => contains_target(parse_proc_mounts_targets(&raw), &target),
            Err(_) => false,
        }
    }

    fn findmnt_reports(&self, findmnt: &str, target: &Path) -> bool {
        let args = [
            OsStr::new("-rno"),
            OsStr::new("TARGET"),
            OsStr::new("--target"),
            target.as_os_str(),
        ];
        match run_command(findmnt, args, b"") {
            Ok(output) if output.success() => output
                .stdout
                .lines()
                .filter(|line| !line.trim().is_empty())
                .any(|line| normalize_mount_path(Path::new(line)) == target),
            Ok(_) => false,
            Err(error) => {
                debug!("findmnt query failed: {error}");
                false
            }
        }
    }
}

impl Default for MountTable {
    fn default() -> Self {
        Self::new()
    }
}

fn contains_target(targets: Vec<String>, target: &Path) -> bool {
    targets
        .iter()
        .any(|candidate| normalize_mount_path(Path::new(candidate)) == target)
}

/// Resolves symlinks where possible and drops a trailing `/`.
pub fn normalize_mount_path(path: &Path) -> PathBuf {
    let resolved = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let text = resolved.to_string_lossy();
    let trimmed = text.trim_end_matches('/');
    if trimmed.is_empty() {
        return PathBuf::from("/");
    }
    PathBuf::from(trimmed)
}

/// Decodes `\NNN` octal escapes used by the kernel mount tables.
pub fn unescape_mount_path(raw: &str) -> String {
    OCTAL_ESCAPE_PATTERN
        .replace_all(raw, |captures: &Captures<'_>| {
            u32::from_str_radix(&captures[1], 8)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| captures[0].to_owned())
        })
        .into_owned()
}

/// Mount targets from `/proc/self/mountinfo` text.
pub fn parse_mountinfo_targets(raw: &str) -> Vec<String> {
    parse_targets(raw, MOUNTINFO_TARGET_FIELD)
}

/// Mount targets from `/proc/mounts` text.
pub fn parse_proc_mounts_targets(raw: &str) -> Vec<String> {
    parse_targets(raw, PROC_MOUNTS_TARGET_FIELD)
}

fn parse_targets(raw: &str, field_index: usize) -> Vec<String> {
    raw.lines()
        .filter_map(|line| line.split_whitespace().nth(field_index))
        .map(unescape_mount_path)
        .collect()
}
