use std::{fs, path::Path, sync::LazyLock};

use regex::Regex;

use crate::error::{Result, WebUiError};

static IDLE_DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+(?:\.\d+)?[smhd](?:\d+(?:\.\d+)?[smhd])*$")
        .unwrap_or_else(|error| panic!("idle duration pattern must compile: {error}"))
});

/// Returns `true` for a non-empty, absolute path without NUL bytes.
pub fn is_absolute_path(raw: &str) -> bool {
    let trimmed = raw.trim();
    !trimmed.is_empty() && !trimmed.contains('\0') && Path::new(trimmed).is_absolute()
}

/// Returns `true` for `0` or a Go-style duration such as `30m`, `2h45m`, `1.5h`.
pub fn is_valid_idle_timeout(raw: &str) -> bool {
    raw == "0" || IDLE_DURATION_PATTERN.is_match(raw)
}

/// Validates a comma-separated `-ko` kernel option list.
pub fn validate_kernel_options(raw: &str) -> Result<()> {
    if raw.starts_with('-') {
        return Err(WebUiError::InvalidInput(
            "Kernel mount options cannot start with '-'.".to_owned(),
        ));
    }
    for option in raw.split(',') {
        if option.is_empty() {
            return Err(WebUiError::InvalidInput(
                "Kernel mount options cannot contain empty entries.".to_owned(),
            ));
        }
        if option
            .chars()
            .any(|character| character.is_whitespace() || character.is_control())
        {
            return Err(WebUiError::InvalidInput(
                "Kernel mount options cannot contain whitespace.".to_owned(),
            ));
        }
    }
    Ok(())
}

/// Returns `true` when `path` exists; I/O errors count as absent.
pub fn path_exists(path: &Path) -> bool {
    path.try_exists().unwrap_or(false)
}

/// Returns `true` for an existing directory with no entries.
pub fn is_empty_dir(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }
    match fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => false,
    }
}
