use std::path::PathBuf;

use tracing::{debug, info};

use crate::{
    error::{Result, WebUiError},
    types::Tool,
    vault::command::{is_binary_available, run_command},
};

const ZENITY_ARGS: [&str; 3] = ["--file-selection", "--directory", "--title=Select Folder"];

/// Native folder chooser used by the "Pick folder" buttons.
pub trait FolderPicker: Send + Sync {
    /// Opens a dialog and returns the chosen path as printed by the dialog.
    fn pick_folder(&self) -> Result<PathBuf>;
}

/// Folder picker backed by `zenity --file-selection --directory`.
#[derive(Debug, Clone)]
pub struct ZenityPicker {
    binary: String,
}

impl ZenityPicker {
    /// Uses `zenity` from `PATH`.
    pub fn new() -> Self {
        Self::with_binary(Tool::Zenity.default_binary())
    }

    /// Uses a custom zenity binary.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for ZenityPicker {
    fn default() -> Self {
        Self::new()
    }
}

impl FolderPicker for ZenityPicker {
    fn pick_folder(&self) -> Result<PathBuf> {
        if !is_binary_available(&self.binary) {
            return Err(WebUiError::MissingBinary("zenity is not installed.".to_owned()));
        }
        info!("opening folder picker");
        let output = run_command(&self.binary, ZENITY_ARGS, b"")?;
        if !output.success() {
            debug!(status = ?output.status_code, "folder picker dismissed");
            return Err(WebUiError::InvalidInput("No folder selected.".to_owned()));
        }
        Ok(PathBuf::from(output.stdout_trimmed()))
    }
}

/// Picker used when `[ui] folder_picker = false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPicker;

impl FolderPicker for DisabledPicker {
    fn pick_folder(&self) -> Result<PathBuf> {
        Err(WebUiError::InvalidInput("Folder picker is disabled.".to_owned()))
    }
}

/// Picker selected from configuration.
#[derive(Debug, Clone)]
pub enum ConfiguredPicker {
    /// zenity dialog.
    Zenity(ZenityPicker),
    /// Always fails.
    Disabled(DisabledPicker),
}

impl ConfiguredPicker {
    /// Builds the picker for the given config values.
    pub fn from_settings(enabled: bool, zenity_binary: &str) -> Self {
        if enabled {
            ConfiguredPicker::Zenity(ZenityPicker::with_binary(zenity_binary))
        } else {
            ConfiguredPicker::Disabled(DisabledPicker)
        }
    }
}

impl FolderPicker for ConfiguredPicker {
    fn pick_folder(&self) -> Result<PathBuf> {
        match self {
            ConfiguredPicker::Zenity(picker) => picker.pick_folder(),
            ConfiguredPicker::Disabled(picker) => picker.pick_folder(),
        }
    }
}
