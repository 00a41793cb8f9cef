#![allow(dead_code)]

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use gocryptfs_webui::{
    error::{Result, WebUiError},
    picker::FolderPicker,
    types::Tool,
    vault::{
        command::CommandOutput,
        gocryptfs::FsEncryptionDriver,
        types::{InitRequest, MountRequest},
    },
};

/// Recorded calls and scripted behavior shared between a test and its driver.
#[derive(Default)]
pub struct DriverState {
    pub init_calls: Mutex<Vec<InitRequest>>,
    pub mount_calls: Mutex<Vec<MountRequest>>,
    pub info_calls: Mutex<Vec<PathBuf>>,
    pub unmount_calls: Mutex<Vec<PathBuf>>,
    pub mounted: Mutex<HashSet<PathBuf>>,
    pub missing_tools: Mutex<HashSet<Tool>>,
    pub next_output: Mutex<Option<CommandOutput>>,
    pub stays_mounted: Mutex<bool>,
}

impl DriverState {
    pub fn script_output(&self, status_code: i32, stdout: &str, stderr: &str) {
        *self.next_output.lock().unwrap() = Some(CommandOutput {
            status_code: Some(status_code),
            stdout: stdout.to_owned(),
            stderr: stderr.to_owned(),
        });
    }

    pub fn mark_mounted(&self, path: &Path) {
        self.mounted.lock().unwrap().insert(path.to_path_buf());
    }

    pub fn remove_tool(&self, tool: Tool) {
        self.missing_tools.lock().unwrap().insert(tool);
    }

    pub fn command_count(&self) -> usize {
        self.init_calls.lock().unwrap().len()
            + self.mount_calls.lock().unwrap().len()
            + self.info_calls.lock().unwrap().len()
            + self.unmount_calls.lock().unwrap().len()
    }

    fn take_output(&self) -> CommandOutput {
        self.next_output
            .lock()
            .unwrap()
            .take()
            .unwrap_or(CommandOutput {
                status_code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            })
    }
}

pub struct MockDriver {
    pub state: Arc<DriverState>,
}

impl MockDriver {
    pub fn with_state() -> (Self, Arc<DriverState>) {
        let state = Arc::new(DriverState::default());
        (
            Self {
                state: state.clone(),
            },
            state,
        )
    }
}

impl FsEncryptionDriver for MockDriver {
    fn is_available(&self, tool: Tool) -> bool {
        !self.state.missing_tools.lock().unwrap().contains(&tool)
    }

    fn init(&self, request: &InitRequest) -> Result<CommandOutput> {
        self.state.init_calls.lock().unwrap().push(request.clone());
        Ok(self.state.take_output())
    }

    fn mount(&self, request: &MountRequest) -> Result<CommandOutput> {
        self.state.mount_calls.lock().unwrap().push(request.clone());
        let output = self.state.take_output();
        if output.success() {
            self.state.mark_mounted(&request.mount_point);
        }
        Ok(output)
    }

    fn info(&self, cipher_dir: &Path) -> Result<CommandOutput> {
        self.state
            .info_calls
            .lock()
            .unwrap()
            .push(cipher_dir.to_path_buf());
        Ok(self.state.take_output())
    }

    fn unmount(&self, mount_point: &Path) -> Result<CommandOutput> {
        self.state
            .unmount_calls
            .lock()
            .unwrap()
            .push(mount_point.to_path_buf());
        let output = self.state.take_output();
        if output.success() && !*self.state.stays_mounted.lock().unwrap() {
            self.state.mounted.lock().unwrap().remove(mount_point);
        }
        Ok(output)
    }

    fn is_mounted(&self, mount_point: &Path) -> Result<bool> {
        Ok(self.state.mounted.lock().unwrap().contains(mount_point))
    }
}

/// Picker returning a fixed answer.
pub struct MockPicker {
    pub answer: std::result::Result<PathBuf, String>,
}

impl FolderPicker for MockPicker {
    fn pick_folder(&self) -> Result<PathBuf> {
        self.answer
            .clone()
            .map_err(WebUiError::InvalidInput)
    }
}
