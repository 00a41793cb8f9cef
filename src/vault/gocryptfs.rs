use std::{ffi::OsString, path::Path};

use tracing::info;

use crate::{config::ToolsConfig, error::Result, types::Tool};

use super::{
    command::{is_binary_available, run_command, stdin_lines, CommandOutput},
    mounts::MountTable,
    types::{InitRequest, MountOptions, MountRequest, Unlock},
};

/// Config file written by `gocryptfs -init`.
pub const CONFIG_FILE_NAME: &str = "gocryptfs.conf";
/// Config file used by reverse-mode filesystems.
pub const REVERSE_CONFIG_FILE_NAME: &str = ".gocryptfs.reverse.conf";

/// Filesystem encryption orchestration abstraction.
pub trait FsEncryptionDriver: Send + Sync {
    /// Returns `true` when the given tool can be executed.
    fn is_available(&self, tool: Tool) -> bool;
    /// Runs `gocryptfs -init`.
    fn init(&self, request: &InitRequest) -> Result<CommandOutput>;
    /// Runs `gocryptfs` to mount an encrypted directory.
    fn mount(&self, request: &MountRequest) -> Result<CommandOutput>;
    /// Runs `gocryptfs -info`.
    fn info(&self, cipher_dir: &Path) -> Result<CommandOutput>;
    /// Runs `fusermount -u`.
    fn unmount(&self, mount_point: &Path) -> Result<CommandOutput>;
    /// Returns mount status for one mount point.
    fn is_mounted(&self, mount_point: &Path) -> Result<bool>;
}

/// System gocryptfs/fuse command driver.
#[derive(Debug, Clone)]
pub struct GocryptfsDriver {
    gocryptfs_binary: String,
    fusermount_binary: String,
    mount_table: MountTable,
}

impl GocryptfsDriver {
    /// Constructs a driver using default binary names.
    pub fn new() -> Self {
        Self {
            gocryptfs_binary: Tool::Gocryptfs.default_binary().to_owned(),
            fusermount_binary: Tool::Fusermount.default_binary().to_owned(),
            mount_table: MountTable::new(),
        }
    }

    /// Constructs a driver with custom binaries.
    pub fn with_binaries(
        gocryptfs_binary: impl Into<String>,
        fusermount_binary: impl Into<String>,
    ) -> Self {
        Self {
            gocryptfs_binary: gocryptfs_binary.into(),
            fusermount_binary: fusermount_binary.into(),
            mount_table: MountTable::new(),
        }
    }

    /// Constructs a driver from the `[tools]` config section.
    pub fn from_tools(tools: &ToolsConfig) -> Self {
        Self::with_binaries(&tools.gocryptfs, &tools.fusermount)
            .with_mount_table(MountTable::with_findmnt(&tools.findmnt))
    }

    /// Replaces the mount table used by `is_mounted`.
    pub fn with_mount_table(mut self, mount_table: MountTable) -> Self {
        self.mount_table = mount_table;
        self
    }

    fn binary_for(&self, tool: Tool) -> &str {
        match tool {
            Tool::Gocryptfs => &self.gocryptfs_binary,
            Tool::Fusermount => &self.fusermount_binary,
            Tool::Findmnt | Tool::Zenity => tool.default_binary(),
        }
    }
}

impl Default for GocryptfsDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FsEncryptionDriver for GocryptfsDriver {
    fn is_available(&self, tool: Tool) -> bool {
        is_binary_available(self.binary_for(tool))
    }

    fn init(&self, request: &InitRequest) -> Result<CommandOutput> {
        info!("running gocryptfs -init on {}", request.cipher_dir.display());
        let stdin = request.password.expose(|password| {
            request
                .password_confirm
                .expose(|confirm| stdin_lines([password, confirm]))
        });
        let args = [OsString::from("-init"), request.cipher_dir.clone().into()];
        run_command(&self.gocryptfs_binary, args, &stdin)
    }

    fn mount(&self, request: &MountRequest) -> Result<CommandOutput> {
        let args = mount_arguments(request);
        info!(
            "mounting {} at {} (flags: {})",
            request.cipher_dir.display(),
            request.mount_point.display(),
            describe_flags(&request.options)
        );
        let stdin = match &request.unlock {
            Unlock::Password(secret) | Unlock::MasterKey(secret) => {
                secret.expose(|value| stdin_lines([value]))
            }
        };
        run_command(&self.gocryptfs_binary, args, &stdin)
    }

    fn info(&self, cipher_dir: &Path) -> Result<CommandOutput> {
        info!("running gocryptfs -info on {}", cipher_dir.display());
        let args = [OsString::from("-info"), cipher_dir.as_os_str().to_owned()];
        run_command(&self.gocryptfs_binary, args, b"")
    }

    fn unmount(&self, mount_point: &Path) -> Result<CommandOutput> {
        info!("unmounting {}", mount_point.display());
        let args = [OsString::from("-u"), mount_point.as_os_str().to_owned()];
        run_command(&self.fusermount_binary, args, b"")
    }

    fn is_mounted(&self, mount_point: &Path) -> Result<bool> {
        Ok(self.mount_table.is_mounted(mount_point))
    }
}

/// Builds the gocryptfs argument vector for one mount request.
pub fn mount_arguments(request: &MountRequest) -> Vec<OsString> {
    let options = &request.options;
    let mut args = flag_arguments(options)
        .into_iter()
        .map(OsString::from)
        .collect::<Vec<_>>();
    if let Some(idle) = options.idle_timeout.as_deref() {
        args.push("-idle".into());
        args.push(idle.into());
    }
    if let Some(kernel_options) = options.kernel_options.as_deref() {
        args.push("-ko".into());
        args.push(kernel_options.into());
    }
    if matches!(request.unlock, Unlock::MasterKey(_)) {
        args.push("-masterkey=stdin".into());
    }
    args.push(request.cipher_dir.clone().into_os_string());
    args.push(request.mount_point.clone().into_os_string());
    args
}

fn flag_arguments(options: &MountOptions) -> Vec<&'static str> {
    [
        (options.read_only, "-ro"),
        (options.allow_other, "-allow_other"),
        (options.sharedstorage, "-sharedstorage"),
        (options.reverse, "-reverse"),
        (options.aessiv, "-aessiv"),
        (options.plaintextnames, "-plaintextnames"),
        (options.xchacha, "-xchacha"),
    ]
    .into_iter()
    .filter_map(|(enabled, flag)| enabled.then_some(flag))
    .collect()
}

fn describe_flags(options: &MountOptions) -> String {
    let flags = flag_arguments(options);
    if flags.is_empty() {
        return "none".to_owned();
    }
    flags.join(" ")
}
