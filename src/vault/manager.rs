use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{info, warn};

use crate::{
    error::{Result, WebUiError},
    picker::FolderPicker,
    types::{AuthMode, Tool},
};

use super::{
    gocryptfs::{FsEncryptionDriver, CONFIG_FILE_NAME, REVERSE_CONFIG_FILE_NAME},
    types::{
        InfoForm, InitForm, InitRequest, MountForm, MountOptions, MountRequest, Outcome,
        UnmountForm, Unlock,
    },
    validation::{
        is_absolute_path, is_empty_dir, is_valid_idle_timeout, path_exists,
        validate_kernel_options,
    },
};

const MASTER_KEY_HEADER: &str = "master key is:";
const MASTER_KEY_MARKER: &str = "MasterKey";

/// Coordinator for init/mount/info/unmount requests.
///
/// Checks run in a fixed order and the first failure is returned.
pub struct VaultManager<D, P>
where
    D: FsEncryptionDriver,
    P: FolderPicker,
{
    driver: D,
    picker: P,
}

impl<D, P> VaultManager<D, P>
where
    D: FsEncryptionDriver,
    P: FolderPicker,
{
    /// Constructs a vault manager.
    pub fn new(driver: D, picker: P) -> Self {
        Self { driver, picker }
    }

    /// Returns the underlying driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Initializes a new encrypted folder.
    pub fn init(&self, form: InitForm) -> Result<Outcome> {
        let enc_path = form.enc_path.trim();
        if !is_absolute_path(enc_path) {
            return Err(invalid(
                "Encrypted folder path must be an absolute path.",
            ));
        }
        if !form.password.matches(&form.password_confirm) {
            return Err(invalid("Passwords do not match."));
        }
        if form.password.is_empty() {
            return Err(invalid("Password cannot be empty."));
        }

        let cipher_dir = PathBuf::from(enc_path);
        if path_exists(&cipher_dir) {
            if cipher_dir.join(CONFIG_FILE_NAME).exists() {
                return Err(WebUiError::AlreadyExists(
                    "Encrypted folder already initialized.".to_owned(),
                ));
            }
            if !is_empty_dir(&cipher_dir) {
                return Err(WebUiError::AlreadyExists(
                    "Encrypted folder exists and is not empty.".to_owned(),
                ));
            }
        }
        self.require_tool(Tool::Gocryptfs)?;

        let created_root = first_missing_ancestor(&cipher_dir);
        fs::create_dir_all(&cipher_dir)?;
        let output = match self.driver.init(&InitRequest {
            cipher_dir: cipher_dir.clone(),
            password: form.password,
            password_confirm: form.password_confirm,
        }) {
            Ok(output) => output,
            Err(error) => {
                remove_created_dirs(created_root.as_deref());
                return Err(error);
            }
        };

        let stdout = output.stdout_trimmed().to_owned();
        if !output.success() {
            warn!(
                "gocryptfs -init failed for {} (status {:?})",
                cipher_dir.display(),
                output.status_code
            );
            remove_created_dirs(created_root.as_deref());
            let message = first_non_empty(&[output.stderr_trimmed(), &stdout])
                .unwrap_or("Initialization failed.")
                .to_owned();
            return Err(WebUiError::CommandFailed {
                message,
                output: stdout,
            });
        }

        info!("initialized {}", cipher_dir.display());
        let master_key = extract_master_key(&stdout);
        Ok(Outcome {
            output: stdout,
            master_key,
        })
    }

    /// Mounts an encrypted folder.
    pub fn mount(&self, form: MountForm) -> Result<Outcome> {
        let enc_path = form.enc_path.trim();
        let mount_path = form.mount_path.trim();
        if !is_absolute_path(enc_path) || !is_absolute_path(mount_path) {
            return Err(invalid("Paths must be absolute."));
        }

        let cipher_dir = PathBuf::from(enc_path);
        let mount_point = PathBuf::from(mount_path);
        if !path_exists(&cipher_dir) {
            return Err(WebUiError::NotFound(
                "Encrypted folder does not exist.".to_owned(),
            ));
        }
        if !path_exists(&mount_point) {
            return Err(WebUiError::NotFound("Mount point does not exist.".to_owned()));
        }
        if !is_empty_dir(&mount_point) {
            return Err(WebUiError::MountState("Mount point is not empty.".to_owned()));
        }
        if self.driver.is_mounted(&mount_point)? {
            return Err(WebUiError::MountState(
                "Mount point is already mounted.".to_owned(),
            ));
        }
        if form.auth_mode == AuthMode::Password && !has_config_file(&cipher_dir, form.reverse) {
            return Err(WebUiError::MountState(
                "Encrypted folder is not initialized.".to_owned(),
            ));
        }
        self.require_tool(Tool::Gocryptfs)?;

        let unlock = match form.auth_mode {
            AuthMode::Password => {
                if form.password.is_empty() {
                    return Err(invalid("Password is required for password unlock mode."));
                }
                Unlock::Password(form.password)
            }
            AuthMode::MasterKey => {
                let master_key = form.master_key.trimmed();
                if master_key.is_empty() {
                    return Err(invalid(
                        "Master key is required for master-key unlock mode.",
                    ));
                }
                Unlock::MasterKey(master_key)
            }
        };

        let idle_timeout = form.idle_timeout.trim();
        if !idle_timeout.is_empty() && !is_valid_idle_timeout(idle_timeout) {
            return Err(invalid(
                "Idle timeout format is invalid. Use values like '30m' or '2h45m'.",
            ));
        }
        let kernel_options = form.kernel_options.trim();
        if !kernel_options.is_empty() {
            validate_kernel_options(kernel_options)?;
        }

        let request = MountRequest {
            cipher_dir,
            mount_point,
            unlock,
            options: MountOptions {
                read_only: form.read_only,
                allow_other: form.allow_other,
                sharedstorage: form.sharedstorage,
                reverse: form.reverse,
                aessiv: form.aessiv,
                plaintextnames: form.plaintextnames,
                xchacha: form.xchacha,
                idle_timeout: non_empty(idle_timeout),
                kernel_options: non_empty(kernel_options),
            },
        };
        let output = self.driver.mount(&request)?;
        if !output.success() {
            warn!(
                "mount of {} failed (status {:?})",
                request.mount_point.display(),
                output.status_code
            );
            let message = first_non_empty(&[output.stderr_trimmed()])
                .unwrap_or("Mount failed.")
                .to_owned();
            return Err(WebUiError::CommandFailed {
                message,
                output: String::new(),
            });
        }

        info!("mounted {}", request.mount_point.display());
        Ok(Outcome::with_output(
            first_non_empty(&[output.stdout_trimmed()]).unwrap_or("Mounted successfully."),
        ))
    }

    /// Prints the `gocryptfs -info` summary of an encrypted folder.
    pub fn info(&self, form: InfoForm) -> Result<Outcome> {
        let enc_path = form.enc_path.trim();
        if !is_absolute_path(enc_path) {
            return Err(invalid("Encrypted folder path must be absolute."));
        }
        let cipher_dir = PathBuf::from(enc_path);
        if !path_exists(&cipher_dir) {
            return Err(WebUiError::NotFound(
                "Encrypted folder does not exist.".to_owned(),
            ));
        }
        if !cipher_dir.join(CONFIG_FILE_NAME).exists() {
            return Err(WebUiError::MountState(
                "No gocryptfs.conf found in encrypted folder.".to_owned(),
            ));
        }
        self.require_tool(Tool::Gocryptfs)?;

        let output = self.driver.info(&cipher_dir)?;
        let stdout = output.stdout_trimmed().to_owned();
        if !output.success() {
            let message = first_non_empty(&[output.stderr_trimmed()])
                .unwrap_or("Failed to read config info.")
                .to_owned();
            return Err(WebUiError::CommandFailed {
                message,
                output: stdout,
            });
        }
        if stdout.is_empty() {
            return Ok(Outcome::with_output("No output from gocryptfs -info."));
        }
        Ok(Outcome::with_output(stdout))
    }

    /// Unmounts a mount point with `fusermount -u`.
    pub fn unmount(&self, form: UnmountForm) -> Result<Outcome> {
        let mount_path = form.mount_path.trim();
        if !is_absolute_path(mount_path) {
            return Err(invalid("Mount point path must be absolute."));
        }
        let mount_point = PathBuf::from(mount_path);
        if !path_exists(&mount_point) {
            return Err(WebUiError::NotFound("Mount point does not exist.".to_owned()));
        }
        if !self.driver.is_mounted(&mount_point)? {
            return Err(WebUiError::MountState("Mount point is not mounted.".to_owned()));
        }
        self.require_tool(Tool::Fusermount)?;

        let output = self.driver.unmount(&mount_point)?;
        let stdout = output.stdout_trimmed();
        if !output.success() {
            let message = first_non_empty(&[output.stderr_trimmed(), stdout])
                .unwrap_or("Unmount failed.");
            warn!("unmount of {} failed: {message}", mount_point.display());
            if message.to_ascii_lowercase().contains("busy") {
                return Err(WebUiError::Busy(
                    "Unmount failed: mount point is busy (files in use).".to_owned(),
                ));
            }
            return Err(WebUiError::CommandFailed {
                message: message.to_owned(),
                output: String::new(),
            });
        }

        if self.driver.is_mounted(&mount_point)? {
            return Err(WebUiError::MountState(
                "Unmount failed: mount point is still mounted.".to_owned(),
            ));
        }

        info!("unmounted {}", mount_point.display());
        Ok(Outcome::with_output(
            first_non_empty(&[stdout]).unwrap_or("Unmounted successfully."),
        ))
    }

    /// Opens the native folder picker and returns an absolute path.
    pub fn pick_folder(&self) -> Result<PathBuf> {
        let selected = self.picker.pick_folder()?;
        if !is_absolute_path(&selected.to_string_lossy()) {
            return Err(invalid("Selected path is not absolute."));
        }
        Ok(selected)
    }

    fn require_tool(&self, tool: Tool) -> Result<()> {
        if self.driver.is_available(tool) {
            return Ok(());
        }
        Err(WebUiError::MissingBinary(format!(
            "{tool} is not installed or not in PATH."
        )))
    }
}

/// Extracts the master key printed by `gocryptfs -init`.
///
/// gocryptfs prints the key as dash-separated hex groups on the lines after
/// "Your master key is:", wrapping with a trailing `-`. Wrapped lines are
/// rejoined with exactly one `-` between groups. Output without that block
/// falls back to the first line mentioning `MasterKey`.
pub fn extract_master_key(output: &str) -> Option<String> {
    let mut lines = output.lines();
    while let Some(line) = lines.next() {
        if !line.to_ascii_lowercase().contains(MASTER_KEY_HEADER) {
            continue;
        }
        let groups = lines
            .by_ref()
            .map(str::trim)
            .skip_while(|candidate| candidate.is_empty())
            .take_while(|candidate| is_key_line(candidate))
            .collect::<Vec<_>>();
        if !groups.is_empty() {
            return Some(join_key_lines(&groups));
        }
        break;
    }

    output
        .lines()
        .find(|line| line.contains(MASTER_KEY_MARKER))
        .map(|line| line.trim().to_owned())
}

fn join_key_lines(lines: &[&str]) -> String {
    let mut key = String::new();
    for line in lines {
        let line = line.trim_matches('-');
        if line.is_empty() {
            continue;
        }
        if !key.is_empty() {
            key.push('-');
        }
        key.push_str(line);
    }
    key
}

fn is_key_line(line: &str) -> bool {
    !line.is_empty()
        && line
            .chars()
            .all(|character| character.is_ascii_hexdigit() || character == '-')
}

/// Topmost ancestor of `path` (inclusive) that does not exist yet.
fn first_missing_ancestor(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .take_while(|ancestor| {
            !ancestor.as_os_str().is_empty() && matches!(ancestor.try_exists(), Ok(false))
        })
        .last()
        .map(Path::to_path_buf)
}

fn remove_created_dirs(created_root: Option<&Path>) {
    let Some(root) = created_root else {
        return;
    };
    if let Err(error) = fs::remove_dir_all(root) {
        warn!("failed to remove {} after init failure: {error}", root.display());
    }
}

fn has_config_file(cipher_dir: &Path, reverse: bool) -> bool {
    cipher_dir.join(CONFIG_FILE_NAME).exists()
        || (reverse && cipher_dir.join(REVERSE_CONFIG_FILE_NAME).exists())
}

fn first_non_empty<'a>(candidates: &[&'a str]) -> Option<&'a str> {
    candidates.iter().copied().find(|value| !value.is_empty())
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_owned())
}

fn invalid(message: &str) -> WebUiError {
    WebUiError::InvalidInput(message.to_owned())
}

#[cfg(test)]
mod unit_tests {
    use super::extract_master_key;

    const INIT_OUTPUT: &str = "\
Choose a password for protecting your files.
Password:
Repeat:

Your master key is:

    6f717d8b-6b5f3d8c-4cb1dbe4-5e0c7a3d-
    b7f0ec8b-86bb1b16-d3a9b7c4-4f8c8c61

If the gocryptfs.conf file becomes corrupted or you ever forget your password,
there is only one hope for recovery: The master key. Print it to a piece of
paper and store it in a drawer. This message is only printed once.
The gocryptfs filesystem has been created successfully.
You can now mount it using: gocryptfs /tmp/enc MOUNTPOINT";

    #[test]
    fn extracts_multiline_master_key() {
        assert_eq!(
            extract_master_key(INIT_OUTPUT).as_deref(),
            Some(
                "6f717d8b-6b5f3d8c-4cb1dbe4-5e0c7a3d-b7f0ec8b-86bb1b16-d3a9b7c4-4f8c8c61"
            )
        );
    }

    #[test]
    fn joins_wrapped_lines_with_single_dash() {
        let wrapped = "Your master key is:\n    6f717d8b-6b5f3d8c-4cb1dbe4-5e0c7a3d-\n    b7f0ec8b-86bb1b16-d3a9b7c4-4f8c8c61";
        let key = extract_master_key(wrapped).unwrap();
        assert_eq!(
            key,
            "6f717d8b-6b5f3d8c-4cb1dbe4-5e0c7a3d-b7f0ec8b-86bb1b16-d3a9b7c4-4f8c8c61"
        );
        assert!(!key.contains("--"));

        let unwrapped = "Your master key is:\n    aaaa1111-bbbb2222\n    cccc3333-dddd4444\n";
        assert_eq!(
            extract_master_key(unwrapped).as_deref(),
            Some("aaaa1111-bbbb2222-cccc3333-dddd4444")
        );
    }

    #[test]
    fn falls_back_to_marker_line() {
        let output = "created\n  MasterKey: abcd-ef01  \ndone";
        assert_eq!(
            extract_master_key(output).as_deref(),
            Some("MasterKey: abcd-ef01")
        );
    }

    #[test]
    fn no_key_in_plain_output() {
        assert!(extract_master_key("The gocryptfs filesystem has been created.").is_none());
    }
}
