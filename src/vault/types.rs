use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{AuthMode, SecretValue};

/// Form payload for `POST /api/init`.
#[derive(Debug, Clone, Deserialize)]
pub struct InitForm {
    /// Absolute path to the encrypted folder.
    pub enc_path: String,
    /// New folder password.
    pub password: SecretValue,
    /// Password confirmation.
    pub password_confirm: SecretValue,
}

/// Form payload for `POST /api/mount`.
#[derive(Debug, Clone, Deserialize)]
pub struct MountForm {
    /// Absolute path to the encrypted folder.
    pub enc_path: String,
    /// Absolute path to the mount point.
    pub mount_path: String,
    /// Unlock method.
    #[serde(default)]
    pub auth_mode: AuthMode,
    /// Folder password for password mode.
    #[serde(default)]
    pub password: SecretValue,
    /// Master key for master-key mode.
    #[serde(default)]
    pub master_key: SecretValue,
    /// `-ro`.
    #[serde(default)]
    pub read_only: bool,
    /// `-allow_other`.
    #[serde(default)]
    pub allow_other: bool,
    /// `-sharedstorage`.
    #[serde(default)]
    pub sharedstorage: bool,
    /// `-reverse`.
    #[serde(default)]
    pub reverse: bool,
    /// `-aessiv`.
    #[serde(default)]
    pub aessiv: bool,
    /// `-plaintextnames`.
    #[serde(default)]
    pub plaintextnames: bool,
    /// `-xchacha`.
    #[serde(default)]
    pub xchacha: bool,
    /// `-idle` duration literal; empty disables the flag.
    #[serde(default)]
    pub idle_timeout: String,
    /// `-ko` option list; empty disables the flag.
    #[serde(default)]
    pub kernel_options: String,
}

/// Form payload for `POST /api/info`.
#[derive(Debug, Clone, Deserialize)]
pub struct InfoForm {
    /// Absolute path to the encrypted folder.
    pub enc_path: String,
}

/// Form payload for `POST /api/unmount`.
#[derive(Debug, Clone, Deserialize)]
pub struct UnmountForm {
    /// Absolute path to the mount point.
    pub mount_path: String,
}

/// Validated `gocryptfs -init` invocation.
#[derive(Debug, Clone)]
pub struct InitRequest {
    /// Ciphertext directory to initialize.
    pub cipher_dir: PathBuf,
    /// Password fed on stdin.
    pub password: SecretValue,
    /// Confirmation fed on stdin after the password.
    pub password_confirm: SecretValue,
}

/// How the mount is unlocked, with its secret.
#[derive(Debug, Clone)]
pub enum Unlock {
    /// Password on stdin.
    Password(SecretValue),
    /// Master key on stdin with `-masterkey=stdin`.
    MasterKey(SecretValue),
}

/// Optional gocryptfs mount flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountOptions {
    /// `-ro`.
    pub read_only: bool,
    /// `-allow_other`.
    pub allow_other: bool,
    /// `-sharedstorage`.
    pub sharedstorage: bool,
    /// `-reverse`.
    pub reverse: bool,
    /// `-aessiv`.
    pub aessiv: bool,
    /// `-plaintextnames`.
    pub plaintextnames: bool,
    /// `-xchacha`.
    pub xchacha: bool,
    /// Validated `-idle` literal.
    pub idle_timeout: Option<String>,
    /// Validated `-ko` list.
    pub kernel_options: Option<String>,
}

/// Validated mount invocation.
#[derive(Debug, Clone)]
pub struct MountRequest {
    /// Ciphertext directory.
    pub cipher_dir: PathBuf,
    /// Plaintext mount point.
    pub mount_point: PathBuf,
    /// Unlock method and secret.
    pub unlock: Unlock,
    /// Optional flags.
    pub options: MountOptions,
}

/// Successful operation result rendered to the browser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Text shown in the output pane.
    pub output: String,
    /// Master key printed by `gocryptfs -init`, when found.
    pub master_key: Option<String>,
}

impl Outcome {
    pub(crate) fn with_output(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            master_key: None,
        }
    }
}
