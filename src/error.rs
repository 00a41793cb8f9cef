use std::io;

use thiserror::Error;

/// Top-level application errors.
///
/// Domain variants carry the exact user-facing message so the HTTP layer can
/// forward `to_string()` verbatim.
#[derive(Debug, Error)]
pub enum WebUiError {
    /// Input was syntactically valid but semantically unsupported.
    #[error("{0}")]
    InvalidInput(String),
    /// A required external binary is not installed.
    #[error("{0}")]
    MissingBinary(String),
    /// A referenced path does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Target already exists or is already initialized.
    #[error("{0}")]
    AlreadyExists(String),
    /// Mount point or encrypted folder is in the wrong state for the operation.
    #[error("{0}")]
    MountState(String),
    /// External command exited unsuccessfully.
    #[error("{message}")]
    CommandFailed {
        /// Message surfaced to the caller.
        message: String,
        /// Captured stdout, when the operation reports it on failure.
        output: String,
    },
    /// Mount point is busy.
    #[error("{0}")]
    Busy(String),
    /// Internal runtime failure (blocking pool, encoding).
    #[error("internal error: {0}")]
    Internal(String),
    /// I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// JSON serialization error.
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl WebUiError {
    /// Returns the captured command output attached to this error, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            WebUiError::CommandFailed { output, .. } => Some(output.as_str()),
            _ => None,
        }
    }
}

/// A typed result used across the crate.
pub type Result<T> = std::result::Result<T, WebUiError>;

/// Generic invalid-input error.
pub const ERROR_CODE_INVALID_INPUT: &str = "E100";
/// Missing runtime dependency or binary.
pub const ERROR_CODE_MISSING_RUNTIME: &str = "E103";
/// Path lookup failed.
pub const ERROR_CODE_NOT_FOUND: &str = "E300";
/// Resource already exists.
pub const ERROR_CODE_ALREADY_EXISTS: &str = "E301";
/// Mount state conflict.
pub const ERROR_CODE_MOUNT_STATE: &str = "E302";
/// External command failed.
pub const ERROR_CODE_COMMAND_FAILED: &str = "E400";
/// Mount point busy.
pub const ERROR_CODE_BUSY: &str = "E401";
/// Filesystem or stream I/O failed.
pub const ERROR_CODE_IO: &str = "E900";
/// Internal serialization/runtime failure.
pub const ERROR_CODE_INTERNAL: &str = "E999";

const ERROR_EXPLANATION_E100: &str = r#"E100 invalid input

The request was well-formed but one of its values is not accepted.

Common fixes:
  - Use absolute paths (example: `/home/user/secure.enc`).
  - Idle timeouts use Go duration syntax: `0`, `30m`, `2h45m`, `1.5h`.
  - Kernel options are comma-separated without spaces: `noexec,nodev`."#;
const ERROR_EXPLANATION_E103: &str = r#"E103 missing runtime dependency

A required binary was not found in PATH.

Recovery:
  - Install the missing binary (`gocryptfs`, `fusermount`, `findmnt`, `zenity`).
  - Or point `[tools]` in `.gocryptfs-webui.toml` at its location.
  - Run `gocryptfs-webui check` to confirm."#;
const ERROR_EXPLANATION_E300: &str = r#"E300 path not found

The encrypted folder or mount point does not exist.

Recovery:
  - Create the mount point directory first (`mkdir -p <mount point>`).
  - Double-check the encrypted folder path."#;
const ERROR_EXPLANATION_E301: &str = r#"E301 already exists

The encrypted folder already contains a gocryptfs.conf, or is not empty.

Recovery:
  - Mount the existing folder instead of initializing it again.
  - Or choose a new, empty directory for `init`."#;
const ERROR_EXPLANATION_E302: &str = r#"E302 mount state conflict

The mount point or encrypted folder is in the wrong state for this operation.

Recovery:
  - Mount requires an empty, unmounted mount point.
  - Password unlock requires an initialized folder (gocryptfs.conf present).
  - Unmount requires a currently mounted mount point."#;
const ERROR_EXPLANATION_E400: &str = r#"E400 external command failed

gocryptfs or fusermount exited with a non-zero status. The error text is
the tool's own stderr.

Recovery:
  - Check the password or master key.
  - For `-allow_other`, enable `user_allow_other` in /etc/fuse.conf."#;
const ERROR_EXPLANATION_E401: &str = r#"E401 mount point busy

The filesystem still has open files or a process working directory inside it.

Recovery:
  - Close programs using the mount (`fuser -vm <mount point>`).
  - Retry the unmount."#;
const ERROR_EXPLANATION_E900: &str = r#"E900 I/O failure

Filesystem or stream operations failed.

Recovery:
  - Check file permissions on the encrypted folder and mount point."#;
const ERROR_EXPLANATION_E999: &str = r#"E999 internal runtime failure

An internal serialization or worker-pool error occurred.

Recovery:
  - Retry once with the same inputs.
  - If it persists, restart the server with `--log-level debug`."#;

const KNOWN_ERROR_CODES: [&str; 9] = [
    ERROR_CODE_INVALID_INPUT,
    ERROR_CODE_MISSING_RUNTIME,
    ERROR_CODE_NOT_FOUND,
    ERROR_CODE_ALREADY_EXISTS,
    ERROR_CODE_MOUNT_STATE,
    ERROR_CODE_COMMAND_FAILED,
    ERROR_CODE_BUSY,
    ERROR_CODE_IO,
    ERROR_CODE_INTERNAL,
];

/// Returns the stable error code for a runtime error.
pub fn classify_error_code(error: &WebUiError) -> &'static str {
    match error {
        WebUiError::InvalidInput(_) => ERROR_CODE_INVALID_INPUT,
        WebUiError::MissingBinary(_) => ERROR_CODE_MISSING_RUNTIME,
        WebUiError::NotFound(_) => ERROR_CODE_NOT_FOUND,
        WebUiError::AlreadyExists(_) => ERROR_CODE_ALREADY_EXISTS,
        WebUiError::MountState(_) => ERROR_CODE_MOUNT_STATE,
        WebUiError::CommandFailed { .. } => ERROR_CODE_COMMAND_FAILED,
        WebUiError::Busy(_) => ERROR_CODE_BUSY,
        WebUiError::Io(_) => ERROR_CODE_IO,
        WebUiError::Serde(_) | WebUiError::Internal(_) => ERROR_CODE_INTERNAL,
    }
}

/// Normalizes a user-provided error code for lookups.
pub fn normalize_error_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Returns an explanation block for a known error code.
pub fn explain_error_code(raw: &str) -> Option<&'static str> {
    let normalized = normalize_error_code(raw);
    match normalized.as_str() {
        ERROR_CODE_INVALID_INPUT => Some(ERROR_EXPLANATION_E100),
        ERROR_CODE_MISSING_RUNTIME => Some(ERROR_EXPLANATION_E103),
        ERROR_CODE_NOT_FOUND => Some(ERROR_EXPLANATION_E300),
        ERROR_CODE_ALREADY_EXISTS => Some(ERROR_EXPLANATION_E301),
        ERROR_CODE_MOUNT_STATE => Some(ERROR_EXPLANATION_E302),
        ERROR_CODE_COMMAND_FAILED => Some(ERROR_EXPLANATION_E400),
        ERROR_CODE_BUSY => Some(ERROR_EXPLANATION_E401),
        ERROR_CODE_IO => Some(ERROR_EXPLANATION_E900),
        ERROR_CODE_INTERNAL => Some(ERROR_EXPLANATION_E999),
        _ => None,
    }
}

/// Stable list of explainable error codes.
pub fn known_error_codes() -> &'static [&'static str] {
    &KNOWN_ERROR_CODES
}

#[cfg(test)]
mod unit_tests {
    use super::{
        classify_error_code, explain_error_code, known_error_codes, WebUiError,
        ERROR_CODE_BUSY, ERROR_CODE_COMMAND_FAILED, ERROR_CODE_MISSING_RUNTIME,
        ERROR_CODE_MOUNT_STATE,
    };

    #[test]
    fn classify_missing_binary() {
        let error = WebUiError::MissingBinary("gocryptfs is not installed or not in PATH.".to_owned());
        assert_eq!(classify_error_code(&error), ERROR_CODE_MISSING_RUNTIME);
    }

    #[test]
    fn classify_mount_state_and_busy() {
        let error = WebUiError::MountState("Mount point is not empty.".to_owned());
        assert_eq!(classify_error_code(&error), ERROR_CODE_MOUNT_STATE);
        let error = WebUiError::Busy("busy".to_owned());
        assert_eq!(classify_error_code(&error), ERROR_CODE_BUSY);
    }

    #[test]
    fn command_failed_displays_message_and_keeps_output() {
        let error = WebUiError::CommandFailed {
            message: "Password incorrect.".to_owned(),
            output: "partial".to_owned(),
        };
        assert_eq!(error.to_string(), "Password incorrect.");
        assert_eq!(error.output(), Some("partial"));
        assert_eq!(classify_error_code(&error), ERROR_CODE_COMMAND_FAILED);
    }

    #[test]
    fn explain_is_case_insensitive() {
        let explanation = explain_error_code(" e401 ").unwrap();
        assert!(explanation.contains("fuser -vm"));
    }

    #[test]
    fn explain_unknown_code_returns_none() {
        assert!(explain_error_code("e000").is_none());
    }

    #[test]
    fn every_known_code_is_explainable() {
        for code in known_error_codes() {
            assert!(explain_error_code(code).is_some(), "missing explanation for {code}");
        }
    }
}
