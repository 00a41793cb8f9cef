use std::{
    ffi::OsStr,
    io::{self, Write},
    path::Path,
    process::{Command, Stdio},
    thread,
    time::Duration,
};

use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{Result, WebUiError};

const EXEC_BUSY_RETRY_ATTEMPTS: usize = 20;
const EXEC_BUSY_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Exit status and captured streams of one finished child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the child was killed by a signal.
    pub status_code: Option<i32>,
    /// Captured stdout, decoded lossily.
    pub stdout: String,
    /// Captured stderr, decoded lossily.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` for a zero exit code.
    pub fn success(&self) -> bool {
        self.status_code == Some(0)
    }

    /// Trimmed stdout.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// Trimmed stderr.
    pub fn stderr_trimmed(&self) -> &str {
        self.stderr.trim()
    }
}

/// Runs one binary to completion, feeding `stdin` and capturing both streams.
///
/// The stdin buffer is owned by the caller as `Zeroizing` so secret material
/// is wiped once the command returns.
pub fn run_command<I, S>(binary: &str, args: I, stdin: &[u8]) -> Result<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args = args
        .into_iter()
        .map(|arg| arg.as_ref().to_os_string())
        .collect::<Vec<_>>();
    debug!(binary, argc = args.len(), "spawning command");

    let mut child = retry_exec_busy(|| {
        Command::new(binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
    })
    .map_err(|error| map_command_execution_error(binary, error))?;

    // stdin is fed while the streams drain so neither side fills its pipe.
    let stdin_pipe = child.stdin.take();
    let (output, written) = thread::scope(|scope| {
        let writer = stdin_pipe.map(|mut pipe| {
            scope.spawn(move || pipe.write_all(stdin).and_then(|_| pipe.flush()))
        });
        let output = child.wait_with_output();
        let written = match writer {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked"))),
            None => Ok(()),
        };
        (output, written)
    });

    let output = output?;
    match written {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => {}
        Err(error) => return Err(WebUiError::Io(error)),
    }
    let result = CommandOutput {
        status_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    debug!(binary, status = ?result.status_code, "command finished");
    Ok(result)
}

/// Builds a newline-terminated stdin payload from secret lines.
pub fn stdin_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Zeroizing<Vec<u8>> {
    let mut payload = Zeroizing::new(Vec::new());
    for line in lines {
        payload.extend_from_slice(line.as_bytes());
        payload.push(b'\n');
    }
    payload
}

/// Returns `true` when `binary` resolves to an executable file.
///
/// Names with a directory component are checked directly; bare names are
/// searched in `PATH`.
pub fn is_binary_available(binary: &str) -> bool {
    let candidate = Path::new(binary);
    if candidate
        .parent()
        .is_some_and(|parent| !parent.as_os_str().is_empty())
    {
        return is_executable_file(candidate);
    }

    let Some(path_var) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path_var).any(|directory| is_executable_file(&directory.join(binary)))
}

fn is_executable_file(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        true
    }
}

fn map_command_execution_error(binary: &str, error: io::Error) -> WebUiError {
    if error.kind() == io::ErrorKind::NotFound {
        return WebUiError::MissingBinary(format!("{binary} is not installed or not in PATH."));
    }
    WebUiError::Io(error)
}

fn retry_exec_busy<T, F>(mut operation: F) -> io::Result<T>
where
    F: FnMut() -> io::Result<T>,
{
    let mut last_error = None;
    for attempt in 0..EXEC_BUSY_RETRY_ATTEMPTS {
        match operation() {
            Ok(value) => return Ok(value),
            Err(error) if is_exec_busy_error(&error) && attempt + 1 < EXEC_BUSY_RETRY_ATTEMPTS => {
                last_error = Some(error);
                thread::sleep(EXEC_BUSY_RETRY_DELAY);
            }
            Err(error) => return Err(error),
        }
    }

    Err(last_error.unwrap_or_else(|| io::Error::other("command execution failed")))
}

fn is_exec_busy_error(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::ExecutableFileBusy || error.raw_os_error() == Some(26)
}
