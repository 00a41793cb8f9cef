use std::io::{self, Write};

/// Result of writing one line to a standard stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputStatus {
    /// Line written and flushed.
    Written,
    /// Reader went away (`| head`).
    BrokenPipe,
}

fn write_line(mut handle: impl Write, text: &str) -> io::Result<OutputStatus> {
    let result = handle
        .write_all(text.as_bytes())
        .and_then(|_| handle.write_all(b"\n"))
        .and_then(|_| handle.flush());
    match result {
        Ok(()) => Ok(OutputStatus::Written),
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => Ok(OutputStatus::BrokenPipe),
        Err(error) => Err(error),
    }
}

/// Writes text and a newline to stdout.
pub(crate) fn stdout_line(text: &str) -> io::Result<OutputStatus> {
    write_line(io::stdout().lock(), text)
}

/// Writes text and a newline to stderr.
pub(crate) fn stderr_line(text: &str) -> io::Result<OutputStatus> {
    write_line(io::stderr().lock(), text)
}

#[cfg(test)]
mod unit_tests {
    use std::io::{self, Write};

    use super::{write_line, OutputStatus};

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn appends_newline() {
        let mut buffer = Vec::new();
        assert_eq!(write_line(&mut buffer, "ok").unwrap(), OutputStatus::Written);
        assert_eq!(buffer, b"ok\n");
    }

    #[test]
    fn broken_pipe_is_not_an_error() {
        assert_eq!(
            write_line(ClosedPipe, "ok").unwrap(),
            OutputStatus::BrokenPipe
        );
    }
}
