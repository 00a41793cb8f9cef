//! Tracing subscriber setup.
//!
//! Events go to stderr so stdout stays reserved for command output.

use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

const DEFAULT_LOG_FILTER: &str = "info";

/// Installs the global subscriber.
///
/// `level` (from `--log-level`) wins over `RUST_LOG`; without either the
/// filter defaults to `info`. A second call is a no-op.
pub fn setup_logging(level: Option<&str>) {
    let filter = build_filter(level);

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .event_format(
                fmt::format()
                    .with_level(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .compact(),
            ),
    );

    let _ = subscriber.try_init();
}

fn build_filter(level: Option<&str>) -> EnvFilter {
    if let Some(directive) = level.map(str::trim).filter(|value| !value.is_empty()) {
        if let Ok(filter) = EnvFilter::try_new(directive) {
            return filter;
        }
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[cfg(test)]
mod unit_tests {
    use super::build_filter;

    #[test]
    fn explicit_level_is_used() {
        assert_eq!(build_filter(Some("debug")).to_string(), "debug");
    }

    #[test]
    fn repeated_setup_does_not_panic() {
        super::setup_logging(Some("warn"));
        super::setup_logging(None);
    }
}
