mod commands;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

pub use commands::{report_error, run};

const ERROR_CODE_ARG_HELP: &str = "Error code from CLI stderr or the UI (example: `E302`).";
const ERROR_FORMAT_ARG_HELP: &str = "Error output format (`text` or `json`).";
const CLI_AFTER_HELP: &str = r#"Examples:
  gocryptfs-webui serve
  gocryptfs-webui serve --bind 127.0.0.1:8800
  gocryptfs-webui check
  gocryptfs-webui explain E302
  gocryptfs-webui --error-format json serve --check

Config:
  `.gocryptfs-webui.toml` is read from --config, GOCRYPTFS_WEBUI_CONFIG,
  or the nearest parent directory of the working directory.
"#;
const SERVE_COMMAND_AFTER_HELP: &str = r#"Examples:
  gocryptfs-webui serve
  gocryptfs-webui serve --bind [::1]:8000
  gocryptfs-webui serve --check

Notes:
  - Only loopback addresses are accepted.
  - Open the printed URL in a browser on the same machine.
"#;
const CHECK_COMMAND_AFTER_HELP: &str = r#"Examples:
  gocryptfs-webui check
  gocryptfs-webui check --json

Exit status is 1 when gocryptfs or fusermount is missing.
"#;
const EXPLAIN_COMMAND_AFTER_HELP: &str = r#"Examples:
  gocryptfs-webui explain E401
  gocryptfs-webui explain e103

Tip:
  Error codes are shown in stderr output, for example `error[E100]: ...`,
  and next to every failure in the browser UI.
"#;
const VERSION_COMMAND_AFTER_HELP: &str = r#"Examples:
  gocryptfs-webui --version
  gocryptfs-webui version --json
"#;

/// Top-level command line parser.
#[derive(Debug, Parser)]
#[command(
    name = "gocryptfs-webui",
    version,
    about = "Local-only browser UI for gocryptfs init, mount, info, and unmount.",
    after_help = CLI_AFTER_HELP,
    arg_required_else_help = true,
    next_line_help = true
)]
pub struct Cli {
    /// Explicit config file path.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Skip config loading and use built-in defaults.
    #[arg(long, global = true, conflicts_with = "config")]
    pub no_config: bool,
    /// Log filter directive (overrides `RUST_LOG`, example: `debug`).
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    /// Error output format.
    #[arg(long, global = true, value_enum, default_value_t = ErrorFormatArg::Text, help = ERROR_FORMAT_ARG_HELP)]
    pub error_format: ErrorFormatArg,
    /// Subcommand.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Starts the loopback web server.
    #[command(after_help = SERVE_COMMAND_AFTER_HELP)]
    Serve {
        /// Loopback bind address (overrides `[server] bind`).
        #[arg(long)]
        bind: Option<String>,
        /// Validate config and bind address, then exit.
        #[arg(long)]
        check: bool,
    },
    /// Reports which external tools are available.
    #[command(after_help = CHECK_COMMAND_AFTER_HELP)]
    Check {
        /// Print structured JSON output.
        #[arg(long)]
        json: bool,
    },
    /// Explains an error code.
    #[command(after_help = EXPLAIN_COMMAND_AFTER_HELP)]
    Explain {
        /// Error code.
        #[arg(help = ERROR_CODE_ARG_HELP)]
        code: String,
    },
    /// Prints version information.
    #[command(visible_alias = "ver", after_help = VERSION_COMMAND_AFTER_HELP)]
    Version {
        /// Print structured JSON output.
        #[arg(long)]
        json: bool,
    },
}

/// Error rendering format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ErrorFormatArg {
    /// Human-readable text diagnostics.
    Text,
    /// Machine-readable JSON diagnostics.
    Json,
}

#[cfg(test)]
mod unit_tests {
    use std::path::PathBuf;

    use super::{Cli, Command, ErrorFormatArg};
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_accepts_bind_and_check() {
        let cli =
            Cli::try_parse_from(["gocryptfs-webui", "serve", "--bind", "127.0.0.1:9000", "--check"])
                .unwrap();
        match cli.command {
            Command::Serve { bind, check } => {
                assert_eq!(bind.as_deref(), Some("127.0.0.1:9000"));
                assert!(check);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from([
            "gocryptfs-webui",
            "check",
            "--config",
            "/etc/webui.toml",
            "--error-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/webui.toml")));
        assert_eq!(cli.error_format, ErrorFormatArg::Json);
    }

    #[test]
    fn config_and_no_config_conflict() {
        assert!(Cli::try_parse_from([
            "gocryptfs-webui",
            "--config",
            "a.toml",
            "--no-config",
            "check"
        ])
        .is_err());
    }

    #[test]
    fn error_format_defaults_to_text() {
        let cli = Cli::try_parse_from(["gocryptfs-webui", "version"]).unwrap();
        assert_eq!(cli.error_format, ErrorFormatArg::Text);
    }

    #[test]
    fn explain_help_mentions_error_prefix() {
        let mut command = Cli::command();
        let explain = command.find_subcommand_mut("explain").unwrap();
        let help = explain.render_long_help().to_string();
        assert!(help.contains("error[E100]"));
    }
}
