use std::env::VarError;

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    config::{parse_bind, resolve_config_path, WebUiConfig, CONFIG_ENV_VAR, CONFIG_FILE_NAME},
    error::{classify_error_code, explain_error_code, known_error_codes, Result, WebUiError},
    logging::setup_logging,
    picker::ConfiguredPicker,
    server::{check_bind, create_server},
    types::Tool,
    vault::{command::is_binary_available, gocryptfs::GocryptfsDriver, VaultManager},
};

use super::{
    output::{self, OutputStatus},
    Cli, Command, ErrorFormatArg,
};

const REQUIRED_TOOLS: [Tool; 2] = [Tool::Gocryptfs, Tool::Fusermount];
const ALL_TOOLS: [Tool; 4] = [Tool::Gocryptfs, Tool::Fusermount, Tool::Findmnt, Tool::Zenity];

#[derive(Debug, Serialize)]
struct ToolStatus<'a> {
    tool: String,
    binary: &'a str,
    available: bool,
    required: bool,
}

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    ok: bool,
    config_file: Option<String>,
    tools: Vec<ToolStatus<'a>>,
}

#[derive(Debug, Serialize)]
struct VersionReport {
    name: &'static str,
    version: &'static str,
    config_file: &'static str,
    config_env: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorReport<'a> {
    error: ErrorBody<'a>,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'static str,
    message: String,
    explain: &'a str,
}

/// Runs one parsed command and returns the process exit code.
pub fn run(cli: Cli) -> Result<i32> {
    setup_logging(cli.log_level.as_deref());

    match &cli.command {
        Command::Serve { bind, check } => run_serve(&cli, bind.as_deref(), *check),
        Command::Check { json } => run_check(&cli, *json),
        Command::Explain { code } => run_explain(code),
        Command::Version { json } => run_version(*json),
    }
}

/// Prints a failed command's error in the selected format.
pub fn report_error(error: &WebUiError, format: ErrorFormatArg) {
    let code = classify_error_code(error);
    let line = match format {
        ErrorFormatArg::Text => format!("error[{code}]: {error}"),
        ErrorFormatArg::Json => {
            let explain = format!("gocryptfs-webui explain {code}");
            let report = ErrorReport {
                error: ErrorBody {
                    code,
                    message: error.to_string(),
                    explain: &explain,
                },
            };
            serde_json::to_string(&report)
                .unwrap_or_else(|_| format!("{{\"error\":{{\"code\":\"{code}\"}}}}"))
        }
    };
    let _ = output::stderr_line(&line);
}

fn run_serve(cli: &Cli, bind_override: Option<&str>, check: bool) -> Result<i32> {
    let mut config = load_config(cli)?;
    if let Some(bind) = bind_override {
        config.server.bind = parse_bind(bind)?;
    }

    if check {
        check_bind(config.server.bind)?;
        return Ok(stdout_line_or_exit("ok")?.unwrap_or(0));
    }

    let driver = GocryptfsDriver::from_tools(&config.tools);
    let picker = ConfiguredPicker::from_settings(config.ui.folder_picker, &config.tools.zenity);
    let manager = VaultManager::new(driver, picker);
    let url = format!("http://{}/", config.server.bind);
    if let Some(code) = stdout_line_or_exit(&format!("serving on {url}"))? {
        return Ok(code);
    }

    actix_web::rt::System::new().block_on(async move {
        let server = create_server(&config.server, manager)?;
        server.await?;
        info!("server stopped");
        Ok::<(), WebUiError>(())
    })?;
    Ok(0)
}

fn run_check(cli: &Cli, json: bool) -> Result<i32> {
    let config = load_config(cli)?;
    let tools = ALL_TOOLS
        .iter()
        .map(|tool| {
            let binary = config.tools.binary(*tool);
            ToolStatus {
                tool: tool.to_string(),
                binary,
                available: is_binary_available(binary),
                required: REQUIRED_TOOLS.contains(tool),
            }
        })
        .collect::<Vec<_>>();
    let ok = tools
        .iter()
        .all(|status| status.available || !status.required);
    let report = CheckReport {
        ok,
        config_file: config
            .source_path
            .as_deref()
            .map(|path| path.display().to_string()),
        tools,
    };

    let exit_code = if report.ok { 0 } else { 1 };
    if json {
        if let Some(code) = stdout_line_or_exit(&serde_json::to_string_pretty(&report)?)? {
            return Ok(code);
        }
        return Ok(exit_code);
    }

    for status in &report.tools {
        let state = match (status.available, status.required) {
            (true, _) => "ok",
            (false, true) => "missing",
            (false, false) => "missing (optional)",
        };
        let line = format!("{:<11} {:<19} {}", status.tool, state, status.binary);
        if let Some(code) = stdout_line_or_exit(&line)? {
            return Ok(code);
        }
    }
    Ok(exit_code)
}

fn run_explain(code: &str) -> Result<i32> {
    let Some(explanation) = explain_error_code(code) else {
        return Err(WebUiError::InvalidInput(format!(
            "unknown error code `{}`; known codes: {}",
            code.trim(),
            known_error_codes().join(", ")
        )));
    };
    Ok(stdout_line_or_exit(explanation)?.unwrap_or(0))
}

fn run_version(json: bool) -> Result<i32> {
    let report = VersionReport {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        config_file: CONFIG_FILE_NAME,
        config_env: CONFIG_ENV_VAR,
    };
    let line = if json {
        serde_json::to_string_pretty(&report)?
    } else {
        format!("{} {}", report.name, report.version)
    };
    Ok(stdout_line_or_exit(&line)?.unwrap_or(0))
}

fn load_config(cli: &Cli) -> Result<WebUiConfig> {
    let cwd = std::env::current_dir()?;
    let env_path = read_config_env_var()?;
    let selection = resolve_config_path(
        cli.config.as_deref(),
        env_path.as_deref(),
        cli.no_config,
        &cwd,
    )?;
    debug!(source = ?selection.source, path = ?selection.path, "config selected");
    WebUiConfig::from_selection(&selection)
}

fn read_config_env_var() -> Result<Option<String>> {
    match std::env::var(CONFIG_ENV_VAR) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(WebUiError::InvalidInput(format!(
            "{CONFIG_ENV_VAR} must be valid UTF-8"
        ))),
    }
}

/// Writes one stdout line. `Some(0)` means the reader closed the pipe.
fn stdout_line_or_exit(line: &str) -> Result<Option<i32>> {
    match output::stdout_line(line) {
        Ok(OutputStatus::Written) => Ok(None),
        Ok(OutputStatus::BrokenPipe) => Ok(Some(0)),
        Err(error) => Err(WebUiError::Io(error)),
    }
}
