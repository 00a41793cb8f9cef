use std::{
    fs,
    net::SocketAddr,
    path::{Component, Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, WebUiError},
    types::Tool,
};

const CONFIG_VERSION_V1: u32 = 1;
const DEFAULT_SERVER_BIND: &str = "127.0.0.1:8000";
const DEFAULT_SERVER_WORKERS: usize = 2;
const DEFAULT_REQUEST_LIMIT_BYTES: usize = 64 * 1024;
const DEFAULT_SHUTDOWN_TIMEOUT_SECONDS: u64 = 5;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".gocryptfs-webui.toml";
/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "GOCRYPTFS_WEBUI_CONFIG";

/// Source used to select the effective config file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConfigSource {
    /// Selected via `--config` CLI flag.
    Flag,
    /// Selected via `GOCRYPTFS_WEBUI_CONFIG`.
    Env,
    /// Selected by walking from the current working directory to root.
    Discovered,
    /// No config file selected.
    None,
}

/// Resolved config selection before parsing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigSelection {
    /// Source used for selection.
    pub source: ConfigSource,
    /// Selected path when a config file was found.
    pub path: Option<PathBuf>,
}

/// Raw TOML shape for one `.gocryptfs-webui.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WebUiConfigFile {
    /// Schema version.
    pub version: u32,
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfigFile,
    /// External tool overrides.
    #[serde(default)]
    pub tools: ToolsConfigFile,
    /// Browser UI switches.
    #[serde(default)]
    pub ui: UiConfigFile,
}

/// Raw `[server]` section from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfigFile {
    /// Loopback bind address.
    pub bind: Option<String>,
    /// Actix worker count.
    pub workers: Option<usize>,
    /// Maximum JSON body size in bytes.
    pub request_limit_bytes: Option<usize>,
    /// Graceful shutdown window.
    pub shutdown_timeout_seconds: Option<u64>,
}

/// Raw `[tools]` section from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfigFile {
    /// gocryptfs binary name or path.
    pub gocryptfs: Option<String>,
    /// fusermount binary name or path.
    pub fusermount: Option<String>,
    /// findmnt binary name or path.
    pub findmnt: Option<String>,
    /// zenity binary name or path.
    pub zenity: Option<String>,
}

/// Raw `[ui]` section from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UiConfigFile {
    /// Enables the zenity folder picker.
    pub folder_picker: Option<bool>,
}

/// Effective server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// Loopback bind address.
    pub bind: SocketAddr,
    /// Actix worker count.
    pub workers: usize,
    /// Maximum JSON body size in bytes.
    pub request_limit_bytes: usize,
    /// Graceful shutdown window in seconds.
    pub shutdown_timeout_seconds: u64,
}

/// Effective external tool names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolsConfig {
    /// gocryptfs binary.
    pub gocryptfs: String,
    /// fusermount binary.
    pub fusermount: String,
    /// findmnt binary.
    pub findmnt: String,
    /// zenity binary.
    pub zenity: String,
}

impl ToolsConfig {
    /// Returns the configured binary for one tool.
    pub fn binary(&self, tool: Tool) -> &str {
        match tool {
            Tool::Gocryptfs => &self.gocryptfs,
            Tool::Fusermount => &self.fusermount,
            Tool::Findmnt => &self.findmnt,
            Tool::Zenity => &self.zenity,
        }
    }
}

/// Effective UI switches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UiConfig {
    /// Enables the zenity folder picker.
    pub folder_picker: bool,
}

/// Effective and validated configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebUiConfig {
    /// Absolute config file path, when one was loaded.
    pub source_path: Option<PathBuf>,
    /// HTTP server settings.
    pub server: ServerConfig,
    /// External tool names.
    pub tools: ToolsConfig,
    /// UI switches.
    pub ui: UiConfig,
}

impl WebUiConfig {
    /// Built-in defaults used when no config file is selected.
    pub fn defaults() -> Result<Self> {
        build_config(
            WebUiConfigFile {
                version: CONFIG_VERSION_V1,
                server: ServerConfigFile::default(),
                tools: ToolsConfigFile::default(),
                ui: UiConfigFile::default(),
            },
            None,
        )
    }

    /// Loads and validates a config file from disk.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let absolute_path = absolutize_path(path.as_ref(), &cwd);
        if !absolute_path.exists() {
            return Err(WebUiError::InvalidInput(format!(
                "config file does not exist: {}",
                absolute_path.display()
            )));
        }

        let raw = fs::read_to_string(&absolute_path)?;
        Self::parse_from_str(&raw, &absolute_path)
    }

    /// Parses and validates config from TOML text.
    pub fn parse_from_str(raw: &str, source_path: impl AsRef<Path>) -> Result<Self> {
        let parsed = toml::from_str::<WebUiConfigFile>(raw)
            .map_err(|error| WebUiError::InvalidInput(format!("invalid config TOML: {error}")))?;
        build_config(parsed, Some(source_path.as_ref()))
    }

    /// Loads the config selected by `resolve_config_path`, or the defaults.
    pub fn from_selection(selection: &ConfigSelection) -> Result<Self> {
        match selection.path.as_deref() {
            Some(path) => Self::load_from_path(path),
            None => Self::defaults(),
        }
    }
}

/// Selects the config file: `--config`, then the env var, then discovery.
pub fn resolve_config_path(
    explicit_path: Option<&Path>,
    env_path: Option<&str>,
    no_config: bool,
    cwd: impl AsRef<Path>,
) -> Result<ConfigSelection> {
    if no_config {
        return Ok(ConfigSelection {
            source: ConfigSource::None,
            path: None,
        });
    }

    let cwd = cwd.as_ref();
    if let Some(path) = explicit_path {
        return Ok(ConfigSelection {
            source: ConfigSource::Flag,
            path: Some(regular_file_candidate(path, cwd)?),
        });
    }

    if let Some(value) = env_path {
        if value.trim().is_empty() {
            return Err(WebUiError::InvalidInput(format!(
                "{CONFIG_ENV_VAR} cannot be empty"
            )));
        }
        return Ok(ConfigSelection {
            source: ConfigSource::Env,
            path: Some(regular_file_candidate(Path::new(value), cwd)?),
        });
    }

    if let Some(discovered) = discover_config(cwd) {
        return Ok(ConfigSelection {
            source: ConfigSource::Discovered,
            path: Some(discovered),
        });
    }

    Ok(ConfigSelection {
        source: ConfigSource::None,
        path: None,
    })
}

/// Walks from `start_dir` towards `/` looking for `.gocryptfs-webui.toml`.
pub fn discover_config(start_dir: impl AsRef<Path>) -> Option<PathBuf> {
    let mut current = start_dir.as_ref();
    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if is_regular_config_candidate(&candidate) {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

/// Parses a bind address and requires a loopback IP with a non-zero port.
pub fn parse_bind(bind: &str) -> Result<SocketAddr> {
    let bind_addr = bind
        .parse::<SocketAddr>()
        .map_err(|error| WebUiError::InvalidInput(format!("invalid bind address: {error}")))?;
    if bind_addr.port() == 0 {
        return Err(WebUiError::InvalidInput(
            "bind port must be non-zero".to_owned(),
        ));
    }
    if !bind_addr.ip().is_loopback() {
        return Err(WebUiError::InvalidInput(
            "bind address must be loopback".to_owned(),
        ));
    }
    Ok(bind_addr)
}

fn build_config(raw: WebUiConfigFile, source_path: Option<&Path>) -> Result<WebUiConfig> {
    if raw.version != CONFIG_VERSION_V1 {
        return Err(WebUiError::InvalidInput(format!(
            "unsupported config version {} (expected {CONFIG_VERSION_V1})",
            raw.version
        )));
    }

    Ok(WebUiConfig {
        source_path: source_path.map(Path::to_path_buf),
        server: resolve_server_config(&raw.server)?,
        tools: resolve_tools_config(&raw.tools)?,
        ui: UiConfig {
            folder_picker: raw.ui.folder_picker.unwrap_or(true),
        },
    })
}

fn resolve_server_config(raw: &ServerConfigFile) -> Result<ServerConfig> {
    let bind = parse_bind(raw.bind.as_deref().unwrap_or(DEFAULT_SERVER_BIND))?;

    let workers = raw.workers.unwrap_or(DEFAULT_SERVER_WORKERS);
    if workers == 0 {
        return Err(WebUiError::InvalidInput(
            "server workers must be greater than zero".to_owned(),
        ));
    }

    let request_limit_bytes = raw
        .request_limit_bytes
        .unwrap_or(DEFAULT_REQUEST_LIMIT_BYTES);
    if request_limit_bytes == 0 {
        return Err(WebUiError::InvalidInput(
            "server request_limit_bytes must be greater than zero".to_owned(),
        ));
    }

    Ok(ServerConfig {
        bind,
        workers,
        request_limit_bytes,
        shutdown_timeout_seconds: raw
            .shutdown_timeout_seconds
            .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECONDS),
    })
}

fn resolve_tools_config(raw: &ToolsConfigFile) -> Result<ToolsConfig> {
    let tool = |value: &Option<String>, tool: Tool| -> Result<String> {
        match value.as_deref().map(str::trim) {
            None => Ok(tool.default_binary().to_owned()),
            Some("") => Err(WebUiError::InvalidInput(format!(
                "tools.{tool} cannot be empty"
            ))),
            Some(binary) => Ok(binary.to_owned()),
        }
    };
    Ok(ToolsConfig {
        gocryptfs: tool(&raw.gocryptfs, Tool::Gocryptfs)?,
        fusermount: tool(&raw.fusermount, Tool::Fusermount)?,
        findmnt: tool(&raw.findmnt, Tool::Findmnt)?,
        zenity: tool(&raw.zenity, Tool::Zenity)?,
    })
}

fn regular_file_candidate(path: &Path, cwd: &Path) -> Result<PathBuf> {
    let candidate = absolutize_path(path, cwd);
    if !is_regular_config_candidate(&candidate) {
        return Err(WebUiError::InvalidInput(format!(
            "config file must be a regular file: {}",
            candidate.display()
        )));
    }
    Ok(candidate)
}

fn normalize_path(path: &Path) -> PathBuf {
    let is_absolute = path.is_absolute();
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() && !is_absolute {
                    normalized.push("..");
                }
            }
            Component::Normal(part) => normalized.push(part),
        }
    }

    if normalized.as_os_str().is_empty() {
        return PathBuf::from(if is_absolute { "/" } else { "." });
    }
    normalized
}

fn absolutize_path(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&cwd.join(path))
    }
}

fn is_regular_config_candidate(path: &Path) -> bool {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return false;
    };
    !metadata.file_type().is_symlink() && metadata.file_type().is_file()
}
