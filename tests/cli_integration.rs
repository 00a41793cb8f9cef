mod common;

use std::{fs, net::TcpListener, path::Path};

use assert_cmd::Command;

fn webui() -> Command {
    let mut command = Command::new(assert_cmd::cargo::cargo_bin!("gocryptfs-webui"));
    command.env_remove("GOCRYPTFS_WEBUI_CONFIG").env_remove("RUST_LOG");
    command
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn reserve_loopback_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

#[test]
fn version_prints_package_version() {
    let output = webui().arg("version").output().unwrap();
    assert!(output.status.success());
    assert_eq!(
        stdout_of(&output).trim(),
        format!("gocryptfs-webui {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn version_json_is_structured() {
    let output = webui().args(["version", "--json"]).output().unwrap();
    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["name"], "gocryptfs-webui");
    assert_eq!(payload["config_file"], ".gocryptfs-webui.toml");
    assert_eq!(payload["config_env"], "GOCRYPTFS_WEBUI_CONFIG");
}

#[test]
fn explain_known_and_unknown_codes() {
    let output = webui().args(["explain", "e401"]).output().unwrap();
    assert!(output.status.success());
    assert!(!stdout_of(&output).trim().is_empty());

    let output = webui().args(["explain", "E777"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr_of(&output);
    assert!(stderr.starts_with("error[E100]: unknown error code `E777`"));
    assert!(stderr.contains("E302"));
}

#[test]
fn json_error_format_is_machine_readable() {
    let output = webui()
        .args(["--error-format", "json", "explain", "E777"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let payload: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(payload["error"]["code"], "E100");
    assert_eq!(payload["error"]["explain"], "gocryptfs-webui explain E100");
}

#[test]
fn serve_check_binds_and_exits() {
    let bind = format!("127.0.0.1:{}", reserve_loopback_port());
    let output = webui()
        .args(["--no-config", "serve", "--check", "--bind", &bind])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert_eq!(stdout_of(&output).trim(), "ok");
}

#[test]
fn serve_rejects_non_loopback_bind() {
    let output = webui()
        .args(["--no-config", "serve", "--check", "--bind", "0.0.0.0:8000"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        stderr_of(&output).trim(),
        "error[E100]: bind address must be loopback"
    );
}

#[test]
fn serve_check_reads_discovered_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(
        temp_dir.path().join(".gocryptfs-webui.toml"),
        "version = 1\n[server]\nbind = \"10.0.0.1:8000\"\n",
    )
    .unwrap();

    let output = webui()
        .current_dir(temp_dir.path())
        .args(["serve", "--check"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("bind address must be loopback"));
}

#[test]
fn invalid_config_file_is_reported() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = temp_dir.path().join("webui.toml");
    fs::write(&config, "version = 1\nunknown = true\n").unwrap();

    let output = webui()
        .env("GOCRYPTFS_WEBUI_CONFIG", &config)
        .args(["check"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).starts_with("error[E100]: invalid config TOML"));
}

#[cfg(unix)]
fn write_tool(dir: &Path, name: &str) {
    common::write_script(&dir.join(name), "#!/bin/sh\nexit 0\n");
}

#[cfg(unix)]
#[test]
fn check_reports_tools_from_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let bin_dir = temp_dir.path().join("bin");
    fs::create_dir_all(&bin_dir).unwrap();
    write_tool(&bin_dir, "gocryptfs");
    write_tool(&bin_dir, "fusermount");
    let config = temp_dir.path().join("webui.toml");
    fs::write(
        &config,
        format!(
            "version = 1\n[tools]\ngocryptfs = \"{bin}/gocryptfs\"\nfusermount = \"{bin}/fusermount\"\nfindmnt = \"{bin}/findmnt\"\nzenity = \"{bin}/zenity\"\n",
            bin = bin_dir.display()
        ),
    )
    .unwrap();

    let output = webui()
        .arg("--config")
        .arg(&config)
        .args(["check", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["ok"], true);
    let tools = report["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 4);
    assert_eq!(tools[0]["tool"], "gocryptfs");
    assert_eq!(tools[0]["available"], true);
    assert_eq!(tools[2]["tool"], "findmnt");
    assert_eq!(tools[2]["available"], false);
    assert_eq!(tools[2]["required"], false);

    fs::remove_file(bin_dir.join("fusermount")).unwrap();
    let output = webui()
        .arg("--config")
        .arg(&config)
        .arg("check")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stdout = stdout_of(&output);
    assert!(stdout
        .lines()
        .any(|line| line.starts_with("fusermount") && line.contains("missing")));
    assert!(stdout
        .lines()
        .any(|line| line.starts_with("zenity") && line.contains("missing (optional)")));
}

#[test]
fn missing_subcommand_prints_help() {
    let output = webui().output().unwrap();
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("Usage"));
}
