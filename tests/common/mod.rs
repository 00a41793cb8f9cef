pub mod mock;

use std::{fs, path::Path};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Writes an executable shell script.
#[cfg(unix)]
#[allow(dead_code)]
pub fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap_or_else(|error| {
        panic!("failed to write script {}: {error}", path.display())
    });
    let mut permissions = fs::metadata(path).unwrap().permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(path, permissions).unwrap();
}

/// Reads one recorded argv file (one argument per line).
#[allow(dead_code)]
pub fn read_args(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_else(|error| panic!("missing argv log {}: {error}", path.display()))
        .lines()
        .map(ToOwned::to_owned)
        .collect()
}

/// Returns a path as an owned UTF-8 string.
#[allow(dead_code)]
pub fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
