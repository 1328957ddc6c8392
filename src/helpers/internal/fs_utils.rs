//! Common filesystem utilities

use std::path::Path;

/// Permission bits for installed executables
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Set file permissions (Unix only).
///
/// No-op on non-Unix platforms.
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
pub fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(()) // No-op on non-Unix
}

/// Whether `dir` appears in the `PATH` environment variable.
pub fn dir_on_path(dir: &Path) -> bool {
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    let wanted = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    std::env::split_paths(&path).any(|entry| {
        let entry = entry.canonicalize().unwrap_or(entry);
        entry == wanted
    })
}
