//! Configuration and log file locations
//!
//! Linux: `~/.config/obrc-harness/`
//! macOS: `~/Library/Application Support/obrc-harness/`
//! Windows: `%APPDATA%\obrc-harness\`

use std::path::{Path, PathBuf};

/// Name used for the configuration directory
const APP_NAME: &str = "obrc-harness";

/// Configuration file looked up in the current directory before the
/// platform configuration directory
pub const LOCAL_CONFIG_FILE: &str = "obrc-harness.toml";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the user-wide configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Find the configuration file to load when none was given explicitly
///
/// `./obrc-harness.toml` wins over the user-wide file.
pub fn discover_config(cwd: &Path) -> Option<PathBuf> {
    let local = cwd.join(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }
    config_path().filter(|path| path.is_file())
}

/// Resolve `path` against `base` unless it is already absolute
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
