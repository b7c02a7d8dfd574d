//! Path utilities for launcher configuration.

use std::path::{Path, PathBuf};

/// Get the launcher config directory (`~/.config/horde-launch/` on Linux).
///
/// Falls back to `./.horde-launch` when the platform has no config directory.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("horde-launch"))
        .unwrap_or_else(|| PathBuf::from(".horde-launch"))
}

/// Get the default config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.json")
}

/// Check whether a path names a Python script.
pub fn is_python_script(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("py"))
        .unwrap_or(false)
}

/// Check whether a path carries the given extension, ignoring case.
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}
