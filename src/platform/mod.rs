// Platform abstraction
// Provides platform-specific paths plus the browser-facing traits and an
// in-memory browser used by the demo binary and the test suites.

use std::path::PathBuf;

pub mod host;
pub mod simulated;

const APP_DIR: &str = "ytcontroller";

/// Returns the platform-specific configuration directory.
///
/// - **Linux**: `~/.config/ytcontroller` (or `$XDG_CONFIG_HOME/ytcontroller`)
/// - **macOS**: `~/Library/Application Support/ytcontroller`
/// - **Windows**: `%APPDATA%/ytcontroller`
pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

/// Returns the platform-specific data directory (holds the key/value database).
pub fn get_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

/// Default location of the TOML config file.
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.toml")
}

/// Default location of the key/value SQLite database.
pub fn get_storage_path() -> PathBuf {
    get_data_dir().join("storage.db")
}
