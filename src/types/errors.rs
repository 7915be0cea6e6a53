use thiserror::Error;

use super::tab::TabId;

// === TabError ===

/// Errors raised by the browser tab host.
#[derive(Debug, Error)]
pub enum TabError {
    /// Tab with the given ID does not exist (closed, or never existed).
    #[error("Tab not found: {0}")]
    NotFound(TabId),
    /// The tab query could not be executed by the host.
    #[error("Tab query failed: {0}")]
    QueryFailed(String),
}

// === ChannelError ===

/// Errors raised by a cross-context message round-trip.
///
/// These are liveness signals, not hard failures: the receiving context may
/// simply not be loaded yet, or may have been torn down.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// No listener exists on the receiving side (content script not injected, popup closed).
    #[error("No receiver in tab {0}")]
    NoReceiver(TabId),
    /// The receiving tab no longer exists.
    #[error("Tab closed: {0}")]
    TabClosed(TabId),
    /// The round-trip did not complete in time.
    #[error("Message to tab {0} timed out")]
    Timeout(TabId),
    /// The receiver answered, but the answer was not usable.
    #[error("Message rejected: {0}")]
    Rejected(String),
    /// Script injection into the tab failed.
    #[error("Injection into tab {0} failed: {1}")]
    InjectionFailed(TabId, String),
}

// === StorageError ===

/// Errors related to key/value persistence.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing database rejected the operation.
    #[error("Storage database error: {0}")]
    DatabaseError(String),
    /// A stored value could not be encoded or decoded.
    #[error("Storage serialization error: {0}")]
    SerializationError(String),
    /// The store lock was poisoned by a panicking writer.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::DatabaseError(e.to_string())
    }
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Reading or writing the settings record failed.
    #[error("Settings storage error: {0}")]
    Storage(#[from] StorageError),
    /// Failed to serialize or deserialize settings.
    #[error("Settings serialization error: {0}")]
    SerializationError(String),
    /// The provided settings key is invalid.
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    /// The provided settings value is invalid.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}

// === ConfigError ===

/// Errors that can occur when loading or saving the controller config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {0}: {1}")]
    ReadFailed(std::path::PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config {0}: {1}")]
    ParseFailed(std::path::PathBuf, #[source] toml::de::Error),
    #[error("Failed to write config {0}: {1}")]
    WriteFailed(std::path::PathBuf, #[source] std::io::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
}

// === CommandError ===

/// Errors decoding a page command request.
#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    /// The action name is not a known command.
    #[error("Unknown command: {0}")]
    Unknown(String),
    /// The request carried neither `action` nor `command`.
    #[error("Missing command name")]
    MissingName,
    /// A required numeric parameter was absent or not a number.
    #[error("Missing or invalid parameter '{param}' for {action}")]
    InvalidParam { action: String, param: &'static str },
}

// === ShortcutError ===

/// Errors related to keyboard shortcut management.
#[derive(Debug, Error)]
pub enum ShortcutError {
    /// No shortcut command with the given name.
    #[error("Shortcut not found for command: {0}")]
    NotFound(String),
    /// The shortcut keys conflict with an existing binding.
    #[error("Shortcut conflict: {0}")]
    Conflict(String),
    /// The provided key combination is invalid.
    #[error("Invalid shortcut keys: {0}")]
    InvalidKeys(String),
}
