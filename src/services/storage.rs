//! Key/value persistence shared by the background and the popup.
//!
//! Mirrors the extension's local storage area: string keys, JSON values.
//! Failures are never fatal; the `*_hint` helpers swallow them and log, so
//! a broken store only degrades the feature to in-memory behaviour.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use serde_json::Value;

use crate::database::Database;
use crate::types::errors::StorageError;
use crate::types::message::{ButtonStateRecord, Notification};
use crate::types::tab::TabId;

/// Persisted key names.
pub mod keys {
    pub const ACTIVE_TAB_ID: &str = "activeTabId";
    pub const SETTINGS: &str = "youtubeControllerSettings";
    pub const LAST_BUTTON_STATE: &str = "lastButtonState";
    pub const STATE_TIMESTAMP: &str = "stateTimestamp";
    pub const AUTO_PAUSE_ENABLED: &str = "autoPauseEnabled";
}

/// Async key/value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-memory store. Contents die with the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// SQLite-backed store surviving restarts.
pub struct SqliteStore {
    db: Mutex<Database>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        Ok(Self {
            db: Mutex::new(Database::open(path)?),
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self {
            db: Mutex::new(Database::open_in_memory()?),
        })
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let db = self
            .db
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        let raw: Option<String> = db
            .connection()
            .query_row("SELECT value FROM kv_store WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        raw.map(|text| {
            serde_json::from_str(&text).map_err(|e| StorageError::SerializationError(e.to_string()))
        })
        .transpose()
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let text = serde_json::to_string(&value)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        let db = self
            .db
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        db.connection().execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, text, Self::now()],
        )?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let db = self
            .db
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        db.connection()
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// Read the `activeTabId` hint. Storage failures read as "no hint".
pub async fn load_hint(store: &dyn KeyValueStore) -> Option<TabId> {
    match store.get(keys::ACTIVE_TAB_ID).await {
        Ok(value) => value.and_then(|v| v.as_i64()),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read active tab hint");
            None
        }
    }
}

/// Persist the `activeTabId` hint, logging failures.
pub async fn save_hint(store: &dyn KeyValueStore, tab_id: TabId) {
    if let Err(e) = store.set(keys::ACTIVE_TAB_ID, Value::from(tab_id)).await {
        tracing::warn!(tab_id, error = %e, "failed to persist active tab hint");
    }
}

/// Remove the `activeTabId` hint, logging failures.
pub async fn clear_hint(store: &dyn KeyValueStore) {
    if let Err(e) = store.remove(keys::ACTIVE_TAB_ID).await {
        tracing::warn!(error = %e, "failed to clear active tab hint");
    }
}

/// Persist a page's button broadcast as `lastButtonState` + `stateTimestamp`.
pub async fn save_button_state(store: &dyn KeyValueStore, record: &ButtonStateRecord) {
    let message = Notification::ButtonStateChanged {
        button: record.button.clone(),
        state: record.state.clone(),
    };
    let value = match serde_json::to_value(&message) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode button state");
            return;
        }
    };
    if let Err(e) = store.set(keys::LAST_BUTTON_STATE, value).await {
        tracing::warn!(error = %e, "failed to persist button state");
        return;
    }
    if let Err(e) = store
        .set(keys::STATE_TIMESTAMP, Value::from(record.timestamp))
        .await
    {
        tracing::warn!(error = %e, "failed to persist button state timestamp");
    }
}

/// Read the last persisted button broadcast, if any.
pub async fn load_button_state(store: &dyn KeyValueStore) -> Option<ButtonStateRecord> {
    let message = match store.get(keys::LAST_BUTTON_STATE).await {
        Ok(value) => value?,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read button state");
            return None;
        }
    };
    let Ok(Notification::ButtonStateChanged { button, state }) = serde_json::from_value(message)
    else {
        return None;
    };
    let timestamp = store
        .get(keys::STATE_TIMESTAMP)
        .await
        .ok()
        .flatten()
        .and_then(|v| v.as_i64())
        .unwrap_or_default();
    Some(ButtonStateRecord {
        button,
        state,
        timestamp,
    })
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
