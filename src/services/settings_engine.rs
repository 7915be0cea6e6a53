// YouTube Controller Settings Engine
// Manages user settings: loading, saving, updating individual values, and resetting to defaults.
// Settings are stored as one JSON record under `youtubeControllerSettings` in the key/value store.

use std::sync::Arc;

use async_trait::async_trait;

use crate::services::storage::{keys, KeyValueStore};
use crate::types::errors::SettingsError;
use crate::types::settings::{ControllerSettings, MIN_UPDATE_INTERVAL_MS};

/// Trait defining the settings engine interface.
#[async_trait]
pub trait SettingsEngineTrait {
    async fn load(&mut self) -> Result<ControllerSettings, SettingsError>;
    async fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &ControllerSettings;
    async fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError>;
    async fn reset(&mut self) -> Result<(), SettingsError>;
}

/// Settings engine persisting through a [`KeyValueStore`].
///
/// A store that cannot be read or written only costs persistence: the
/// in-memory settings keep working for the lifetime of the engine.
pub struct SettingsEngine {
    store: Arc<dyn KeyValueStore>,
    settings: ControllerSettings,
}

impl SettingsEngine {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            settings: ControllerSettings::default(),
        }
    }

    /// Save, logging instead of failing when the store is unavailable.
    async fn persist(&self) {
        if let Err(e) = self.save().await {
            tracing::warn!(error = %e, "settings not persisted, keeping in-memory copy");
        }
    }
}

#[async_trait]
impl SettingsEngineTrait for SettingsEngine {
    /// Loads settings from the store, merged over the defaults.
    ///
    /// A missing record or an unreadable store yields the defaults.
    /// A record of the wrong shape is a serialization error and leaves the
    /// defaults in place.
    async fn load(&mut self) -> Result<ControllerSettings, SettingsError> {
        let stored = match self.store.get(keys::SETTINGS).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read settings, using defaults");
                None
            }
        };

        self.settings = ControllerSettings::default();
        if let Some(value) = stored {
            self.settings = serde_json::from_value(value).map_err(|e| {
                SettingsError::SerializationError(format!("Failed to parse stored settings: {}", e))
            })?;
        }
        Ok(self.settings.clone())
    }

    /// Writes the current settings record to the store.
    async fn save(&self) -> Result<(), SettingsError> {
        let value = serde_json::to_value(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;
        self.store.set(keys::SETTINGS, value).await?;
        Ok(())
    }

    /// Returns a reference to the current in-memory settings.
    fn get_settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Updates one setting by its camelCase key (e.g. `autoDetect`).
    ///
    /// The new value is validated by deserializing the whole record back
    /// into `ControllerSettings`, then persisted.
    async fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError> {
        if key.is_empty() {
            return Err(SettingsError::InvalidKey("Key cannot be empty".to_string()));
        }

        let mut json_value = serde_json::to_value(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        match json_value.as_object_mut() {
            Some(map) if map.contains_key(key) => {
                map.insert(key.to_string(), value);
            }
            _ => {
                return Err(SettingsError::InvalidKey(format!(
                    "Key '{}' not found in settings",
                    key
                )));
            }
        }

        let new_settings: ControllerSettings = serde_json::from_value(json_value).map_err(|e| {
            SettingsError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;
        if new_settings.update_interval < MIN_UPDATE_INTERVAL_MS {
            return Err(SettingsError::InvalidValue(format!(
                "updateInterval must be at least {} ms",
                MIN_UPDATE_INTERVAL_MS
            )));
        }

        self.settings = new_settings;
        self.persist().await;
        Ok(())
    }

    /// Resets all settings to defaults and persists them.
    async fn reset(&mut self) -> Result<(), SettingsError> {
        self.settings = ControllerSettings::default();
        self.persist().await;
        Ok(())
    }
}
