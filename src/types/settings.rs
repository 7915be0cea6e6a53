use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Shortest accepted cosmetic refresh period, in milliseconds.
pub const MIN_UPDATE_INTERVAL_MS: u64 = 100;

/// User preferences persisted under `youtubeControllerSettings`.
///
/// Stored records are merged over the defaults, so fields missing from an
/// older record keep their default value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ControllerSettings {
    pub auto_pause: bool,
    pub theater_mode: bool,
    pub auto_detect: bool,
    pub dark_mode: bool,
    /// Volume change per step of the volume buttons, in percent.
    pub volume_step: u8,
    /// Cosmetic position refresh period, in milliseconds.
    pub update_interval: u64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            auto_pause: false,
            theater_mode: false,
            auto_detect: true,
            dark_mode: true,
            volume_step: 10,
            update_interval: 1000,
        }
    }
}

impl ControllerSettings {
    /// Cosmetic refresh period, never shorter than [`MIN_UPDATE_INTERVAL_MS`].
    pub fn refresh_period(&self) -> Duration {
        Duration::from_millis(self.update_interval.max(MIN_UPDATE_INTERVAL_MS))
    }
}
