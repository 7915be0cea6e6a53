use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::ConfigError;

/// Timing and step constants for every context, loaded from TOML.
///
/// All durations are in milliseconds. Missing keys take their default.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControllerConfig {
    pub background: BackgroundConfig,
    pub session: SessionConfig,
    pub probe: ProbeConfig,
}

/// Background coordinator timings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Period of the background detection poll.
    pub detection_poll_ms: u64,
    /// Round-trip timeout for page probes issued by the background.
    pub probe_timeout_ms: u64,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            detection_poll_ms: 3000,
            probe_timeout_ms: 2000,
        }
    }
}

/// Popup connection session timings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Liveness check period while connected (detection period while disconnected).
    pub liveness_period_ms: u64,
    /// Consecutive liveness failures before the session disconnects.
    pub liveness_failure_threshold: u32,
    /// Delays before each confirmation retry, after the immediate attempt.
    pub confirm_retry_delays_ms: Vec<u64>,
    /// Round-trip timeout for page probes issued by the popup.
    pub probe_timeout_ms: u64,
    /// Delay before confirming a tab announced by `NEW_YOUTUBE_TAB`.
    pub new_tab_delay_ms: u64,
    /// Delay before confirming a tab announced by `YOUTUBE_TAB_ACTIVATED`.
    pub activation_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            liveness_period_ms: 2000,
            liveness_failure_threshold: 2,
            confirm_retry_delays_ms: vec![1000, 1500],
            probe_timeout_ms: 2000,
            new_tab_delay_ms: 500,
            activation_delay_ms: 300,
        }
    }
}

/// Step sizes used by the page probe for relative commands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProbeConfig {
    pub skip_seconds: f64,
    /// Percent.
    pub volume_step: f64,
    pub speed_step: f64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            skip_seconds: 10.0,
            volume_step: 10.0,
            speed_step: 0.25,
        }
    }
}

impl BackgroundConfig {
    pub fn detection_poll(&self) -> Duration {
        Duration::from_millis(self.detection_poll_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl SessionConfig {
    pub fn liveness_period(&self) -> Duration {
        Duration::from_millis(self.liveness_period_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn confirm_retry_delays(&self) -> Vec<Duration> {
        self.confirm_retry_delays_ms
            .iter()
            .map(|ms| Duration::from_millis(*ms))
            .collect()
    }

    pub fn new_tab_delay(&self) -> Duration {
        Duration::from_millis(self.new_tab_delay_ms)
    }

    pub fn activation_delay(&self) -> Duration {
        Duration::from_millis(self.activation_delay_ms)
    }
}

impl ControllerConfig {
    /// Load config from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&contents).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Save config to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))
    }
}
