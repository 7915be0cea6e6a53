use serde::{Deserialize, Serialize};

/// Snapshot of a page's player, produced fresh on every query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerState {
    pub is_valid_page: bool,
    pub is_ready: bool,
    pub is_playing: bool,
    pub is_muted: bool,
    /// Volume in percent, 0-100.
    pub volume: u8,
    pub playback_rate: f64,
    /// Seconds.
    pub current_time: f64,
    /// Seconds, 0 when unknown.
    pub duration: f64,
    /// End of the last buffered range, in seconds.
    pub buffered: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlayerState {
    /// State reported by a page that is not a video page.
    pub fn invalid_page() -> Self {
        Self {
            error: Some("Not on a YouTube video page".to_string()),
            ..Self::default()
        }
    }

    /// State reported by a video page whose player is not yet present.
    pub fn loading() -> Self {
        Self {
            is_valid_page: true,
            error: Some("Video player still loading...".to_string()),
            ..Self::default()
        }
    }

    /// Playback position as a percentage of the duration, if the duration is known.
    pub fn progress_percent(&self) -> Option<f64> {
        if self.duration > 0.0 && self.duration.is_finite() {
            Some((self.current_time / self.duration) * 100.0)
        } else {
            None
        }
    }
}

/// Position/duration pair answered by `getVideoProgress`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoProgress {
    pub current_time: f64,
    pub duration: f64,
    /// Percent, 0-100.
    pub progress: f64,
}

/// Format seconds as `m:ss` for position and duration displays.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}
