use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::CommandError;
use super::player::{PlayerState, VideoProgress};

/// Keyboard-shortcut command names declared by the extension manifest.
pub const SHORTCUT_COMMANDS: &[&str] = &[
    "play-pause",
    "stop-video",
    "restart-video",
    "next-video",
    "previous-video",
    "toggle-mute",
    "volume-up",
    "volume-down",
    "speed-up",
    "speed-down",
    "skip-forward",
    "skip-backward",
    "theater-mode",
];

/// One playback action a page can execute, or a state query.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    GetPlayerState,
    GetVideoProgress,
    PlayPause,
    Next,
    Previous,
    Mute,
    /// Volume in percent; clamped to 0-100 by the page.
    SetVolume(f64),
    VolumeUp,
    VolumeDown,
    /// Playback rate; clamped to 0.25-2 and snapped to 0.25 steps by the page.
    SetSpeed(f64),
    SpeedUp,
    SpeedDown,
    /// Absolute position in seconds.
    Seek(f64),
    /// Relative jump in seconds, negative to rewind.
    Skip(f64),
    SkipForward,
    SkipBackward,
    Restart,
    TheaterToggle,
    /// Navigate back in the page's history.
    Back,
}

impl CommandKind {
    /// Canonical action name used on the wire.
    pub fn action(&self) -> &'static str {
        match self {
            CommandKind::GetPlayerState => "getPlayerState",
            CommandKind::GetVideoProgress => "getVideoProgress",
            CommandKind::PlayPause => "clickPlayPause",
            CommandKind::Next => "clickNext",
            CommandKind::Previous => "clickPrevious",
            CommandKind::Mute => "clickMute",
            CommandKind::SetVolume(_) => "setVolume",
            CommandKind::VolumeUp => "volume-up",
            CommandKind::VolumeDown => "volume-down",
            CommandKind::SetSpeed(_) => "setPlaybackSpeed",
            CommandKind::SpeedUp => "speed-up",
            CommandKind::SpeedDown => "speed-down",
            CommandKind::Seek(_) => "seekTo",
            CommandKind::Skip(_) => "skip",
            CommandKind::SkipForward => "skip-forward",
            CommandKind::SkipBackward => "skip-backward",
            CommandKind::Restart => "restart-video",
            CommandKind::TheaterToggle => "toggleTheaterMode",
            CommandKind::Back => "clickBack",
        }
    }

    /// Decode a page request, accepting both popup action names and
    /// keyboard-shortcut command names.
    pub fn from_request(request: &PageRequest) -> Result<Self, CommandError> {
        let action = request.action.as_str();
        let kind = match action {
            "getPlayerState" => CommandKind::GetPlayerState,
            "getVideoProgress" => CommandKind::GetVideoProgress,
            "clickPlayPause" | "play-pause" | "stop-video" => CommandKind::PlayPause,
            "clickNext" | "next-video" => CommandKind::Next,
            "clickPrevious" | "previous-video" => CommandKind::Previous,
            "clickMute" | "toggle-mute" => CommandKind::Mute,
            "setVolume" => CommandKind::SetVolume(request.number(action, "volume")?),
            "volume-up" => CommandKind::VolumeUp,
            "volume-down" => CommandKind::VolumeDown,
            "setPlaybackSpeed" => CommandKind::SetSpeed(request.number(action, "speed")?),
            "speed-up" => CommandKind::SpeedUp,
            "speed-down" => CommandKind::SpeedDown,
            "seekTo" => CommandKind::Seek(request.number(action, "time")?),
            "skip" => CommandKind::Skip(request.number(action, "seconds")?),
            "skip-forward" => CommandKind::SkipForward,
            "skip-backward" => CommandKind::SkipBackward,
            "restart-video" => CommandKind::Restart,
            "toggleTheaterMode" | "theater-mode" => CommandKind::TheaterToggle,
            "clickBack" => CommandKind::Back,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(kind)
    }

    /// Resolve a keyboard-shortcut command name.
    pub fn from_shortcut(name: &str) -> Option<Self> {
        if !SHORTCUT_COMMANDS.contains(&name) {
            return None;
        }
        Self::from_request(&PageRequest::new(name)).ok()
    }

    /// Encode as a page request.
    pub fn to_request(&self) -> PageRequest {
        let request = PageRequest::new(self.action());
        match self {
            CommandKind::SetVolume(v) => request.with_param("volume", *v),
            CommandKind::SetSpeed(s) => request.with_param("speed", *s),
            CommandKind::Seek(t) => request.with_param("time", *t),
            CommandKind::Skip(s) => request.with_param("seconds", *s),
            _ => request,
        }
    }
}

/// A request addressed to a page: `{action: <name>, ...params}`.
///
/// Pages also accept the name under `command`, which is how keyboard
/// shortcuts are forwarded.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub action: String,
    pub params: Map<String, Value>,
}

impl PageRequest {
    pub fn new(action: &str) -> Self {
        Self {
            action: action.to_string(),
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Decode from a JSON record. `action` wins over `command` when both are present.
    pub fn from_value(value: &Value) -> Result<Self, CommandError> {
        let obj = value.as_object().ok_or(CommandError::MissingName)?;
        let name = obj
            .get("action")
            .and_then(|v| v.as_str())
            .or_else(|| obj.get("command").and_then(|v| v.as_str()))
            .ok_or(CommandError::MissingName)?;
        let params = obj
            .iter()
            .filter(|(k, _)| k.as_str() != "action" && k.as_str() != "command")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Self {
            action: name.to_string(),
            params,
        })
    }

    /// Encode as a flat JSON record.
    pub fn to_value(&self) -> Value {
        let mut obj = self.params.clone();
        obj.insert("action".to_string(), Value::String(self.action.clone()));
        Value::Object(obj)
    }

    fn number(&self, action: &str, param: &'static str) -> Result<f64, CommandError> {
        self.params
            .get(param)
            .and_then(|v| v.as_f64())
            .filter(|n| n.is_finite())
            .ok_or_else(|| CommandError::InvalidParam {
                action: action.to_string(),
                param,
            })
    }
}

/// `state` carries either a full player snapshot (state queries) or the
/// resulting button label (play-pause, mute).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ResponseState {
    Player(PlayerState),
    Label(String),
}

/// A page's answer to a [`PageRequest`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PageResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ResponseState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<VideoProgress>,
}

impl PageResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn from_success(success: bool) -> Self {
        Self {
            success,
            ..Self::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_player(mut self, state: PlayerState) -> Self {
        self.state = Some(ResponseState::Player(state));
        self
    }

    pub fn with_label(mut self, label: String) -> Self {
        self.state = Some(ResponseState::Label(label));
        self
    }

    pub fn player_state(&self) -> Option<&PlayerState> {
        match &self.state {
            Some(ResponseState::Player(state)) => Some(state),
            _ => None,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match &self.state {
            Some(ResponseState::Label(label)) => Some(label),
            _ => None,
        }
    }
}
