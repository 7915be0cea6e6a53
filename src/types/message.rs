use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::tab::TabId;

/// Requests sent to the background coordinator over the runtime channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum RuntimeMessage {
    GetActiveTab,
    SendCommand {
        command: String,
        #[serde(default)]
        params: Map<String, Value>,
    },
    SetAutoPause {
        enabled: bool,
    },
    /// Fire-and-forget: a page reporting a button label after a command.
    ButtonStateChanged {
        button: String,
        state: String,
    },
}

/// The background coordinator's answer to a [`RuntimeMessage`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<TabId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl RuntimeResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
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
}

/// Fire-and-forget broadcasts. No response contract; a missing listener is not an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Notification {
    NewYoutubeTab { tab_id: TabId, url: String },
    YoutubeTabActivated { tab_id: TabId, url: String },
    ButtonStateChanged { button: String, state: String },
}

/// Last button label broadcast by a page, persisted for popups opened later.
#[derive(Debug, Clone, PartialEq)]
pub struct ButtonStateRecord {
    pub button: String,
    pub state: String,
    /// Milliseconds since the Unix epoch at which the label was recorded.
    pub timestamp: i64,
}
