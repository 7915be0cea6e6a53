use serde::{Deserialize, Serialize};

/// Browser-assigned tab identifier.
pub type TabId = i64;

/// Browser-assigned window identifier.
pub type WindowId = i64;

/// A browser tab as reported by the tab host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BrowserTab {
    pub id: TabId,
    pub url: String,
    pub window_id: WindowId,
    pub active: bool,
    /// Milliseconds since the Unix epoch at which the tab was last accessed.
    pub last_accessed: i64,
}

/// A component's belief about which tab is the controllable YouTube tab.
///
/// Communicated by value only. Valid while the underlying tab exists and its
/// URL still matches a watch page; consumers re-validate before acting on it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackedTab {
    pub tab_id: TabId,
    pub url: String,
}

impl From<&BrowserTab> for TrackedTab {
    fn from(tab: &BrowserTab) -> Self {
        Self {
            tab_id: tab.id,
            url: tab.url.clone(),
        }
    }
}

/// Filter for a tab enumeration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabQuery {
    /// Match-pattern the tab URL must satisfy (e.g. `*://www.youtube.com/watch*`).
    pub url_pattern: Option<String>,
    /// Restrict to active (or inactive) tabs.
    pub active: Option<bool>,
    /// Restrict to the currently focused window.
    pub current_window: bool,
}

impl TabQuery {
    pub fn url(pattern: &str) -> Self {
        Self {
            url_pattern: Some(pattern.to_string()),
            ..Self::default()
        }
    }

    pub fn active_in_current_window(pattern: &str) -> Self {
        Self {
            url_pattern: Some(pattern.to_string()),
            active: Some(true),
            current_window: true,
        }
    }
}

/// Subset of tab properties reported by an update event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabChange {
    /// Load status, `"loading"` or `"complete"`.
    pub status: Option<String>,
    /// New URL, when the tab navigated.
    pub url: Option<String>,
}

impl TabChange {
    pub fn is_complete(&self) -> bool {
        self.status.as_deref() == Some("complete")
    }
}

/// Tab and window lifecycle events fed to the background coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum TabEvent {
    Created(BrowserTab),
    Updated {
        tab_id: TabId,
        change: TabChange,
        tab: BrowserTab,
    },
    Activated {
        tab_id: TabId,
        window_id: WindowId,
    },
    Removed(TabId),
    /// `None` means every browser window lost focus.
    WindowFocusChanged(Option<WindowId>),
}
