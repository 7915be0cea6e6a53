//! Layered detection of the controllable YouTube tab.
//!
//! Shared by the background registry and the popup session. Strategies run
//! in order and the first that yields a tab wins:
//!
//! 1. a watch-page tab active in the current window;
//! 2. the first watch-page tab (listing order) whose page reports playing;
//! 3. the watch-page tab with the most recent access time, ties going to
//!    the first in listing order.
//!
//! No watch-page tabs at all yields `None`. Reusing a cached belief is the
//! caller's business; this module always looks at the live tab set.

use crate::services::command_relay::CommandRelay;
use crate::services::url_pattern::WATCH_PAGE_PATTERN;
use crate::types::errors::TabError;
use crate::types::tab::{BrowserTab, TabQuery};

/// Which strategy produced a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    ActiveInCurrentWindow,
    Playing,
    MostRecent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub tab: BrowserTab,
    pub strategy: Strategy,
}

/// Pick the most recently accessed tab; the first one wins a tie.
pub fn most_recent(tabs: &[BrowserTab]) -> Option<&BrowserTab> {
    tabs.iter().fold(None, |latest: Option<&BrowserTab>, tab| match latest {
        Some(l) if tab.last_accessed <= l.last_accessed => Some(l),
        _ => Some(tab),
    })
}

pub struct TabDetector {
    relay: CommandRelay,
}

impl TabDetector {
    pub fn new(relay: CommandRelay) -> Self {
        Self { relay }
    }

    pub fn relay(&self) -> &CommandRelay {
        &self.relay
    }

    /// Run the strategies against the live tab set.
    pub async fn detect(&self) -> Result<Option<Detection>, TabError> {
        let host = self.relay.host();

        let active = host
            .query(&TabQuery::active_in_current_window(WATCH_PAGE_PATTERN))
            .await?;
        if let Some(tab) = active.into_iter().next() {
            return Ok(Some(Detection {
                tab,
                strategy: Strategy::ActiveInCurrentWindow,
            }));
        }

        let candidates = host.query(&TabQuery::url(WATCH_PAGE_PATTERN)).await?;
        for tab in &candidates {
            match self.relay.player_state(tab.id).await {
                Ok(state) if state.is_playing => {
                    return Ok(Some(Detection {
                        tab: tab.clone(),
                        strategy: Strategy::Playing,
                    }));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(tab_id = tab.id, error = %e, "probe failed, skipping candidate");
                }
            }
        }

        Ok(most_recent(&candidates).map(|tab| Detection {
            tab: tab.clone(),
            strategy: Strategy::MostRecent,
        }))
    }
}
