//! Tab Registry for the background coordinator.
//!
//! Owns the background's belief about which tab is the controllable
//! YouTube tab. The belief is refreshed by the detection poll, by tab
//! lifecycle events and by popup queries; every resolution is mirrored to
//! the `activeTabId` hint and every invalidation clears it.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::services::storage::{self, KeyValueStore};
use crate::services::tab_detection::{Detection, TabDetector};
use crate::services::url_pattern;
use crate::types::errors::TabError;
use crate::types::tab::{BrowserTab, TabId, TrackedTab};

pub struct TabRegistry {
    detector: TabDetector,
    store: Arc<dyn KeyValueStore>,
    belief: Mutex<Option<TrackedTab>>,
    /// Serializes refresh passes so two detections never interleave.
    refresh_lock: tokio::sync::Mutex<()>,
}

impl TabRegistry {
    pub fn new(detector: TabDetector, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            detector,
            store,
            belief: Mutex::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn detector(&self) -> &TabDetector {
        &self.detector
    }

    fn belief(&self) -> MutexGuard<'_, Option<TrackedTab>> {
        self.belief.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The current belief, without re-validating it.
    pub fn current(&self) -> Option<TrackedTab> {
        self.belief().clone()
    }

    /// Re-validate the cached belief or detect a new one.
    ///
    /// Returns the resolved tab, or `None` once no watch-page tab exists
    /// (in which case the hint is cleared).
    pub async fn refresh(&self) -> Result<Option<TrackedTab>, TabError> {
        let _pass = self.refresh_lock.lock().await;

        if let Some(cached) = self.current() {
            match self.detector.relay().host().get(cached.tab_id).await {
                Ok(tab) if url_pattern::is_watch_url(&tab.url) => {
                    let tracked = TrackedTab::from(&tab);
                    self.set_belief(Some(tracked.clone()));
                    storage::save_hint(self.store.as_ref(), tracked.tab_id).await;
                    return Ok(Some(tracked));
                }
                Ok(tab) => {
                    tracing::debug!(tab_id = tab.id, url = %tab.url, "cached tab left the watch page");
                    self.set_belief(None);
                }
                Err(e) => {
                    tracing::debug!(tab_id = cached.tab_id, error = %e, "cached tab is gone");
                    self.set_belief(None);
                }
            }
        }

        match self.detector.detect().await? {
            Some(Detection { tab, strategy }) => {
                tracing::info!(tab_id = tab.id, ?strategy, "detected YouTube tab");
                Ok(Some(self.adopt(&tab).await))
            }
            None => {
                tracing::debug!("no YouTube watch tabs open");
                self.invalidate().await;
                Ok(None)
            }
        }
    }

    /// Take `tab` as the belief and persist the hint.
    pub async fn adopt(&self, tab: &BrowserTab) -> TrackedTab {
        let tracked = TrackedTab::from(tab);
        let previous = self.set_belief(Some(tracked.clone()));
        if previous.as_ref().map(|p| p.tab_id) != Some(tracked.tab_id) {
            tracing::debug!(tab_id = tracked.tab_id, "tracked tab changed");
        }
        storage::save_hint(self.store.as_ref(), tracked.tab_id).await;
        tracked
    }

    /// Drop the belief and clear the hint.
    pub async fn invalidate(&self) {
        if let Some(previous) = self.set_belief(None) {
            tracing::info!(tab_id = previous.tab_id, "tracked tab invalidated");
        }
        storage::clear_hint(self.store.as_ref()).await;
    }

    /// Invalidate only if `tab_id` is the current belief. Returns whether it was.
    pub async fn invalidate_if(&self, tab_id: TabId) -> bool {
        let matches = self.current().map(|t| t.tab_id) == Some(tab_id);
        if matches {
            self.invalidate().await;
        }
        matches
    }

    fn set_belief(&self, tracked: Option<TrackedTab>) -> Option<TrackedTab> {
        std::mem::replace(&mut *self.belief(), tracked)
    }
}
