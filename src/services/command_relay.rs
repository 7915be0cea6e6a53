//! Command Relay for the YouTube Controller.
//!
//! One request, one `{success, ...}` answer. Every round-trip to a page is
//! bounded by a timeout, and every failure below this layer (no receiver,
//! closed tab, timeout) is folded into a `ChannelError` that callers treat
//! as a liveness signal.

use std::sync::Arc;
use std::time::Duration;

use crate::platform::host::TabHost;
use crate::types::command::{CommandKind, PageRequest, PageResponse};
use crate::types::errors::ChannelError;
use crate::types::player::PlayerState;
use crate::types::tab::TabId;

#[derive(Clone)]
pub struct CommandRelay {
    host: Arc<dyn TabHost>,
    timeout: Duration,
}

impl CommandRelay {
    pub fn new(host: Arc<dyn TabHost>, timeout: Duration) -> Self {
        Self { host, timeout }
    }

    pub fn host(&self) -> &Arc<dyn TabHost> {
        &self.host
    }

    /// One round-trip to the content script of `tab_id`.
    pub async fn request(
        &self,
        tab_id: TabId,
        request: &PageRequest,
    ) -> Result<PageResponse, ChannelError> {
        match tokio::time::timeout(self.timeout, self.host.send_message(tab_id, request)).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::Timeout(tab_id)),
        }
    }

    /// Query the page's player state. Only a successful answer carrying a
    /// player snapshot counts.
    pub async fn player_state(&self, tab_id: TabId) -> Result<PlayerState, ChannelError> {
        let response = self
            .request(tab_id, &CommandKind::GetPlayerState.to_request())
            .await?;
        match response.player_state() {
            Some(state) if response.success => Ok(state.clone()),
            _ => Err(ChannelError::Rejected(
                response
                    .error
                    .unwrap_or_else(|| "no player state in response".to_string()),
            )),
        }
    }

    /// Relay a request and fold channel failures into a failure response.
    pub async fn execute(&self, tab_id: TabId, request: &PageRequest) -> PageResponse {
        match self.request(tab_id, request).await {
            Ok(response) => {
                if !response.success {
                    tracing::debug!(
                        tab_id,
                        action = %request.action,
                        error = ?response.error,
                        "page reported command failure"
                    );
                }
                response
            }
            Err(e) => {
                tracing::warn!(tab_id, action = %request.action, error = %e, "command relay failed");
                PageResponse::failure(e.to_string())
            }
        }
    }

    pub async fn send(&self, tab_id: TabId, kind: &CommandKind) -> PageResponse {
        self.execute(tab_id, &kind.to_request()).await
    }
}
