//! Background coordinator for the YouTube Controller.
//!
//! Central struct of the persistent background context: owns the tab
//! registry, the command relay, the detection poll and the notification
//! bus towards open popups, and turns tab lifecycle events, keyboard
//! shortcuts and runtime messages into registry updates and page commands.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;

use crate::managers::shortcut_manager::{ShortcutManager, ShortcutManagerTrait};
use crate::managers::tab_registry::TabRegistry;
use crate::platform::host::{RuntimeChannel, TabHost};
use crate::services::command_relay::CommandRelay;
use crate::services::notification_bus::NotificationBus;
use crate::services::scheduler::Scheduler;
use crate::services::storage::{self, keys, KeyValueStore};
use crate::services::tab_detection::TabDetector;
use crate::services::url_pattern::{self, YOUTUBE_PATTERN};
use crate::types::command::{CommandKind, PageRequest, PageResponse};
use crate::types::config::ControllerConfig;
use crate::types::errors::ChannelError;
use crate::types::message::{ButtonStateRecord, Notification, RuntimeMessage, RuntimeResponse};
use crate::types::tab::{TabEvent, TabId, TabQuery, TrackedTab};

pub const DETECTION_TASK: &str = "detection";
pub const PAGE_EVENTS_TASK: &str = "page-events";

pub struct BackgroundCoordinator {
    registry: TabRegistry,
    relay: CommandRelay,
    store: Arc<dyn KeyValueStore>,
    popup_bus: NotificationBus<Notification>,
    scheduler: Scheduler,
    shortcuts: Mutex<ShortcutManager>,
    auto_pause: AtomicBool,
    config: ControllerConfig,
}

impl BackgroundCoordinator {
    pub fn new(
        host: Arc<dyn TabHost>,
        store: Arc<dyn KeyValueStore>,
        config: ControllerConfig,
    ) -> Arc<Self> {
        let relay = CommandRelay::new(host, config.background.probe_timeout());
        Arc::new(Self {
            registry: TabRegistry::new(TabDetector::new(relay.clone()), store.clone()),
            relay,
            store,
            popup_bus: NotificationBus::default(),
            scheduler: Scheduler::new("background"),
            shortcuts: Mutex::new(ShortcutManager::new()),
            auto_pause: AtomicBool::new(false),
            config,
        })
    }

    pub fn registry(&self) -> &TabRegistry {
        &self.registry
    }

    pub fn popup_bus(&self) -> &NotificationBus<Notification> {
        &self.popup_bus
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn shortcuts(&self) -> MutexGuard<'_, ShortcutManager> {
        self.shortcuts.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn auto_pause_enabled(&self) -> bool {
        self.auto_pause.load(Ordering::Acquire)
    }

    /// Restore the auto-pause flag, run a first detection pass and start the poll.
    pub async fn start(self: &Arc<Self>) {
        match self.store.get(keys::AUTO_PAUSE_ENABLED).await {
            Ok(value) => {
                let enabled = value.and_then(|v| v.as_bool()).unwrap_or(false);
                self.auto_pause.store(enabled, Ordering::Release);
            }
            Err(e) => tracing::warn!(error = %e, "failed to read auto-pause flag"),
        }

        let weak = Arc::downgrade(self);
        self.scheduler.spawn_periodic(
            DETECTION_TASK,
            self.config.background.detection_poll(),
            move || {
                let weak = weak.clone();
                async move {
                    if let Some(coordinator) = weak.upgrade() {
                        if let Err(e) = coordinator.registry.refresh().await {
                            tracing::warn!(error = %e, "background detection pass failed");
                        }
                    }
                }
            },
        );
        self.scheduler.trigger(DETECTION_TASK);
        tracing::info!(
            poll_ms = self.config.background.detection_poll_ms,
            "background coordinator started"
        );
    }

    pub fn shutdown(&self) {
        self.scheduler.cancel_all();
    }

    /// Inject the content script into every open YouTube tab.
    ///
    /// Returns how many injections succeeded; failures are logged and skipped.
    pub async fn on_installed(&self) -> usize {
        let tabs = match self.relay.host().query(&TabQuery::url(YOUTUBE_PATTERN)).await {
            Ok(tabs) => tabs,
            Err(e) => {
                tracing::warn!(error = %e, "could not enumerate YouTube tabs for injection");
                return 0;
            }
        };

        let mut injected = 0;
        for tab in &tabs {
            match self.relay.host().inject_content_script(tab.id).await {
                Ok(()) => injected += 1,
                Err(e) => tracing::warn!(tab_id = tab.id, error = %e, "content script injection failed"),
            }
        }
        tracing::info!(injected, total = tabs.len(), "content script injected into existing tabs");
        injected
    }

    /// React to one tab or window lifecycle event.
    pub async fn handle_tab_event(&self, event: TabEvent) {
        match event {
            TabEvent::Created(tab) => {
                if self.registry.current().is_none() && url_pattern::is_watch_url(&tab.url) {
                    if let Err(e) = self.registry.refresh().await {
                        tracing::debug!(tab_id = tab.id, error = %e, "refresh after tab creation failed");
                    }
                }
            }
            TabEvent::Updated { tab_id, change, tab } => {
                if let Some(url) = &change.url {
                    if !url_pattern::is_youtube_url(url) {
                        self.registry.invalidate_if(tab_id).await;
                    }
                }
                if (change.is_complete() || change.url.is_some()) && url_pattern::is_watch_url(&tab.url) {
                    self.registry.adopt(&tab).await;
                    self.popup_bus.publish(Notification::NewYoutubeTab {
                        tab_id,
                        url: tab.url.clone(),
                    });
                }
            }
            TabEvent::Activated { tab_id, .. } => {
                if self.auto_pause_enabled() {
                    if let Some(tracked) = self.registry.current() {
                        if tracked.tab_id != tab_id {
                            self.pause_tracked(&tracked, "tab switch").await;
                        }
                    }
                }
                match self.relay.host().get(tab_id).await {
                    Ok(tab) if url_pattern::is_watch_url(&tab.url) => {
                        self.registry.adopt(&tab).await;
                        self.popup_bus.publish(Notification::YoutubeTabActivated {
                            tab_id,
                            url: tab.url.clone(),
                        });
                    }
                    Ok(_) => {}
                    Err(e) => tracing::debug!(tab_id, error = %e, "activated tab vanished"),
                }
            }
            TabEvent::Removed(tab_id) => {
                self.registry.invalidate_if(tab_id).await;
            }
            TabEvent::WindowFocusChanged(window) => {
                if window.is_none() && self.auto_pause_enabled() {
                    if let Some(tracked) = self.registry.current() {
                        self.pause_tracked(&tracked, "window blur").await;
                    }
                }
            }
        }
    }

    /// Auto-pause: only a tab that is currently playing gets play-pause.
    async fn pause_tracked(&self, tracked: &TrackedTab, reason: &str) {
        match self.relay.player_state(tracked.tab_id).await {
            Ok(state) if state.is_playing => {
                let response = self.relay.send(tracked.tab_id, &CommandKind::PlayPause).await;
                tracing::info!(tab_id = tracked.tab_id, reason, success = response.success, "auto-paused");
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(tab_id = tracked.tab_id, error = %e, "auto-pause skipped"),
        }
    }

    /// Resolve the active YouTube tab through the registry.
    async fn active_tab(&self) -> Result<Option<TrackedTab>, String> {
        self.registry.refresh().await.map_err(|e| e.to_string())
    }

    /// Answer one runtime message from a popup or a page.
    pub async fn handle_message(&self, message: RuntimeMessage) -> RuntimeResponse {
        match message {
            RuntimeMessage::GetActiveTab => match self.active_tab().await {
                Ok(Some(tracked)) => RuntimeResponse {
                    tab_id: Some(tracked.tab_id),
                    ..RuntimeResponse::ok()
                },
                Ok(None) => RuntimeResponse::failure("No YouTube tabs found"),
                Err(e) => RuntimeResponse::failure(e),
            },
            RuntimeMessage::SendCommand { command, params } => {
                let tab_id = match self.active_tab().await {
                    Ok(Some(tracked)) => tracked.tab_id,
                    Ok(None) => return RuntimeResponse::failure("No YouTube tab available"),
                    Err(e) => return RuntimeResponse::failure(e),
                };
                let request = PageRequest {
                    action: command,
                    params,
                };
                match self.relay.request(tab_id, &request).await {
                    Ok(response) => RuntimeResponse {
                        tab_id: Some(tab_id),
                        result: serde_json::to_value(&response).ok(),
                        ..RuntimeResponse::ok()
                    },
                    Err(e) => {
                        tracing::warn!(tab_id, action = %request.action, error = %e, "forwarded command failed");
                        RuntimeResponse::failure(e.to_string())
                    }
                }
            }
            RuntimeMessage::SetAutoPause { enabled } => {
                self.set_auto_pause(enabled).await;
                RuntimeResponse::ok()
            }
            RuntimeMessage::ButtonStateChanged { button, state } => {
                self.handle_page_notification(Notification::ButtonStateChanged { button, state })
                    .await;
                RuntimeResponse::ok()
            }
        }
    }

    pub async fn set_auto_pause(&self, enabled: bool) {
        self.auto_pause.store(enabled, Ordering::Release);
        if let Err(e) = self
            .store
            .set(keys::AUTO_PAUSE_ENABLED, serde_json::Value::Bool(enabled))
            .await
        {
            tracing::warn!(error = %e, "auto-pause flag not persisted");
        }
        tracing::info!(enabled, "auto-pause toggled");
    }

    /// Forward a manifest shortcut command (e.g. `toggle-mute`) to the active tab.
    pub async fn handle_shortcut(&self, command: &str) -> PageResponse {
        if CommandKind::from_shortcut(command).is_none() {
            return PageResponse::failure(format!("Unknown shortcut command: {}", command));
        }
        self.dispatch(PageRequest::new(command)).await
    }

    /// Resolve a key combination through the shortcut bindings and dispatch it.
    pub async fn handle_key_combo(&self, keys: &str) -> PageResponse {
        let kind = self.shortcuts().resolve(keys);
        match kind {
            Some(kind) => self.dispatch(kind.to_request()).await,
            None => PageResponse::failure(format!("No shortcut bound to {}", keys)),
        }
    }

    async fn dispatch(&self, request: PageRequest) -> PageResponse {
        match self.active_tab().await {
            Ok(Some(tracked)) => self.relay.execute(tracked.tab_id, &request).await,
            Ok(None) => {
                tracing::debug!(action = %request.action, "shortcut ignored, no YouTube tab");
                PageResponse::failure("No YouTube tab available")
            }
            Err(e) => PageResponse::failure(e),
        }
    }

    /// Persist a page's button broadcast for late popups and forward it to open ones.
    pub async fn handle_page_notification(&self, notification: Notification) {
        if let Notification::ButtonStateChanged { button, state } = &notification {
            let record = ButtonStateRecord {
                button: button.clone(),
                state: state.clone(),
                timestamp: storage::now_millis(),
            };
            storage::save_button_state(self.store.as_ref(), &record).await;
        }
        let delivered = self.popup_bus.publish(notification);
        tracing::trace!(delivered, "page notification forwarded");
    }

    /// Consume page broadcasts from `bus` until shutdown.
    pub fn spawn_page_listener(self: &Arc<Self>, bus: &NotificationBus<Notification>) {
        let mut rx = bus.subscribe();
        let weak = Arc::downgrade(self);
        self.scheduler.spawn_task(PAGE_EVENTS_TASK, async move {
            loop {
                match rx.recv().await {
                    Ok(notification) => match weak.upgrade() {
                        Some(coordinator) => coordinator.handle_page_notification(notification).await,
                        None => break,
                    },
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "background fell behind on page notifications");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    pub fn current_tab_id(&self) -> Option<TabId> {
        self.registry.current().map(|t| t.tab_id)
    }
}

#[async_trait]
impl RuntimeChannel for BackgroundCoordinator {
    async fn send(&self, message: RuntimeMessage) -> Result<RuntimeResponse, ChannelError> {
        Ok(self.handle_message(message).await)
    }
}
