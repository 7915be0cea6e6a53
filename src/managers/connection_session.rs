//! Connection Session for the popup.
//!
//! Each popup instance owns one session. The session finds a YouTube tab
//! on its own (hint first, then the layered detection), confirms it with a
//! state-query round-trip before adopting it, and keeps checking it while
//! connected:
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Disconnected -> ...
//!                                   (any) -> Closed   (teardown)
//! ```
//!
//! Two consecutive liveness failures evict the tab and restart detection at
//! once. Every adoption bumps an epoch; a confirmation or liveness result
//! computed against an older epoch is discarded.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use uuid::Uuid;

use crate::platform::host::{RuntimeChannel, TabHost};
use crate::services::command_relay::CommandRelay;
use crate::services::notification_bus::NotificationBus;
use crate::services::page_probe::clamp_volume;
use crate::services::scheduler::Scheduler;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::services::storage::{self, KeyValueStore};
use crate::services::tab_detection::{Strategy, TabDetector};
use crate::services::url_pattern;
use crate::types::command::{CommandKind, PageResponse};
use crate::types::config::SessionConfig;
use crate::types::errors::ChannelError;
use crate::types::message::{ButtonStateRecord, Notification, RuntimeMessage};
use crate::types::player::{format_time, PlayerState};
use crate::types::settings::ControllerSettings;
use crate::types::tab::{BrowserTab, TabId, TrackedTab};

pub const LIVENESS_TASK: &str = "liveness";
pub const REFRESH_TASK: &str = "refresh";
pub const NOTIFICATION_TASK: &str = "notifications";

/// How long a status banner stays visible.
pub const STATUS_TTL: Duration = Duration::from_secs(3);

const TITLE_DISPLAY_CHARS: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Torn down; every timer is cancelled and nothing reconnects.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// Transient feedback shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusBanner {
    pub message: String,
    pub level: StatusLevel,
    shown_at: Instant,
}

impl StatusBanner {
    fn new(level: StatusLevel, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
            shown_at: Instant::now(),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.shown_at.elapsed() < STATUS_TTL
    }
}

/// Everything the popup renders besides the banner.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDisplay {
    /// Persistent connection indicator ("Connected: <title>").
    pub indicator: String,
    /// Percent, 0-100.
    pub volume: f64,
    pub speed: f64,
    pub is_playing: bool,
    pub is_muted: bool,
    pub video_title: Option<String>,
    /// `m:ss`.
    pub position: String,
    /// `m:ss`.
    pub duration: String,
    /// Percent, 0-100.
    pub progress: f64,
    pub play_label: Option<String>,
    pub mute_label: Option<String>,
}

impl Default for SessionDisplay {
    fn default() -> Self {
        Self {
            indicator: "Not connected".to_string(),
            volume: 50.0,
            speed: 1.0,
            is_playing: false,
            is_muted: false,
            video_title: None,
            position: format_time(0.0),
            duration: format_time(0.0),
            progress: 0.0,
            play_label: None,
            mute_label: None,
        }
    }
}

impl SessionDisplay {
    fn apply_state(&mut self, state: &PlayerState) {
        self.is_playing = state.is_playing;
        self.is_muted = state.is_muted;
        self.volume = f64::from(state.volume);
        if state.playback_rate > 0.0 {
            self.speed = state.playback_rate;
        }
        self.video_title = state.video_title.clone();
        self.indicator = match &state.video_title {
            Some(title) if title.chars().count() > TITLE_DISPLAY_CHARS => {
                let short: String = title.chars().take(TITLE_DISPLAY_CHARS).collect();
                format!("Connected: {}...", short)
            }
            Some(title) => format!("Connected: {}", title),
            None => "Connected to YouTube".to_string(),
        };
        self.apply_position(state);
    }

    fn apply_position(&mut self, state: &PlayerState) {
        self.position = format_time(state.current_time);
        self.duration = format_time(state.duration);
        if let Some(progress) = state.progress_percent() {
            self.progress = progress;
        }
    }

    fn apply_button(&mut self, button: &str, label: &str) {
        match button {
            "play" => self.play_label = Some(label.to_string()),
            "mute" => self.mute_label = Some(label.to_string()),
            _ => {}
        }
    }

    /// Forget everything tied to the lost tab; volume, speed and labels stay.
    fn reset_connection(&mut self) {
        let kept = std::mem::take(self);
        *self = Self {
            volume: kept.volume,
            speed: kept.speed,
            play_label: kept.play_label,
            mute_label: kept.mute_label,
            ..Self::default()
        };
    }
}

struct SessionInner {
    state: ConnectionState,
    tracked: Option<TrackedTab>,
    epoch: u64,
    failures: u32,
    dragging: bool,
    status: Option<StatusBanner>,
    display: SessionDisplay,
    last_button_state: Option<ButtonStateRecord>,
}

pub struct ConnectionSession {
    id: Uuid,
    relay: CommandRelay,
    detector: TabDetector,
    store: Arc<dyn KeyValueStore>,
    runtime: Arc<dyn RuntimeChannel>,
    settings: tokio::sync::Mutex<SettingsEngine>,
    config: SessionConfig,
    scheduler: Scheduler,
    inner: Mutex<SessionInner>,
}

fn strategy_message(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::ActiveInCurrentWindow => "Connected to active YouTube tab",
        Strategy::Playing => "Connected to playing video",
        Strategy::MostRecent => "Connected to recent video",
    }
}

impl ConnectionSession {
    pub fn new(
        host: Arc<dyn TabHost>,
        store: Arc<dyn KeyValueStore>,
        runtime: Arc<dyn RuntimeChannel>,
        config: SessionConfig,
    ) -> Arc<Self> {
        let relay = CommandRelay::new(host, config.probe_timeout());
        Arc::new(Self {
            id: Uuid::new_v4(),
            detector: TabDetector::new(relay.clone()),
            relay,
            settings: tokio::sync::Mutex::new(SettingsEngine::new(store.clone())),
            store,
            runtime,
            config,
            scheduler: Scheduler::new("popup"),
            inner: Mutex::new(SessionInner {
                state: ConnectionState::Disconnected,
                tracked: None,
                epoch: 0,
                failures: 0,
                dragging: false,
                status: None,
                display: SessionDisplay::default(),
                last_button_state: None,
            }),
        })
    }

    fn inner(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn host(&self) -> &Arc<dyn TabHost> {
        self.relay.host()
    }

    // --- Accessors ---

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.inner().state
    }

    pub fn tracked_tab(&self) -> Option<TrackedTab> {
        self.inner().tracked.clone()
    }

    /// The banner, while it is still visible.
    pub fn status(&self) -> Option<StatusBanner> {
        self.inner().status.clone().filter(|s| s.is_visible())
    }

    pub fn display(&self) -> SessionDisplay {
        self.inner().display.clone()
    }

    pub fn last_button_state(&self) -> Option<ButtonStateRecord> {
        self.inner().last_button_state.clone()
    }

    pub fn failure_count(&self) -> u32 {
        self.inner().failures
    }

    pub fn is_dragging(&self) -> bool {
        self.inner().dragging
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub async fn settings(&self) -> ControllerSettings {
        self.settings.lock().await.get_settings().clone()
    }

    fn is_closed(&self) -> bool {
        self.inner().state == ConnectionState::Closed
    }

    fn set_status(&self, level: StatusLevel, message: impl Into<String>) {
        let banner = StatusBanner::new(level, message);
        tracing::debug!(session_id = %self.id, level = ?banner.level, message = %banner.message, "status");
        self.inner().status = Some(banner);
    }

    // --- Lifecycle ---

    /// Load settings and the last button state, then connect from the
    /// persisted hint or, failing that, by detection.
    pub async fn initialize(&self) -> bool {
        {
            let mut engine = self.settings.lock().await;
            if let Err(e) = engine.load().await {
                tracing::warn!(session_id = %self.id, error = %e, "settings unreadable, using defaults");
            }
        }

        if let Some(record) = storage::load_button_state(self.store.as_ref()).await {
            let mut inner = self.inner();
            inner.display.apply_button(&record.button, &record.state);
            inner.last_button_state = Some(record);
        }

        if self.connect_from_hint().await {
            return true;
        }
        self.detect_and_connect().await
    }

    /// Initialize, then start the liveness and cosmetic refresh timers.
    pub async fn open(self: &Arc<Self>) -> bool {
        tracing::info!(session_id = %self.id, "popup session opened");
        let connected = self.initialize().await;
        self.start_timers().await;
        connected
    }

    pub async fn start_timers(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.scheduler
            .spawn_periodic(LIVENESS_TASK, self.config.liveness_period(), move || {
                let weak = weak.clone();
                async move {
                    if let Some(session) = weak.upgrade() {
                        session.liveness_tick().await;
                    }
                }
            });

        let refresh_period = self.settings().await.refresh_period();
        let weak = Arc::downgrade(self);
        self.scheduler
            .spawn_periodic(REFRESH_TASK, refresh_period, move || {
                let weak = weak.clone();
                async move {
                    if let Some(session) = weak.upgrade() {
                        session.refresh_tick().await;
                    }
                }
            });
    }

    /// Listen for background notifications until teardown.
    pub fn attach(self: &Arc<Self>, bus: &NotificationBus<Notification>) {
        let mut rx = bus.subscribe();
        let weak = Arc::downgrade(self);
        self.scheduler.spawn_task(NOTIFICATION_TASK, async move {
            loop {
                match rx.recv().await {
                    Ok(notification) => match weak.upgrade() {
                        Some(session) => session.handle_notification(notification).await,
                        None => break,
                    },
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "popup fell behind on notifications");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    /// Cancel every timer. The session never reconnects afterwards.
    pub fn teardown(&self) {
        {
            let mut inner = self.inner();
            inner.state = ConnectionState::Closed;
            inner.epoch += 1;
        }
        self.scheduler.cancel_all();
        tracing::info!(session_id = %self.id, "popup session closed");
    }

    // --- Connecting ---

    /// Try the persisted `activeTabId` hint. A hint that does not confirm
    /// (closed tab, non-YouTube page, or a page that never answers) is cleared.
    pub async fn connect_from_hint(&self) -> bool {
        let Some(tab_id) = storage::load_hint(self.store.as_ref()).await else {
            return false;
        };
        let confirmed = match self.host().get(tab_id).await {
            Ok(tab) if url_pattern::is_youtube_url(&tab.url) => {
                self.confirm_with_retry(tab_id, "Reconnected to saved tab").await
            }
            Ok(_) | Err(_) => false,
        };
        if !confirmed && storage::load_hint(self.store.as_ref()).await == Some(tab_id) {
            tracing::debug!(session_id = %self.id, tab_id, "stale tab hint cleared");
            storage::clear_hint(self.store.as_ref()).await;
        }
        confirmed
    }

    /// Run the layered detection and confirm its pick.
    pub async fn detect_and_connect(&self) -> bool {
        if self.is_closed() {
            return false;
        }
        match self.detector.detect().await {
            Ok(Some(detection)) => {
                self.confirm_with_retry(detection.tab.id, strategy_message(detection.strategy))
                    .await
            }
            Ok(None) => {
                self.set_status(StatusLevel::Warning, "No YouTube videos open");
                false
            }
            Err(e) => {
                tracing::warn!(session_id = %self.id, error = %e, "tab detection failed");
                self.set_status(StatusLevel::Error, "Error detecting YouTube tabs");
                false
            }
        }
    }

    /// Confirm `tab_id` with an immediate state query plus one retry per
    /// configured delay, adopting it on the first valid answer.
    ///
    /// A session already connected elsewhere stays connected while the
    /// confirmation runs and if it fails.
    pub async fn confirm_with_retry(&self, tab_id: TabId, message: &str) -> bool {
        let epoch = {
            let mut inner = self.inner();
            match inner.state {
                ConnectionState::Closed => return false,
                ConnectionState::Disconnected => inner.state = ConnectionState::Connecting,
                _ => {}
            }
            inner.epoch
        };

        let delays = std::iter::once(Duration::ZERO).chain(self.config.confirm_retry_delays());
        for (attempt, delay) in delays.enumerate() {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if self.inner().epoch != epoch {
                return false;
            }
            match self.probe_tab(tab_id).await {
                Ok((tab, state)) => return self.adopt(epoch, &tab, &state, message).await,
                Err(e) => {
                    tracing::debug!(session_id = %self.id, tab_id, attempt, error = %e, "confirmation attempt failed");
                }
            }
        }

        let mut inner = self.inner();
        if inner.epoch == epoch && inner.state == ConnectionState::Connecting {
            inner.state = ConnectionState::Disconnected;
        }
        tracing::info!(session_id = %self.id, tab_id, "gave up confirming tab");
        false
    }

    /// Resolve the tab and query its player; only a valid watch page counts.
    async fn probe_tab(&self, tab_id: TabId) -> Result<(BrowserTab, PlayerState), ChannelError> {
        let tab = self
            .host()
            .get(tab_id)
            .await
            .map_err(|_| ChannelError::TabClosed(tab_id))?;
        let state = self.relay.player_state(tab_id).await?;
        if !state.is_valid_page {
            return Err(ChannelError::Rejected(
                "Tab is not a YouTube video page".to_string(),
            ));
        }
        Ok((tab, state))
    }

    async fn adopt(&self, epoch: u64, tab: &BrowserTab, state: &PlayerState, message: &str) -> bool {
        let tracked = TrackedTab::from(tab);
        {
            let mut inner = self.inner();
            if inner.epoch != epoch || inner.state == ConnectionState::Closed {
                return false;
            }
            inner.epoch += 1;
            inner.state = ConnectionState::Connected;
            inner.tracked = Some(tracked.clone());
            inner.failures = 0;
            inner.display.apply_state(state);
        }
        self.set_status(StatusLevel::Success, message);
        storage::save_hint(self.store.as_ref(), tracked.tab_id).await;
        tracing::info!(session_id = %self.id, tab_id = tracked.tab_id, "connected");
        true
    }

    /// Drop the connection without any liveness evidence (rescan).
    fn drop_connection(&self) {
        let mut inner = self.inner();
        if inner.state == ConnectionState::Closed {
            return;
        }
        inner.epoch += 1;
        inner.state = ConnectionState::Disconnected;
        inner.tracked = None;
        inner.failures = 0;
        inner.display.reset_connection();
    }

    // --- Timers ---

    /// Verify the connection, or detect while disconnected and auto-detect is on.
    pub async fn liveness_tick(&self) {
        let (state, tracked, epoch) = {
            let inner = self.inner();
            (inner.state, inner.tracked.clone(), inner.epoch)
        };
        match (state, tracked) {
            (ConnectionState::Connected, Some(tracked)) => {
                match self.probe_tab(tracked.tab_id).await {
                    Ok((_, player)) => {
                        let mut inner = self.inner();
                        if inner.epoch == epoch {
                            inner.failures = 0;
                            inner.display.apply_state(&player);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(session_id = %self.id, tab_id = tracked.tab_id, error = %e, "liveness check failed");
                        self.record_failure(epoch).await;
                    }
                }
            }
            (ConnectionState::Disconnected, _) => {
                if self.settings().await.auto_detect {
                    self.detect_and_connect().await;
                }
            }
            _ => {}
        }
    }

    /// Count one liveness failure; at the threshold, evict and re-detect.
    async fn record_failure(&self, epoch: u64) {
        let threshold = self.config.liveness_failure_threshold.max(1);
        let evicted = {
            let mut inner = self.inner();
            if inner.epoch != epoch || inner.state != ConnectionState::Connected {
                return;
            }
            inner.failures += 1;
            if inner.failures < threshold {
                return;
            }
            inner.epoch += 1;
            inner.failures = 0;
            inner.state = ConnectionState::Disconnected;
            inner.display.reset_connection();
            inner.tracked.take()
        };
        if let Some(tab) = evicted {
            tracing::warn!(session_id = %self.id, tab_id = tab.tab_id, "connection lost, re-detecting");
            self.set_status(StatusLevel::Error, "Connection to YouTube tab lost");
            self.detect_and_connect().await;
        }
    }

    /// Cosmetic position update while connected and not dragging.
    pub async fn refresh_tick(&self) {
        let (tab_id, epoch) = {
            let inner = self.inner();
            match (&inner.tracked, inner.state, inner.dragging) {
                (Some(tracked), ConnectionState::Connected, false) => (tracked.tab_id, inner.epoch),
                _ => return,
            }
        };
        match self.relay.player_state(tab_id).await {
            Ok(state) if state.is_ready => {
                let mut inner = self.inner();
                if inner.epoch == epoch && !inner.dragging {
                    inner.display.apply_position(&state);
                }
            }
            Ok(_) => {}
            Err(e) => tracing::trace!(session_id = %self.id, tab_id, error = %e, "position refresh failed"),
        }
    }

    pub fn set_dragging(&self, dragging: bool) {
        self.inner().dragging = dragging;
    }

    // --- Notifications ---

    pub async fn handle_notification(&self, notification: Notification) {
        match notification {
            Notification::ButtonStateChanged { button, state } => {
                let mut inner = self.inner();
                inner.display.apply_button(&button, &state);
                inner.last_button_state = Some(ButtonStateRecord {
                    button,
                    state,
                    timestamp: storage::now_millis(),
                });
            }
            Notification::NewYoutubeTab { tab_id, .. } => {
                if self.settings().await.auto_detect {
                    self.handle_new_tab(tab_id).await;
                }
            }
            Notification::YoutubeTabActivated { tab_id, .. } => {
                if self.settings().await.auto_detect {
                    self.handle_tab_activated(tab_id).await;
                }
            }
        }
    }

    async fn handle_new_tab(&self, tab_id: TabId) {
        let current = {
            let inner = self.inner();
            match (inner.state, &inner.tracked) {
                (ConnectionState::Connected, Some(tracked)) => Some(tracked.tab_id),
                _ => None,
            }
        };

        let Some(current) = current else {
            tokio::time::sleep(self.config.new_tab_delay()).await;
            self.confirm_event_tab(tab_id, "New YouTube video detected").await;
            return;
        };
        if current == tab_id {
            return;
        }

        // Switch only when the current tab is not actively playing.
        let message = match self.relay.player_state(current).await {
            Ok(state) if state.is_playing && state.is_ready => return,
            Ok(_) => "Switched to new YouTube video",
            Err(_) => "Reconnected to YouTube",
        };
        self.confirm_event_tab(tab_id, message).await;
    }

    async fn handle_tab_activated(&self, tab_id: TabId) {
        let already_tracking = {
            let inner = self.inner();
            inner.state == ConnectionState::Connected
                && inner.tracked.as_ref().map(|t| t.tab_id) == Some(tab_id)
        };
        if already_tracking {
            return;
        }
        tokio::time::sleep(self.config.activation_delay()).await;
        self.confirm_event_tab(tab_id, "Switched to YouTube tab").await;
    }

    /// Confirm an announced tab; if that leaves the session disconnected,
    /// fall back to one detection pass.
    async fn confirm_event_tab(&self, tab_id: TabId, message: &str) {
        if self.confirm_with_retry(tab_id, message).await {
            return;
        }
        if self.state() == ConnectionState::Disconnected {
            self.detect_and_connect().await;
        }
    }

    // --- User actions ---

    /// Send one command to the tracked tab.
    pub async fn send_command(&self, kind: CommandKind) -> PageResponse {
        let target = {
            let inner = self.inner();
            match (&inner.tracked, inner.state) {
                (Some(tracked), ConnectionState::Connected) => Some((tracked.tab_id, inner.epoch)),
                _ => None,
            }
        };
        let Some((tab_id, epoch)) = target else {
            self.set_status(StatusLevel::Warning, "Please connect to a YouTube tab first");
            return PageResponse::failure("Not connected to a YouTube tab");
        };

        let request = kind.to_request();
        let response = match self.relay.request(tab_id, &request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(session_id = %self.id, tab_id, action = %request.action, error = %e, "command failed");
                self.set_status(StatusLevel::Error, "Connection lost, please reconnect");
                self.record_failure(epoch).await;
                return PageResponse::failure(e.to_string());
            }
        };

        if !response.success {
            let reason = response
                .error
                .clone()
                .unwrap_or_else(|| "Command failed".to_string());
            self.set_status(StatusLevel::Error, reason);
            return response;
        }

        {
            let mut inner = self.inner();
            if let Some(label) = response.label() {
                match kind {
                    CommandKind::PlayPause => inner.display.apply_button("play", label),
                    CommandKind::Mute => inner.display.apply_button("mute", label),
                    _ => {}
                }
            }
            if let Some(volume) = response.volume {
                inner.display.volume = volume;
            }
            if let Some(speed) = response.speed {
                inner.display.speed = speed;
            }
        }
        match kind {
            CommandKind::Next => self.set_status(StatusLevel::Success, "Next video"),
            CommandKind::Previous | CommandKind::Back => {
                self.set_status(StatusLevel::Success, "Previous video")
            }
            CommandKind::SetSpeed(speed) => {
                self.set_status(StatusLevel::Success, format!("Speed set to {}x", speed))
            }
            _ => {}
        }

        self.sync_player_state(tab_id, epoch).await;
        response
    }

    async fn sync_player_state(&self, tab_id: TabId, epoch: u64) {
        if let Ok(state) = self.relay.player_state(tab_id).await {
            let mut inner = self.inner();
            if inner.epoch == epoch {
                inner.display.apply_state(&state);
            }
        }
    }

    /// Set the volume, clamped to 0-100.
    pub async fn set_volume(&self, volume: f64) -> PageResponse {
        let volume = clamp_volume(volume);
        self.inner().display.volume = volume;
        self.send_command(CommandKind::SetVolume(volume)).await
    }

    pub async fn adjust_volume(&self, delta: f64) -> PageResponse {
        let current = self.inner().display.volume;
        self.set_volume(current + delta).await
    }

    /// Step the volume by the configured `volumeStep`, up or down.
    pub async fn step_volume(&self, up: bool) -> PageResponse {
        let step = f64::from(self.settings().await.volume_step);
        self.adjust_volume(if up { step } else { -step }).await
    }

    pub async fn set_speed(&self, speed: f64) -> PageResponse {
        self.inner().display.speed = speed;
        self.send_command(CommandKind::SetSpeed(speed)).await
    }

    /// Seek to `percentage` of the current video's duration.
    pub async fn seek_to_percentage(&self, percentage: f64) -> PageResponse {
        let Some(tracked) = self.tracked_tab() else {
            return PageResponse::failure("Not connected to a YouTube tab");
        };
        match self.relay.player_state(tracked.tab_id).await {
            Ok(state) if state.duration > 0.0 => {
                let time = (percentage.clamp(0.0, 100.0) / 100.0) * state.duration;
                self.send_command(CommandKind::Seek(time)).await
            }
            Ok(_) => PageResponse::failure("Video duration unknown"),
            Err(e) => PageResponse::failure(e.to_string()),
        }
    }

    async fn toggle_setting(&self, key: &str, read: fn(&ControllerSettings) -> bool) -> bool {
        let mut engine = self.settings.lock().await;
        let enabled = !read(engine.get_settings());
        if let Err(e) = engine.set_value(key, Value::Bool(enabled)).await {
            tracing::warn!(session_id = %self.id, key, error = %e, "setting not updated");
        }
        enabled
    }

    pub async fn toggle_theater_mode(&self) -> bool {
        let enabled = self.toggle_setting("theaterMode", |s| s.theater_mode).await;
        if self.state() == ConnectionState::Connected {
            let response = self.send_command(CommandKind::TheaterToggle).await;
            if response.success {
                let word = if enabled { "enabled" } else { "disabled" };
                self.set_status(StatusLevel::Success, format!("Theater mode {}", word));
            }
        }
        enabled
    }

    /// Flip auto-pause and tell the background coordinator.
    pub async fn toggle_auto_pause(&self) -> bool {
        let enabled = self.toggle_setting("autoPause", |s| s.auto_pause).await;
        match self.runtime.send(RuntimeMessage::SetAutoPause { enabled }).await {
            Ok(_) => {
                let word = if enabled { "enabled" } else { "disabled" };
                self.set_status(StatusLevel::Success, format!("Auto-pause {}", word));
            }
            Err(e) => {
                tracing::warn!(session_id = %self.id, error = %e, "auto-pause not forwarded");
            }
        }
        enabled
    }

    pub async fn toggle_dark_mode(&self) -> bool {
        let enabled = self.toggle_setting("darkMode", |s| s.dark_mode).await;
        let word = if enabled { "Dark" } else { "Light" };
        self.set_status(StatusLevel::Success, format!("{} mode enabled", word));
        enabled
    }

    pub async fn set_auto_detect(&self, enabled: bool) {
        let mut engine = self.settings.lock().await;
        if let Err(e) = engine.set_value("autoDetect", Value::Bool(enabled)).await {
            tracing::warn!(session_id = %self.id, error = %e, "auto-detect not updated");
        }
    }

    /// Drop the current connection and detect again.
    pub async fn rescan(&self) -> bool {
        self.set_status(StatusLevel::Info, "Rescanning for YouTube tabs...");
        self.drop_connection();
        self.detect_and_connect().await
    }

    /// Ask the background for its tab and adopt it after one confirmation.
    pub async fn request_active_tab(&self) -> bool {
        let response = match self.runtime.send(RuntimeMessage::GetActiveTab).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(session_id = %self.id, error = %e, "background unreachable");
                self.set_status(StatusLevel::Error, "Error setting tab");
                return false;
            }
        };
        let tab_id = match (response.success, response.tab_id) {
            (true, Some(tab_id)) => tab_id,
            _ => {
                let reason = response
                    .error
                    .unwrap_or_else(|| "Please select a YouTube tab".to_string());
                self.set_status(StatusLevel::Error, reason);
                return false;
            }
        };

        let epoch = self.inner().epoch;
        match self.probe_tab(tab_id).await {
            Ok((tab, state)) => self.adopt(epoch, &tab, &state, "Tab set successfully!").await,
            Err(e) => {
                tracing::debug!(session_id = %self.id, tab_id, error = %e, "background's tab did not confirm");
                self.set_status(StatusLevel::Error, "Please select a YouTube tab");
                false
            }
        }
    }
}
