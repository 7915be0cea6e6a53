//! Page Probe for the YouTube Controller.
//!
//! Runs inside a YouTube page. Answers player-state queries and executes
//! single playback actions against the page's DOM through a small element
//! cache. Nothing here panics on a missing element: a command whose control
//! cannot be found answers `success: false`.

use std::collections::HashMap;

use crate::platform::host::PageDocument;
use crate::services::notification_bus::NotificationBus;
use crate::services::url_pattern;
use crate::types::command::{CommandKind, PageRequest, PageResponse};
use crate::types::config::ProbeConfig;
use crate::types::message::Notification;
use crate::types::page::{ElementHandle, MediaUpdate, MutationRecord};
use crate::types::player::{PlayerState, VideoProgress};

/// Class of the control-bar subtree whose re-insertion invalidates the cache.
pub const CONTROL_BAR_CLASS: &str = "ytp-chrome-controls";

pub const MIN_SPEED: f64 = 0.25;
pub const MAX_SPEED: f64 = 2.0;
/// Grid every explicit speed is snapped to.
pub const SPEED_GRID: f64 = 0.25;

const TITLE_SELECTORS: &[&str] = &[
    "h1.ytd-video-primary-info-renderer",
    "h1.title.ytd-video-primary-info-renderer",
    "h1.style-scope.ytd-video-primary-info-renderer",
    "#title h1",
    ".ytd-video-primary-info-renderer h1",
    "h1[class*=\"title\"]",
    "#container h1",
];

/// Player controls held in the element cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    PlayButton,
    NextButton,
    PrevButton,
    MuteButton,
    Player,
    TheaterButton,
}

impl Control {
    pub const ALL: [Control; 6] = [
        Control::PlayButton,
        Control::NextButton,
        Control::PrevButton,
        Control::MuteButton,
        Control::Player,
        Control::TheaterButton,
    ];

    pub fn selector(self) -> &'static str {
        match self {
            Control::PlayButton => ".ytp-play-button",
            Control::NextButton => ".ytp-next-button",
            Control::PrevButton => ".ytp-prev-button",
            Control::MuteButton => ".ytp-mute-button",
            Control::Player => "#movie_player, .html5-video-player",
            Control::TheaterButton => ".ytp-size-button",
        }
    }
}

/// Clamp a volume percentage into 0-100. Non-finite input reads as 0.
pub fn clamp_volume(volume: f64) -> f64 {
    if volume.is_finite() {
        volume.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Snap a playback rate onto the 0.25 grid inside 0.25-2.
pub fn clamp_speed(speed: f64) -> f64 {
    if !speed.is_finite() {
        return 1.0;
    }
    let snapped = (speed / SPEED_GRID).round() * SPEED_GRID;
    snapped.clamp(MIN_SPEED, MAX_SPEED)
}

/// Clamp a target position into `[0, duration]`. An unknown duration only bounds below.
pub fn clamp_position(time: f64, duration: f64) -> f64 {
    let lower = time.max(0.0);
    if duration.is_finite() && duration > 0.0 {
        lower.min(duration)
    } else {
        lower
    }
}

/// Controller living in one YouTube page.
pub struct PageProbe<D: PageDocument> {
    document: D,
    elements: HashMap<Control, ElementHandle>,
    config: ProbeConfig,
    notifications: Option<NotificationBus<Notification>>,
}

impl<D: PageDocument> PageProbe<D> {
    pub fn new(document: D, config: ProbeConfig) -> Self {
        let mut probe = Self {
            document,
            elements: HashMap::new(),
            config,
            notifications: None,
        };
        if probe.is_video_page() {
            probe.cache_elements();
        }
        probe
    }

    /// Emit `BUTTON_STATE_CHANGED` on `bus` after label-changing commands.
    pub fn with_notifications(mut self, bus: NotificationBus<Notification>) -> Self {
        self.notifications = Some(bus);
        self
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    /// Evaluated against the live URL, so single-page navigations are seen immediately.
    pub fn is_video_page(&self) -> bool {
        url_pattern::is_watch_url(&self.document.location())
    }

    /// Re-query every cached control. Controls not present are dropped.
    pub fn cache_elements(&mut self) {
        self.elements.clear();
        for control in Control::ALL {
            if let Some(element) = self.document.query_selector(control.selector()) {
                self.elements.insert(control, element);
            }
        }
    }

    pub fn cached(&self, control: Control) -> Option<ElementHandle> {
        self.elements.get(&control).copied()
    }

    /// Cached element, re-querying when absent or detached from the document.
    fn element(&mut self, control: Control) -> Option<ElementHandle> {
        match self.elements.get(&control) {
            Some(element) if self.document.is_connected(*element) => Some(*element),
            _ => {
                self.cache_elements();
                self.elements.get(&control).copied()
            }
        }
    }

    /// Feed one batch of structural mutations. Returns true if the cache was rebuilt.
    pub fn handle_mutations(&mut self, records: &[MutationRecord]) -> bool {
        let control_bar_inserted = records.iter().flat_map(|r| &r.added_nodes).any(|node| {
            node.contains_control_bar || node.class_list.iter().any(|c| c == CONTROL_BAR_CLASS)
        });
        if control_bar_inserted {
            tracing::debug!("control bar re-inserted, rebuilding element cache");
            self.cache_elements();
        }
        control_bar_inserted
    }

    /// Fresh snapshot of the player, read at call time.
    pub fn player_state(&self) -> PlayerState {
        if !self.is_video_page() {
            return PlayerState::invalid_page();
        }
        let Some(media) = self.document.media() else {
            return PlayerState::loading();
        };
        let location = self.document.location();
        PlayerState {
            is_valid_page: true,
            is_ready: true,
            is_playing: !media.paused,
            is_muted: media.muted,
            volume: (media.volume.clamp(0.0, 1.0) * 100.0).round() as u8,
            playback_rate: media.playback_rate,
            current_time: media.current_time,
            duration: if media.duration.is_finite() { media.duration } else { 0.0 },
            buffered: media.buffered_end.unwrap_or(0.0),
            video_id: url_pattern::video_id(&location),
            video_title: self.video_title(),
            error: None,
        }
    }

    fn video_title(&self) -> Option<String> {
        TITLE_SELECTORS.iter().find_map(|selector| {
            let element = self.document.query_selector(selector)?;
            let text = self.document.text_content(element)?;
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
    }

    pub fn video_progress(&self) -> Option<VideoProgress> {
        let media = self.document.media()?;
        let progress = if media.duration.is_finite() && media.duration > 0.0 {
            (media.current_time / media.duration) * 100.0
        } else {
            0.0
        };
        Some(VideoProgress {
            current_time: media.current_time,
            duration: if media.duration.is_finite() { media.duration } else { 0.0 },
            progress,
        })
    }

    /// Answer one request from the popup or the background.
    pub fn handle_request(&mut self, request: &PageRequest) -> PageResponse {
        if request.action == CommandKind::GetPlayerState.action() {
            if !self.is_video_page() {
                return PageResponse::failure("Not on video page")
                    .with_player(PlayerState::invalid_page());
            }
            return PageResponse::ok().with_player(self.player_state());
        }

        if !self.is_video_page() {
            return PageResponse::failure("Not on video page");
        }

        match CommandKind::from_request(request) {
            Ok(kind) => self.execute(kind),
            Err(e) => {
                tracing::debug!(action = %request.action, error = %e, "rejected page request");
                PageResponse::failure(e.to_string())
            }
        }
    }

    /// Execute one decoded command against the DOM.
    pub fn execute(&mut self, kind: CommandKind) -> PageResponse {
        match kind {
            CommandKind::GetPlayerState => PageResponse::ok().with_player(self.player_state()),
            CommandKind::GetVideoProgress => match self.video_progress() {
                Some(progress) => PageResponse {
                    progress: Some(progress),
                    ..PageResponse::ok()
                },
                None => PageResponse::failure("Video not found"),
            },
            CommandKind::PlayPause => self.click_labelled(Control::PlayButton, "play"),
            CommandKind::Mute => self.click_labelled(Control::MuteButton, "mute"),
            CommandKind::Next => self.click_enabled(Control::NextButton),
            CommandKind::Previous => self.click_enabled(Control::PrevButton),
            CommandKind::SetVolume(volume) => self.set_volume(volume),
            CommandKind::VolumeUp => self.step_volume(self.config.volume_step),
            CommandKind::VolumeDown => self.step_volume(-self.config.volume_step),
            CommandKind::SetSpeed(speed) => self.set_speed(clamp_speed(speed)),
            CommandKind::SpeedUp => self.step_speed(self.config.speed_step),
            CommandKind::SpeedDown => self.step_speed(-self.config.speed_step),
            CommandKind::Seek(time) => self.seek(|_, duration| clamp_position(time, duration)),
            CommandKind::Skip(seconds) => self.skip(seconds),
            CommandKind::SkipForward => self.skip(self.config.skip_seconds),
            CommandKind::SkipBackward => self.skip(-self.config.skip_seconds),
            CommandKind::Restart => self.seek(|_, _| 0.0),
            CommandKind::TheaterToggle => match self.element(Control::TheaterButton) {
                Some(button) => PageResponse::from_success(self.document.click(button)),
                None => PageResponse::failure("Theater button not found"),
            },
            CommandKind::Back => PageResponse::from_success(self.document.history_back()),
        }
    }

    /// Click a button whose label (title, else aria-label) is reported back.
    fn click_labelled(&mut self, control: Control, button: &str) -> PageResponse {
        let Some(element) = self.element(control) else {
            return PageResponse::failure(format!("{} button not found", button));
        };
        let label = self
            .document
            .attribute(element, "title")
            .or_else(|| self.document.attribute(element, "aria-label"))
            .unwrap_or_default();
        if !self.document.click(element) {
            return PageResponse::failure(format!("{} button detached", button));
        }
        self.notify(button, &label);
        PageResponse::ok().with_label(label)
    }

    fn click_enabled(&mut self, control: Control) -> PageResponse {
        match self.element(control) {
            Some(element) if !self.document.is_disabled(element) => {
                PageResponse::from_success(self.document.click(element))
            }
            _ => PageResponse::from_success(false),
        }
    }

    fn set_volume(&mut self, volume: f64) -> PageResponse {
        let volume = clamp_volume(volume);
        if !self.document.update_media(MediaUpdate::Volume(volume / 100.0)) {
            return PageResponse::failure("Video not found");
        }
        self.notify("volume", &format!("Volume: {}%", volume.round()));
        PageResponse {
            volume: Some(volume),
            ..PageResponse::ok()
        }
    }

    fn step_volume(&mut self, delta: f64) -> PageResponse {
        let Some(media) = self.document.media() else {
            return PageResponse::failure("Video not found");
        };
        self.set_volume((media.volume * 100.0).round() + delta)
    }

    fn set_speed(&mut self, speed: f64) -> PageResponse {
        if !self.document.update_media(MediaUpdate::PlaybackRate(speed)) {
            return PageResponse::failure("Video not found");
        }
        self.notify("speed", &format!("Speed: {}x", speed));
        PageResponse {
            speed: Some(speed),
            ..PageResponse::ok()
        }
    }

    fn step_speed(&mut self, delta: f64) -> PageResponse {
        let Some(media) = self.document.media() else {
            return PageResponse::failure("Video not found");
        };
        let speed = (media.playback_rate + delta).clamp(MIN_SPEED, MAX_SPEED);
        self.set_speed(speed)
    }

    fn skip(&mut self, seconds: f64) -> PageResponse {
        self.seek(|current, duration| clamp_position(current + seconds, duration))
    }

    /// Move the playhead to `target(current_time, duration)`.
    fn seek(&mut self, target: impl FnOnce(f64, f64) -> f64) -> PageResponse {
        let Some(media) = self.document.media() else {
            return PageResponse::failure("Video not found");
        };
        let position = target(media.current_time, media.duration);
        PageResponse::from_success(self.document.update_media(MediaUpdate::CurrentTime(position)))
    }

    fn notify(&self, button: &str, state: &str) {
        if let Some(bus) = &self.notifications {
            bus.publish(Notification::ButtonStateChanged {
                button: button.to_string(),
                state: state.to_string(),
            });
        }
    }
}
