//! In-memory browser.
//!
//! A deterministic stand-in for the real browser: tabs in listing order,
//! one focused window, and a scripted YouTube page per tab with a content
//! script ([`PageProbe`]) that may or may not be injected. Used by the demo
//! binary and by the test suites to drive the background and the popup
//! end to end.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::platform::host::{PageDocument, TabHost};
use crate::services::notification_bus::NotificationBus;
use crate::services::page_probe::{Control, PageProbe, CONTROL_BAR_CLASS};
use crate::services::url_pattern;
use crate::types::command::{PageRequest, PageResponse};
use crate::types::config::ProbeConfig;
use crate::types::errors::{ChannelError, TabError};
use crate::types::message::Notification;
use crate::types::page::{AddedNode, ElementHandle, MediaSnapshot, MediaUpdate, MutationRecord};
use crate::types::tab::{BrowserTab, TabId, TabQuery, WindowId};

const TITLE_SELECTOR: &str = "#title h1";
const DEFAULT_DURATION: f64 = 300.0;

#[derive(Debug, Clone)]
struct SimElement {
    selector: String,
    attributes: HashMap<String, String>,
    disabled: bool,
    connected: bool,
    text: Option<String>,
}

impl SimElement {
    fn new(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            attributes: HashMap::new(),
            disabled: false,
            connected: true,
            text: None,
        }
    }

    fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }
}

/// A scripted YouTube page.
#[derive(Debug, Clone)]
pub struct SimulatedPage {
    location: String,
    history: Vec<String>,
    /// Indexed by `ElementHandle`; detached elements stay in place.
    elements: Vec<SimElement>,
    media: Option<MediaSnapshot>,
    theater: bool,
    clicks: HashMap<String, usize>,
}

impl SimulatedPage {
    /// A watch page with a paused, fully rendered player.
    pub fn watch(video_id: &str, title: &str) -> Self {
        let mut page = Self::blank(&format!("https://www.youtube.com/watch?v={}", video_id));
        page.render_controls();
        page.elements.push(SimElement {
            text: Some(format!("  {}  ", title)),
            ..SimElement::new(TITLE_SELECTOR)
        });
        page.media = Some(MediaSnapshot {
            paused: true,
            muted: false,
            volume: 1.0,
            playback_rate: 1.0,
            current_time: 0.0,
            duration: DEFAULT_DURATION,
            buffered_end: Some(30.0),
        });
        page
    }

    /// A page with no player at all (home page, search results, other sites).
    pub fn blank(url: &str) -> Self {
        Self {
            location: url.to_string(),
            history: Vec::new(),
            elements: Vec::new(),
            media: None,
            theater: false,
            clicks: HashMap::new(),
        }
    }

    /// Page for `url`: a watch page when `url` is one, blank otherwise.
    pub fn for_url(url: &str) -> Self {
        match url_pattern::video_id(url) {
            Some(id) if url_pattern::is_watch_url(url) => {
                let mut page = Self::watch(&id, &format!("Video {}", id));
                page.location = url.to_string();
                page
            }
            _ => Self::blank(url),
        }
    }

    fn render_controls(&mut self) {
        let paused = self.media.as_ref().map(|m| m.paused).unwrap_or(true);
        let muted = self.media.as_ref().map(|m| m.muted).unwrap_or(false);
        self.elements.extend([
            SimElement::new(".ytp-play-button").with_attribute("title", play_label(paused)),
            SimElement::new(".ytp-next-button").with_attribute("aria-label", "Next (SHIFT+n)"),
            SimElement::new(".ytp-prev-button").with_attribute("aria-label", "Previous (SHIFT+p)"),
            SimElement::new(".ytp-mute-button").with_attribute("title", mute_label(muted)),
            SimElement::new("#movie_player"),
            SimElement::new(".ytp-size-button").with_attribute("title", "Theater mode (t)"),
        ]);
    }

    /// Replace the control bar with a fresh copy, detaching every old
    /// control. Returns the mutation batch the page would observe.
    pub fn rerender_controls(&mut self) -> Vec<MutationRecord> {
        let control_selectors: Vec<&str> = Control::ALL.iter().map(|c| c.selector()).collect();
        for element in &mut self.elements {
            let is_control = control_selectors
                .iter()
                .any(|s| s.split(',').any(|part| part.trim() == element.selector));
            if is_control {
                element.connected = false;
            }
        }
        self.render_controls();
        vec![MutationRecord {
            added_nodes: vec![AddedNode {
                class_list: vec![CONTROL_BAR_CLASS.to_string()],
                contains_control_bar: true,
            }],
        }]
    }

    /// Same-document navigation.
    pub fn navigate(&mut self, url: &str) {
        let previous = std::mem::replace(&mut self.location, url.to_string());
        self.history.push(previous);
    }

    pub fn set_playing(&mut self, playing: bool) {
        if let Some(media) = &mut self.media {
            media.paused = !playing;
        }
        self.relabel();
    }

    /// Remove the media element, as while the player is still loading.
    pub fn remove_media(&mut self) {
        self.media = None;
    }

    pub fn set_duration(&mut self, duration: f64) {
        if let Some(media) = &mut self.media {
            media.duration = duration;
        }
    }

    pub fn set_disabled(&mut self, selector: &str, disabled: bool) {
        for element in self.elements.iter_mut().filter(|e| e.selector == selector) {
            element.disabled = disabled;
        }
    }

    /// Advance the playback clock by `seconds` of wall time.
    pub fn advance(&mut self, seconds: f64) {
        if let Some(media) = &mut self.media {
            if !media.paused {
                let next = media.current_time + seconds * media.playback_rate;
                media.current_time = if media.duration.is_finite() && media.duration > 0.0 {
                    next.min(media.duration)
                } else {
                    next
                };
            }
        }
    }

    pub fn is_theater(&self) -> bool {
        self.theater
    }

    /// How many clicks reached an element with this exact selector.
    pub fn click_count(&self, selector: &str) -> usize {
        self.clicks.get(selector).copied().unwrap_or(0)
    }

    fn relabel(&mut self) {
        let paused = self.media.as_ref().map(|m| m.paused).unwrap_or(true);
        let muted = self.media.as_ref().map(|m| m.muted).unwrap_or(false);
        for element in self.elements.iter_mut().filter(|e| e.connected) {
            match element.selector.as_str() {
                ".ytp-play-button" => {
                    element.attributes.insert("title".into(), play_label(paused).into());
                }
                ".ytp-mute-button" => {
                    element.attributes.insert("title".into(), mute_label(muted).into());
                }
                _ => {}
            }
        }
    }

    fn get(&self, element: ElementHandle) -> Option<&SimElement> {
        self.elements.get(element.0 as usize)
    }
}

fn play_label(paused: bool) -> &'static str {
    if paused {
        "Play (k)"
    } else {
        "Pause (k)"
    }
}

fn mute_label(muted: bool) -> &'static str {
    if muted {
        "Unmute (m)"
    } else {
        "Mute (m)"
    }
}

impl PageDocument for SimulatedPage {
    fn location(&self) -> String {
        self.location.clone()
    }

    fn query_selector(&self, selector: &str) -> Option<ElementHandle> {
        let wanted: Vec<&str> = selector.split(',').map(str::trim).collect();
        self.elements
            .iter()
            .position(|e| e.connected && wanted.contains(&e.selector.as_str()))
            .map(|index| ElementHandle(index as u64))
    }

    fn is_connected(&self, element: ElementHandle) -> bool {
        self.get(element).map(|e| e.connected).unwrap_or(false)
    }

    fn attribute(&self, element: ElementHandle, name: &str) -> Option<String> {
        self.get(element)?.attributes.get(name).cloned()
    }

    fn is_disabled(&self, element: ElementHandle) -> bool {
        self.get(element).map(|e| e.disabled).unwrap_or(false)
    }

    fn text_content(&self, element: ElementHandle) -> Option<String> {
        self.get(element)?.text.clone()
    }

    fn click(&mut self, element: ElementHandle) -> bool {
        let Some(selector) = self
            .get(element)
            .filter(|e| e.connected)
            .map(|e| e.selector.clone())
        else {
            return false;
        };
        *self.clicks.entry(selector.clone()).or_default() += 1;
        match selector.as_str() {
            ".ytp-play-button" => {
                if let Some(media) = &mut self.media {
                    media.paused = !media.paused;
                }
            }
            ".ytp-mute-button" => {
                if let Some(media) = &mut self.media {
                    media.muted = !media.muted;
                }
            }
            ".ytp-size-button" => self.theater = !self.theater,
            _ => {}
        }
        self.relabel();
        true
    }

    fn media(&self) -> Option<MediaSnapshot> {
        self.media.clone()
    }

    fn update_media(&mut self, update: MediaUpdate) -> bool {
        let Some(media) = &mut self.media else {
            return false;
        };
        match update {
            MediaUpdate::Volume(volume) => media.volume = volume,
            MediaUpdate::PlaybackRate(rate) => media.playback_rate = rate,
            MediaUpdate::CurrentTime(time) => media.current_time = time,
        }
        true
    }

    fn history_back(&mut self) -> bool {
        if let Some(previous) = self.history.pop() {
            self.location = previous;
        }
        true
    }
}

struct SimTab {
    tab: BrowserTab,
    /// `None` until the content script is injected.
    probe: Option<PageProbe<SimulatedPage>>,
    /// The page exists but never answers.
    unresponsive: bool,
}

struct BrowserState {
    tabs: Vec<SimTab>,
    current_window: WindowId,
    next_id: TabId,
    clock: i64,
    injections: usize,
}

impl BrowserState {
    fn tab_mut(&mut self, tab_id: TabId) -> Option<&mut SimTab> {
        self.tabs.iter_mut().find(|t| t.tab.id == tab_id)
    }

    fn tick(&mut self) -> i64 {
        self.clock += 1;
        self.clock
    }
}

/// In-memory [`TabHost`].
pub struct SimulatedBrowser {
    state: Mutex<BrowserState>,
    page_bus: NotificationBus<Notification>,
    probe_config: ProbeConfig,
}

impl SimulatedBrowser {
    pub fn new() -> Self {
        Self::with_probe_config(ProbeConfig::default())
    }

    pub fn with_probe_config(probe_config: ProbeConfig) -> Self {
        Self {
            state: Mutex::new(BrowserState {
                tabs: Vec::new(),
                current_window: 1,
                next_id: 1,
                clock: 0,
                injections: 0,
            }),
            page_bus: NotificationBus::default(),
            probe_config,
        }
    }

    fn state(&self) -> MutexGuard<'_, BrowserState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Broadcasts emitted by every page's content script.
    pub fn page_bus(&self) -> &NotificationBus<Notification> {
        &self.page_bus
    }

    fn probe_for(&self, page: SimulatedPage) -> PageProbe<SimulatedPage> {
        PageProbe::new(page, self.probe_config.clone()).with_notifications(self.page_bus.clone())
    }

    /// Open a tab with the content script already running (YouTube pages only).
    pub fn open_tab(&self, url: &str, window_id: WindowId, active: bool) -> TabId {
        let page = url_pattern::is_youtube_url(url).then(|| self.probe_for(SimulatedPage::for_url(url)));
        self.insert(url, window_id, active, page)
    }

    /// Open a tab with a custom page and the content script running.
    pub fn open_page(&self, page: SimulatedPage, window_id: WindowId, active: bool) -> TabId {
        let url = page.location();
        let probe = self.probe_for(page);
        self.insert(&url, window_id, active, Some(probe))
    }

    /// Open a tab whose content script has not been injected.
    pub fn open_tab_without_script(&self, url: &str, window_id: WindowId, active: bool) -> TabId {
        self.insert(url, window_id, active, None)
    }

    fn insert(
        &self,
        url: &str,
        window_id: WindowId,
        active: bool,
        probe: Option<PageProbe<SimulatedPage>>,
    ) -> TabId {
        let mut state = self.state();
        let id = state.next_id;
        state.next_id += 1;
        if active {
            for other in state.tabs.iter_mut().filter(|t| t.tab.window_id == window_id) {
                other.tab.active = false;
            }
        }
        let last_accessed = state.tick();
        state.tabs.push(SimTab {
            tab: BrowserTab {
                id,
                url: url.to_string(),
                window_id,
                active,
                last_accessed,
            },
            probe,
            unresponsive: false,
        });
        id
    }

    pub fn close_tab(&self, tab_id: TabId) -> bool {
        let mut state = self.state();
        let before = state.tabs.len();
        state.tabs.retain(|t| t.tab.id != tab_id);
        state.tabs.len() != before
    }

    /// Navigate a tab. The content script survives same-origin navigation.
    pub fn navigate(&self, tab_id: TabId, url: &str) -> Option<BrowserTab> {
        let mut state = self.state();
        let sim = state.tab_mut(tab_id)?;
        sim.tab.url = url.to_string();
        if let Some(probe) = &mut sim.probe {
            if url_pattern::is_youtube_url(url) {
                probe.document_mut().navigate(url);
            } else {
                sim.probe = None;
            }
        }
        Some(sim.tab.clone())
    }

    /// Make a tab the active one of its window and focus that window.
    pub fn activate(&self, tab_id: TabId) -> Option<BrowserTab> {
        let mut state = self.state();
        let window_id = state.tabs.iter().find(|t| t.tab.id == tab_id)?.tab.window_id;
        let now = state.tick();
        for sim in state.tabs.iter_mut().filter(|t| t.tab.window_id == window_id) {
            sim.tab.active = sim.tab.id == tab_id;
            if sim.tab.active {
                sim.tab.last_accessed = now;
            }
        }
        state.current_window = window_id;
        state.tabs.iter().find(|t| t.tab.id == tab_id).map(|t| t.tab.clone())
    }

    pub fn focus_window(&self, window_id: WindowId) {
        self.state().current_window = window_id;
    }

    pub fn set_last_accessed(&self, tab_id: TabId, last_accessed: i64) {
        if let Some(sim) = self.state().tab_mut(tab_id) {
            sim.tab.last_accessed = last_accessed;
        }
    }

    pub fn set_unresponsive(&self, tab_id: TabId, unresponsive: bool) {
        if let Some(sim) = self.state().tab_mut(tab_id) {
            sim.unresponsive = unresponsive;
        }
    }

    pub fn set_playing(&self, tab_id: TabId, playing: bool) {
        self.with_page(tab_id, |page| page.set_playing(playing));
    }

    /// Run `f` against the page of a tab whose content script is injected.
    pub fn with_page<R>(&self, tab_id: TabId, f: impl FnOnce(&mut SimulatedPage) -> R) -> Option<R> {
        self.with_probe(tab_id, |probe| f(probe.document_mut()))
    }

    pub fn with_probe<R>(
        &self,
        tab_id: TabId,
        f: impl FnOnce(&mut PageProbe<SimulatedPage>) -> R,
    ) -> Option<R> {
        let mut state = self.state();
        let probe = state.tab_mut(tab_id)?.probe.as_mut()?;
        Some(f(probe))
    }

    pub fn tab(&self, tab_id: TabId) -> Option<BrowserTab> {
        self.state()
            .tabs
            .iter()
            .find(|t| t.tab.id == tab_id)
            .map(|t| t.tab.clone())
    }

    pub fn is_injected(&self, tab_id: TabId) -> bool {
        self.state()
            .tabs
            .iter()
            .any(|t| t.tab.id == tab_id && t.probe.is_some())
    }

    pub fn injection_count(&self) -> usize {
        self.state().injections
    }
}

impl Default for SimulatedBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TabHost for SimulatedBrowser {
    async fn get(&self, tab_id: TabId) -> Result<BrowserTab, TabError> {
        self.tab(tab_id).ok_or(TabError::NotFound(tab_id))
    }

    async fn query(&self, query: &TabQuery) -> Result<Vec<BrowserTab>, TabError> {
        let state = self.state();
        Ok(state
            .tabs
            .iter()
            .map(|t| &t.tab)
            .filter(|tab| {
                query
                    .url_pattern
                    .as_deref()
                    .map_or(true, |pattern| url_pattern::url_matches_pattern(&tab.url, pattern))
            })
            .filter(|tab| query.active.map_or(true, |active| tab.active == active))
            .filter(|tab| !query.current_window || tab.window_id == state.current_window)
            .cloned()
            .collect())
    }

    async fn send_message(
        &self,
        tab_id: TabId,
        request: &PageRequest,
    ) -> Result<PageResponse, ChannelError> {
        {
            let mut state = self.state();
            let sim = state.tab_mut(tab_id).ok_or(ChannelError::TabClosed(tab_id))?;
            if !sim.unresponsive {
                let probe = sim.probe.as_mut().ok_or(ChannelError::NoReceiver(tab_id))?;
                return Ok(probe.handle_request(request));
            }
        }
        // Hung page: only the caller's timeout ends the round-trip.
        std::future::pending::<()>().await;
        Err(ChannelError::Timeout(tab_id))
    }

    async fn inject_content_script(&self, tab_id: TabId) -> Result<(), ChannelError> {
        let mut state = self.state();
        let sim = state
            .tab_mut(tab_id)
            .ok_or_else(|| ChannelError::InjectionFailed(tab_id, "no such tab".to_string()))?;
        if !url_pattern::is_youtube_url(&sim.tab.url) {
            return Err(ChannelError::InjectionFailed(
                tab_id,
                "cannot access contents of this page".to_string(),
            ));
        }
        if sim.probe.is_none() {
            sim.probe = Some(self.probe_for(SimulatedPage::for_url(&sim.tab.url)));
        }
        state.injections += 1;
        Ok(())
    }
}
