//! Unit tests for the BackgroundCoordinator: tab lifecycle events, runtime
//! messages, auto-pause, keyboard shortcuts and page broadcast forwarding.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use ytcontroller::app::{BackgroundCoordinator, DETECTION_TASK};
use ytcontroller::platform::host::PageDocument;
use ytcontroller::platform::simulated::SimulatedBrowser;
use ytcontroller::services::storage::{self, keys, KeyValueStore, MemoryStore};
use ytcontroller::types::config::ControllerConfig;
use ytcontroller::types::message::{Notification, RuntimeMessage};
use ytcontroller::types::tab::{TabChange, TabEvent};

const WATCH_A: &str = "https://www.youtube.com/watch?v=aaaa";
const WATCH_B: &str = "https://www.youtube.com/watch?v=bbbb";

fn setup() -> (Arc<SimulatedBrowser>, Arc<MemoryStore>, Arc<BackgroundCoordinator>) {
    let browser = Arc::new(SimulatedBrowser::new());
    let store = Arc::new(MemoryStore::new());
    let background =
        BackgroundCoordinator::new(browser.clone(), store.clone(), ControllerConfig::default());
    (browser, store, background)
}

fn play_clicks(browser: &SimulatedBrowser, tab: i64) -> usize {
    browser
        .with_page(tab, |p| p.click_count(".ytp-play-button"))
        .unwrap_or(0)
}

// ─── Startup ───

#[tokio::test(start_paused = true)]
async fn test_start_restores_auto_pause_and_polls() {
    let (browser, store, background) = setup();
    store.set(keys::AUTO_PAUSE_ENABLED, json!(true)).await.unwrap();

    let first = browser.open_tab(WATCH_A, 1, true);

    background.start().await;
    assert!(background.auto_pause_enabled());
    assert!(background.scheduler().is_scheduled(DETECTION_TASK));

    // The first pass runs at once rather than one poll period later.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(background.current_tab_id(), Some(first));

    browser.close_tab(first);
    let second = browser.open_tab(WATCH_B, 1, true);
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(background.current_tab_id(), Some(first));
    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(background.current_tab_id(), Some(second));

    background.shutdown();
    assert!(!background.scheduler().is_scheduled(DETECTION_TASK));
}

#[tokio::test]
async fn test_on_installed_injects_youtube_tabs_only() {
    let (browser, _store, background) = setup();
    let bare = browser.open_tab_without_script(WATCH_A, 1, false);
    browser.open_tab("https://www.youtube.com/", 1, false);
    browser.open_tab_without_script("https://example.com/", 1, true);

    assert_eq!(background.on_installed().await, 2);
    assert!(browser.is_injected(bare));
    assert_eq!(browser.injection_count(), 2);
}

// ─── Tab events ───

#[tokio::test]
async fn test_completed_watch_page_is_adopted_and_announced() {
    let (browser, store, background) = setup();
    let mut popup = background.popup_bus().subscribe();
    let tab = browser.open_tab(WATCH_A, 1, false);

    background
        .handle_tab_event(TabEvent::Updated {
            tab_id: tab,
            change: TabChange {
                status: Some("complete".to_string()),
                url: None,
            },
            tab: browser.tab(tab).unwrap(),
        })
        .await;

    assert_eq!(background.current_tab_id(), Some(tab));
    assert_eq!(storage::load_hint(store.as_ref()).await, Some(tab));
    assert_eq!(
        popup.try_recv().unwrap(),
        Notification::NewYoutubeTab {
            tab_id: tab,
            url: WATCH_A.to_string()
        }
    );
}

#[tokio::test]
async fn test_current_tab_leaving_youtube_is_invalidated() {
    let (browser, store, background) = setup();
    let tab = browser.open_tab(WATCH_A, 1, true);
    background.registry().refresh().await.unwrap();

    let updated = browser.navigate(tab, "https://example.com/").unwrap();
    background
        .handle_tab_event(TabEvent::Updated {
            tab_id: tab,
            change: TabChange {
                status: None,
                url: Some("https://example.com/".to_string()),
            },
            tab: updated,
        })
        .await;

    assert!(background.registry().current().is_none());
    assert_eq!(storage::load_hint(store.as_ref()).await, None);
}

#[tokio::test]
async fn test_removed_tab_is_invalidated_only_if_current() {
    let (browser, _store, background) = setup();
    let a = browser.open_tab(WATCH_A, 1, true);
    let b = browser.open_tab(WATCH_B, 2, false);
    background.registry().refresh().await.unwrap();

    browser.close_tab(b);
    background.handle_tab_event(TabEvent::Removed(b)).await;
    assert_eq!(background.current_tab_id(), Some(a));

    browser.close_tab(a);
    background.handle_tab_event(TabEvent::Removed(a)).await;
    assert!(background.current_tab_id().is_none());
}

#[tokio::test]
async fn test_activating_watch_tab_announces_it() {
    let (browser, _store, background) = setup();
    let mut popup = background.popup_bus().subscribe();
    browser.open_tab(WATCH_A, 1, true);
    let b = browser.open_tab(WATCH_B, 1, false);
    let other = browser.open_tab("https://example.com/", 1, false);

    background
        .handle_tab_event(TabEvent::Activated { tab_id: other, window_id: 1 })
        .await;
    assert!(popup.try_recv().is_err());

    background
        .handle_tab_event(TabEvent::Activated { tab_id: b, window_id: 1 })
        .await;
    assert_eq!(background.current_tab_id(), Some(b));
    assert!(matches!(
        popup.try_recv().unwrap(),
        Notification::YoutubeTabActivated { tab_id, .. } if tab_id == b
    ));
}

#[tokio::test]
async fn test_created_tab_triggers_detection_without_belief() {
    let (browser, _store, background) = setup();
    let tab = browser.open_tab(WATCH_A, 1, true);
    background
        .handle_tab_event(TabEvent::Created(browser.tab(tab).unwrap()))
        .await;
    assert_eq!(background.current_tab_id(), Some(tab));
}

// ─── Auto-pause ───

#[tokio::test]
async fn test_auto_pause_on_tab_switch() {
    let (browser, store, background) = setup();
    let a = browser.open_tab(WATCH_A, 1, true);
    let other = browser.open_tab("https://example.com/", 1, false);
    background.registry().refresh().await.unwrap();
    browser.set_playing(a, true);

    background.set_auto_pause(true).await;
    assert_eq!(
        store.get(keys::AUTO_PAUSE_ENABLED).await.unwrap(),
        Some(json!(true))
    );

    background
        .handle_tab_event(TabEvent::Activated { tab_id: other, window_id: 1 })
        .await;
    assert_eq!(play_clicks(&browser, a), 1);
    assert!(browser.with_page(a, |p| p.media().unwrap().paused).unwrap());

    // Already paused: a second switch leaves it alone.
    background
        .handle_tab_event(TabEvent::Activated { tab_id: other, window_id: 1 })
        .await;
    assert_eq!(play_clicks(&browser, a), 1);
}

#[tokio::test]
async fn test_auto_pause_on_window_blur() {
    let (browser, _store, background) = setup();
    let a = browser.open_tab(WATCH_A, 1, true);
    background.registry().refresh().await.unwrap();
    browser.set_playing(a, true);

    background.handle_tab_event(TabEvent::WindowFocusChanged(None)).await;
    assert_eq!(play_clicks(&browser, a), 0, "auto-pause is off by default");

    background.set_auto_pause(true).await;
    background.handle_tab_event(TabEvent::WindowFocusChanged(Some(2))).await;
    assert_eq!(play_clicks(&browser, a), 0);
    background.handle_tab_event(TabEvent::WindowFocusChanged(None)).await;
    assert_eq!(play_clicks(&browser, a), 1);
}

// ─── Runtime messages ───

#[tokio::test]
async fn test_get_active_tab() {
    let (browser, _store, background) = setup();
    let none = background.handle_message(RuntimeMessage::GetActiveTab).await;
    assert!(!none.success);
    assert_eq!(none.error.as_deref(), Some("No YouTube tabs found"));

    let tab = browser.open_tab(WATCH_A, 1, true);
    let found = background.handle_message(RuntimeMessage::GetActiveTab).await;
    assert!(found.success);
    assert_eq!(found.tab_id, Some(tab));
}

#[tokio::test]
async fn test_send_command_forwards_page_answer() {
    let (browser, _store, background) = setup();
    let missing = background
        .handle_message(RuntimeMessage::SendCommand {
            command: "clickMute".to_string(),
            params: Default::default(),
        })
        .await;
    assert_eq!(missing.error.as_deref(), Some("No YouTube tab available"));

    let tab = browser.open_tab(WATCH_A, 1, true);
    let mut params = serde_json::Map::new();
    params.insert("volume".to_string(), json!(30));
    let response = background
        .handle_message(RuntimeMessage::SendCommand {
            command: "setVolume".to_string(),
            params,
        })
        .await;
    assert!(response.success);
    assert_eq!(response.result.unwrap()["volume"], json!(30.0));
    assert_eq!(
        browser.with_page(tab, |p| p.media().unwrap().volume),
        Some(0.3)
    );
}

// ─── Shortcuts ───

#[tokio::test]
async fn test_shortcut_reaches_active_tab() {
    let (browser, _store, background) = setup();
    let tab = browser.open_tab(WATCH_A, 1, true);

    assert!(background.handle_shortcut("toggle-mute").await.success);
    assert!(browser.with_page(tab, |p| p.media().unwrap().muted).unwrap());

    assert!(background.handle_key_combo("Ctrl+Alt+F").await.success);
    assert_eq!(
        browser.with_page(tab, |p| p.media().unwrap().current_time),
        Some(10.0)
    );

    assert!(!background.handle_shortcut("launch-rocket").await.success);
    assert!(!background.handle_key_combo("Ctrl+Alt+Z").await.success);
}

#[tokio::test]
async fn test_shortcut_without_tab_fails_softly() {
    let (_browser, _store, background) = setup();
    let response = background.handle_shortcut("play-pause").await;
    assert!(!response.success);
}

// ─── Page broadcasts ───

#[tokio::test(start_paused = true)]
async fn test_page_broadcast_is_persisted_and_forwarded() {
    let (browser, store, background) = setup();
    let mut popup = background.popup_bus().subscribe();
    background.spawn_page_listener(browser.page_bus());
    browser.open_tab(WATCH_A, 1, true);

    assert!(background.handle_shortcut("play-pause").await.success);
    let forwarded = tokio::time::timeout(Duration::from_secs(1), popup.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        forwarded,
        Notification::ButtonStateChanged {
            button: "play".to_string(),
            state: "Play (k)".to_string()
        }
    );

    let record = storage::load_button_state(store.as_ref()).await.unwrap();
    assert_eq!(record.state, "Play (k)");
    assert!(record.timestamp > 0);
}
