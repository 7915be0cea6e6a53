//! Unit tests for the JSON method surface of the background coordinator.

use std::sync::Arc;

use serde_json::json;

use ytcontroller::app::BackgroundCoordinator;
use ytcontroller::platform::simulated::SimulatedBrowser;
use ytcontroller::rpc_handler::{handle_message, handle_method};
use ytcontroller::services::storage::MemoryStore;
use ytcontroller::types::config::ControllerConfig;

const WATCH: &str = "https://www.youtube.com/watch?v=aaaa";

fn setup() -> (Arc<SimulatedBrowser>, Arc<BackgroundCoordinator>) {
    let browser = Arc::new(SimulatedBrowser::new());
    let store = Arc::new(MemoryStore::new());
    let background = BackgroundCoordinator::new(browser.clone(), store, ControllerConfig::default());
    (browser, background)
}

// ─── General ───

#[tokio::test]
async fn test_ping() {
    let (_browser, background) = setup();
    let result = handle_method(&background, "ping", &json!({})).await.unwrap();
    assert_eq!(result, json!({"pong": true}));
}

#[tokio::test]
async fn test_unknown_method() {
    let (_browser, background) = setup();
    let err = handle_method(&background, "tab.teleport", &json!({})).await.unwrap_err();
    assert_eq!(err, "unknown method: tab.teleport");
}

// ─── Runtime messages ───

#[tokio::test]
async fn test_runtime_message_round_trip() {
    let (browser, background) = setup();
    let tab = browser.open_tab(WATCH, 1, true);

    let reply = handle_method(&background, "runtime.message", &json!({"type": "GET_ACTIVE_TAB"}))
        .await
        .unwrap();
    assert_eq!(reply, json!({"success": true, "tabId": tab}));

    let reply = handle_message(
        &background,
        &json!({"type": "SEND_COMMAND", "command": "clickMute"}),
    )
    .await;
    assert_eq!(reply["success"], json!(true));
    assert_eq!(reply["result"]["success"], json!(true));
}

#[tokio::test]
async fn test_undecodable_message_is_a_failure_record() {
    let (_browser, background) = setup();
    let reply = handle_message(&background, &json!({"type": "SELF_DESTRUCT"})).await;
    assert_eq!(reply["success"], json!(false));
    assert!(reply["error"].as_str().unwrap().starts_with("Invalid message:"));
}

#[tokio::test]
async fn test_set_auto_pause_message() {
    let (_browser, background) = setup();
    handle_message(&background, &json!({"type": "SET_AUTO_PAUSE", "enabled": true})).await;
    let result = handle_method(&background, "autopause.get", &json!({})).await.unwrap();
    assert_eq!(result, json!({"enabled": true}));
}

// ─── Tabs ───

#[tokio::test]
async fn test_tab_current_and_refresh() {
    let (browser, background) = setup();
    let current = handle_method(&background, "tab.current", &json!({})).await.unwrap();
    assert!(current.is_null());

    let tab = browser.open_tab(WATCH, 1, true);
    let refreshed = handle_method(&background, "tab.refresh", &json!({})).await.unwrap();
    assert_eq!(refreshed["tabId"], json!(tab));

    let current = handle_method(&background, "tab.current", &json!({})).await.unwrap();
    assert_eq!(current["tabId"], json!(tab));
}

#[tokio::test]
async fn test_tab_inject_all() {
    let (browser, background) = setup();
    browser.open_tab_without_script(WATCH, 1, true);
    let result = handle_method(&background, "tab.inject_all", &json!({})).await.unwrap();
    assert_eq!(result, json!({"injected": 1}));
}

// ─── Shortcuts ───

#[tokio::test]
async fn test_shortcut_list_is_sorted_and_described() {
    let (_browser, background) = setup();
    let result = handle_method(&background, "shortcut.list", &json!({})).await.unwrap();
    let items = result["items"].as_array().unwrap();
    assert_eq!(items.len(), 13);
    let commands: Vec<&str> = items.iter().map(|i| i["command"].as_str().unwrap()).collect();
    let mut sorted = commands.clone();
    sorted.sort();
    assert_eq!(commands, sorted);
    assert!(items.iter().all(|i| i["description"].is_string()));
}

#[tokio::test]
async fn test_shortcut_register_and_run_keys() {
    let (browser, background) = setup();
    let tab = browser.open_tab(WATCH, 1, true);

    handle_method(
        &background,
        "shortcut.register",
        &json!({"command": "toggle-mute", "keys": "Ctrl+Shift+M"}),
    )
    .await
    .unwrap();
    let result = handle_method(&background, "shortcut.keys", &json!({"keys": "Ctrl+Shift+M"}))
        .await
        .unwrap();
    assert_eq!(result["success"], json!(true));
    assert_eq!(browser.with_page(tab, |p| p.click_count(".ytp-mute-button")), Some(1));

    let conflict = handle_method(
        &background,
        "shortcut.register",
        &json!({"command": "play-pause", "keys": "Ctrl+Shift+M"}),
    )
    .await;
    assert!(conflict.is_err());

    handle_method(&background, "shortcut.reset", &json!({})).await.unwrap();
    let result = handle_method(&background, "shortcut.keys", &json!({"keys": "Ctrl+Shift+M"}))
        .await
        .unwrap();
    assert_eq!(result["success"], json!(false));
}

#[tokio::test]
async fn test_shortcut_run_requires_command() {
    let (browser, background) = setup();
    let err = handle_method(&background, "shortcut.run", &json!({})).await.unwrap_err();
    assert_eq!(err, "missing command");

    browser.open_tab(WATCH, 1, true);
    let result = handle_method(&background, "shortcut.run", &json!({"command": "theater-mode"}))
        .await
        .unwrap();
    assert_eq!(result["success"], json!(true));
}
