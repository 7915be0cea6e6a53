//! ytcontroller — remote control for YouTube tabs.
//!
//! Entry point: runs the background coordinator and one popup session
//! against the in-memory browser, walking through tab discovery, a few
//! playback commands and recovery after the controlled tab is closed.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ytcontroller::app::BackgroundCoordinator;
use ytcontroller::managers::connection_session::ConnectionSession;
use ytcontroller::platform::{self, simulated::SimulatedBrowser};
use ytcontroller::services::storage::{KeyValueStore, MemoryStore, SqliteStore};
use ytcontroller::types::command::CommandKind;
use ytcontroller::types::config::ControllerConfig;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "ytcontroller=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config() -> ControllerConfig {
    let path = platform::get_config_path();
    match ControllerConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "using default config");
            ControllerConfig::default()
        }
    }
}

fn open_store() -> Arc<dyn KeyValueStore> {
    let path = platform::get_storage_path();
    match SqliteStore::open(&path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "storage unavailable, state will not persist");
            Arc::new(MemoryStore::new())
        }
    }
}

fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  {}", name);
    println!("───────────────────────────────────────────────────────────────");
}

#[tokio::main]
async fn main() {
    init_tracing();
    let config = load_config();
    let store = open_store();

    let browser = Arc::new(SimulatedBrowser::with_probe_config(config.probe.clone()));
    let tab_a = browser.open_tab("https://www.youtube.com/watch?v=aaaaaaaaaaa", 1, false);
    let tab_b = browser.open_tab("https://www.youtube.com/watch?v=bbbbbbbbbbb", 1, false);
    browser.open_tab("https://example.com/", 1, true);
    let now = ytcontroller::services::storage::now_millis();
    browser.set_last_accessed(tab_a, now - 10_000);
    browser.set_last_accessed(tab_b, now - 60_000);
    browser.set_playing(tab_b, true);

    let background = BackgroundCoordinator::new(browser.clone(), store.clone(), config.clone());
    background.start().await;
    background.spawn_page_listener(browser.page_bus());
    let injected = background.on_installed().await;

    section("Background detection");
    let detected = background.registry().refresh().await.ok().flatten();
    println!("  Injected content script into {} tabs", injected);
    println!("  Detected tab: {:?} (expected {})", detected.map(|t| t.tab_id), tab_b);

    section("Popup session");
    let popup = ConnectionSession::new(browser.clone(), store.clone(), background.clone(), config.session.clone());
    popup.attach(background.popup_bus());
    let connected = popup.open().await;
    println!("  Connected: {} -> {:?}", connected, popup.tracked_tab().map(|t| t.tab_id));
    if let Some(status) = popup.status() {
        println!("  Status: {}", status.message);
    }

    let response = popup.send_command(CommandKind::Mute).await;
    println!("  Mute -> success={} label={:?}", response.success, response.label());
    let response = popup.set_volume(140.0).await;
    println!("  Volume 140 -> applied {:?}", response.volume);
    let response = popup.set_speed(1.3).await;
    println!("  Speed 1.3 -> applied {:?}", response.speed);
    let display = popup.display();
    println!("  Display: {} | {} / {}", display.indicator, display.position, display.duration);

    section("Recovery after close");
    browser.close_tab(tab_b);
    let detected = background.registry().refresh().await.ok().flatten();
    println!("  Background now tracks: {:?} (expected {})", detected.map(|t| t.tab_id), tab_a);
    popup.liveness_tick().await;
    popup.liveness_tick().await;
    println!("  Popup now tracks: {:?}", popup.tracked_tab().map(|t| t.tab_id));

    section("Keyboard shortcut");
    let response = background.handle_shortcut("play-pause").await;
    println!("  play-pause -> success={} label={:?}", response.success, response.label());

    popup.teardown();
    background.shutdown();
    println!();
    println!("  Done.");
}
