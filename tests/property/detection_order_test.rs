//! Property-based tests for tab detection order.
//!
//! For any set of background watch-page tabs, detection picks the first
//! playing tab in listing order; with nothing playing it picks the most
//! recently accessed tab, the first one winning a tie. The resolved tab is
//! mirrored to the `activeTabId` hint, and an empty set clears it.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use ytcontroller::managers::tab_registry::TabRegistry;
use ytcontroller::platform::simulated::SimulatedBrowser;
use ytcontroller::services::command_relay::CommandRelay;
use ytcontroller::services::storage::{self, MemoryStore};
use ytcontroller::services::tab_detection::{Strategy as Detected, TabDetector};

/// One background tab: its access time and whether its video is playing.
#[derive(Debug, Clone)]
struct BackgroundTab {
    last_accessed: i64,
    playing: bool,
}

fn arb_tabs() -> impl Strategy<Value = Vec<BackgroundTab>> {
    prop::collection::vec(
        (0i64..8, prop::bool::weighted(0.25)).prop_map(|(last_accessed, playing)| BackgroundTab {
            last_accessed,
            playing,
        }),
        0..8,
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn setup(tabs: &[BackgroundTab]) -> (Arc<SimulatedBrowser>, Arc<MemoryStore>, TabRegistry, Vec<i64>) {
    let browser = Arc::new(SimulatedBrowser::new());
    let store = Arc::new(MemoryStore::new());
    // A non-watch tab holds focus, so no watch tab is active in the current window.
    browser.open_tab("https://example.com/", 1, true);
    let ids = tabs
        .iter()
        .enumerate()
        .map(|(i, tab)| {
            let id = browser.open_tab(&format!("https://www.youtube.com/watch?v=v{}", i), 1, false);
            browser.set_last_accessed(id, tab.last_accessed);
            browser.set_playing(id, tab.playing);
            id
        })
        .collect();
    let relay = CommandRelay::new(browser.clone(), Duration::from_secs(2));
    let registry = TabRegistry::new(TabDetector::new(relay), store.clone());
    (browser, store, registry, ids)
}

/// Expected pick, computed directly from the tab list.
fn expected(tabs: &[BackgroundTab], ids: &[i64]) -> Option<(i64, Detected)> {
    if let Some(i) = tabs.iter().position(|s| s.playing) {
        return Some((ids[i], Detected::Playing));
    }
    let mut best: Option<usize> = None;
    for (i, tab) in tabs.iter().enumerate() {
        match best {
            Some(b) if tabs[b].last_accessed >= tab.last_accessed => {}
            _ => best = Some(i),
        }
    }
    best.map(|i| (ids[i], Detected::MostRecent))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn detection_prefers_playing_then_most_recent(tabs in arb_tabs()) {
        let rt = runtime();
        let (_browser, _store, registry, ids) = setup(&tabs);
        let detection = rt.block_on(registry.detector().detect()).unwrap();
        let actual = detection.map(|d| (d.tab.id, d.strategy));
        prop_assert_eq!(actual, expected(&tabs, &ids));
    }

    #[test]
    fn refresh_mirrors_result_to_hint(tabs in arb_tabs()) {
        let rt = runtime();
        let (_browser, store, registry, ids) = setup(&tabs);
        rt.block_on(storage::save_hint(store.as_ref(), 999));

        let tracked = rt.block_on(registry.refresh()).unwrap();
        let hint = rt.block_on(storage::load_hint(store.as_ref()));
        let want = expected(&tabs, &ids).map(|(id, _)| id);

        prop_assert_eq!(tracked.map(|t| t.tab_id), want);
        prop_assert_eq!(hint, want);
    }

    #[test]
    fn cached_belief_survives_new_candidates(tabs in arb_tabs(), extra in 1usize..4) {
        let rt = runtime();
        let (browser, _store, registry, _ids) = setup(&tabs);
        let first = rt.block_on(registry.refresh()).unwrap();

        for i in 0..extra {
            let id = browser.open_tab(&format!("https://www.youtube.com/watch?v=x{}", i), 1, false);
            browser.set_playing(id, true);
            browser.set_last_accessed(id, 1_000);
        }
        let second = rt.block_on(registry.refresh()).unwrap();

        match first {
            Some(first) => prop_assert_eq!(second.map(|t| t.tab_id), Some(first.tab_id)),
            None => prop_assert!(second.is_some()),
        }
    }
}

#[test]
fn test_playing_background_tab_beats_recent_one() {
    let rt = runtime();
    let tabs = vec![
        BackgroundTab { last_accessed: 10, playing: false },
        BackgroundTab { last_accessed: 1, playing: true },
    ];
    let (_browser, _store, registry, ids) = setup(&tabs);
    let tracked = rt.block_on(registry.refresh()).unwrap();
    assert_eq!(tracked.map(|t| t.tab_id), Some(ids[1]));
}
