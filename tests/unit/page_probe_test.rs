//! Unit tests for the PageProbe running against a scripted page.
//!
//! Covers state snapshots, every playback command, clamping, missing
//! controls and recovery of the element cache after a re-render.

use rstest::rstest;
use serde_json::json;

use ytcontroller::platform::host::PageDocument;
use ytcontroller::platform::simulated::SimulatedPage;
use ytcontroller::services::notification_bus::NotificationBus;
use ytcontroller::services::page_probe::{Control, PageProbe};
use ytcontroller::types::command::{CommandKind, PageRequest};
use ytcontroller::types::config::ProbeConfig;
use ytcontroller::types::message::Notification;
use ytcontroller::types::page::MutationRecord;

fn probe() -> PageProbe<SimulatedPage> {
    PageProbe::new(SimulatedPage::watch("dQw4w9WgXcQ", "Test Video"), ProbeConfig::default())
}

fn request(value: serde_json::Value) -> PageRequest {
    PageRequest::from_value(&value).unwrap()
}

// ─── State snapshots ───

#[test]
fn test_state_of_watch_page() {
    let probe = probe();
    let state = probe.player_state();
    assert!(state.is_valid_page);
    assert!(state.is_ready);
    assert!(!state.is_playing);
    assert_eq!(state.volume, 100);
    assert_eq!(state.video_id.as_deref(), Some("dQw4w9WgXcQ"));
    assert_eq!(state.video_title.as_deref(), Some("Test Video"));
    assert_eq!(state.duration, 300.0);
}

#[test]
fn test_repeated_probes_agree_except_current_time() {
    let mut probe = probe();
    probe.document_mut().set_playing(true);
    let first = probe.player_state();
    probe.document_mut().advance(2.0);
    let second = probe.player_state();

    assert!(second.current_time >= first.current_time);
    let mut aligned = second.clone();
    aligned.current_time = first.current_time;
    assert_eq!(aligned, first);
}

#[test]
fn test_loading_player_reports_not_ready() {
    let mut page = SimulatedPage::watch("abc", "Loading");
    page.remove_media();
    let probe = PageProbe::new(page, ProbeConfig::default());
    let state = probe.player_state();
    assert!(state.is_valid_page);
    assert!(!state.is_ready);
    assert!(state.error.is_some());
}

#[test]
fn test_non_video_page_rejects_everything() {
    let mut probe = PageProbe::new(
        SimulatedPage::blank("https://www.youtube.com/feed/subscriptions"),
        ProbeConfig::default(),
    );
    let response = probe.handle_request(&PageRequest::new("getPlayerState"));
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Not on video page"));
    assert!(!response.player_state().unwrap().is_valid_page);

    let response = probe.handle_request(&PageRequest::new("clickPlayPause"));
    assert!(!response.success);
    assert!(response.player_state().is_none());
}

#[test]
fn test_single_page_navigation_is_seen_immediately() {
    let mut probe = probe();
    probe.document_mut().navigate("https://www.youtube.com/");
    assert!(!probe.is_video_page());
    probe.document_mut().history_back();
    assert!(probe.is_video_page());
}

// ─── Commands ───

#[test]
fn test_play_pause_reports_label_and_broadcasts() {
    let bus = NotificationBus::default();
    let mut rx = bus.subscribe();
    let mut probe = probe().with_notifications(bus);

    let response = probe.handle_request(&PageRequest::new("clickPlayPause"));
    assert!(response.success);
    assert_eq!(response.label(), Some("Play (k)"));
    assert!(probe.player_state().is_playing);

    assert_eq!(
        rx.try_recv().unwrap(),
        Notification::ButtonStateChanged {
            button: "play".to_string(),
            state: "Play (k)".to_string()
        }
    );
}

#[test]
fn test_shortcut_names_are_accepted_under_command() {
    let mut probe = probe();
    let response = probe.handle_request(&request(json!({"command": "toggle-mute"})));
    assert!(response.success);
    assert!(probe.player_state().is_muted);
}

#[rstest]
#[case(150.0, 100.0)]
#[case(-20.0, 0.0)]
#[case(42.0, 42.0)]
fn test_set_volume_clamps(#[case] input: f64, #[case] applied: f64) {
    let mut probe = probe();
    let response = probe.handle_request(&request(json!({"action": "setVolume", "volume": input})));
    assert!(response.success);
    assert_eq!(response.volume, Some(applied));
    assert_eq!(f64::from(probe.player_state().volume), applied);
}

#[rstest]
#[case(1.1, 1.0)]
#[case(1.4, 1.5)]
#[case(5.0, 2.0)]
#[case(0.1, 0.25)]
fn test_set_speed_snaps(#[case] input: f64, #[case] applied: f64) {
    let mut probe = probe();
    let response =
        probe.handle_request(&request(json!({"action": "setPlaybackSpeed", "speed": input})));
    assert_eq!(response.speed, Some(applied));
    assert_eq!(probe.player_state().playback_rate, applied);
}

#[test]
fn test_volume_and_speed_steps() {
    let mut probe = probe();
    probe.execute(CommandKind::SetVolume(50.0));
    probe.execute(CommandKind::VolumeUp);
    assert_eq!(probe.player_state().volume, 60);
    probe.execute(CommandKind::VolumeDown);
    probe.execute(CommandKind::VolumeDown);
    assert_eq!(probe.player_state().volume, 40);

    for _ in 0..10 {
        probe.execute(CommandKind::SpeedUp);
    }
    assert_eq!(probe.player_state().playback_rate, 2.0);
}

#[test]
fn test_seek_skip_and_restart_stay_in_bounds() {
    let mut probe = probe();
    probe.execute(CommandKind::Seek(500.0));
    assert_eq!(probe.player_state().current_time, 300.0);
    probe.execute(CommandKind::SkipBackward);
    assert_eq!(probe.player_state().current_time, 290.0);
    probe.execute(CommandKind::Skip(-1000.0));
    assert_eq!(probe.player_state().current_time, 0.0);
    probe.execute(CommandKind::SkipForward);
    probe.execute(CommandKind::Restart);
    assert_eq!(probe.player_state().current_time, 0.0);
}

#[test]
fn test_video_progress() {
    let mut probe = probe();
    probe.execute(CommandKind::Seek(75.0));
    let response = probe.handle_request(&PageRequest::new("getVideoProgress"));
    let progress = response.progress.unwrap();
    assert_eq!(progress.current_time, 75.0);
    assert_eq!(progress.progress, 25.0);
}

#[test]
fn test_disabled_next_is_not_clicked() {
    let mut probe = probe();
    probe.document_mut().set_disabled(".ytp-next-button", true);
    assert!(!probe.execute(CommandKind::Next).success);
    assert_eq!(probe.document().click_count(".ytp-next-button"), 0);
    assert!(probe.execute(CommandKind::Previous).success);
    assert_eq!(probe.document().click_count(".ytp-prev-button"), 1);
}

#[test]
fn test_theater_toggle() {
    let mut probe = probe();
    assert!(probe.execute(CommandKind::TheaterToggle).success);
    assert!(probe.document().is_theater());
}

// ─── Missing controls ───

#[rstest]
#[case(CommandKind::PlayPause)]
#[case(CommandKind::Mute)]
#[case(CommandKind::Next)]
#[case(CommandKind::Previous)]
#[case(CommandKind::TheaterToggle)]
#[case(CommandKind::SetVolume(30.0))]
#[case(CommandKind::SetSpeed(1.5))]
#[case(CommandKind::SkipForward)]
#[case(CommandKind::GetVideoProgress)]
fn test_command_without_control_fails(#[case] kind: CommandKind) {
    // A watch URL whose player never rendered: no controls, no media element.
    let mut probe = PageProbe::new(
        SimulatedPage::blank("https://www.youtube.com/watch?v=empty"),
        ProbeConfig::default(),
    );
    let response = probe.execute(kind);
    assert!(!response.success);
}

#[test]
fn test_unknown_action_fails_softly() {
    let mut probe = probe();
    let response = probe.handle_request(&PageRequest::new("launchRocket"));
    assert!(!response.success);
    assert!(response.error.unwrap().contains("launchRocket"));
}

// ─── Element cache ───

#[test]
fn test_rerender_rebuilds_cache_from_mutations() {
    let mut probe = probe();
    let before = probe.cached(Control::PlayButton).unwrap();

    let records = probe.document_mut().rerender_controls();
    assert!(probe.handle_mutations(&records));
    let after = probe.cached(Control::PlayButton).unwrap();
    assert_ne!(before, after);
    assert!(probe.execute(CommandKind::PlayPause).success);
}

#[test]
fn test_detached_element_is_requeried_on_use() {
    let mut probe = probe();
    // Re-render without delivering the mutation batch.
    probe.document_mut().rerender_controls();
    assert!(!probe.document().is_connected(probe.cached(Control::MuteButton).unwrap()));

    assert!(probe.execute(CommandKind::Mute).success);
    assert!(probe.player_state().is_muted);
}

#[test]
fn test_unrelated_mutations_keep_cache() {
    let mut probe = probe();
    let before = probe.cached(Control::PlayButton);
    assert!(!probe.handle_mutations(&[MutationRecord::default()]));
    assert_eq!(probe.cached(Control::PlayButton), before);
}
