//! Unit tests for the ShortcutManager: default bindings, conflicts and
//! resolution of key combinations to playback commands.

use rstest::rstest;

use ytcontroller::managers::shortcut_manager::{describe, ShortcutManager, ShortcutManagerTrait};
use ytcontroller::types::command::{CommandKind, SHORTCUT_COMMANDS};
use ytcontroller::types::errors::ShortcutError;

fn platform(keys: &str) -> String {
    if cfg!(target_os = "macos") {
        keys.replace("Ctrl+", "Cmd+")
    } else {
        keys.to_string()
    }
}

#[rstest]
#[case("Ctrl+Alt+P", CommandKind::PlayPause)]
#[case("Ctrl+Alt+M", CommandKind::Mute)]
#[case("Ctrl+Alt+Up", CommandKind::VolumeUp)]
#[case("Ctrl+Alt+Down", CommandKind::VolumeDown)]
#[case("Ctrl+Alt+Right", CommandKind::Next)]
#[case("Ctrl+Alt+Left", CommandKind::Previous)]
#[case("Ctrl+Alt+F", CommandKind::SkipForward)]
#[case("Ctrl+Alt+B", CommandKind::SkipBackward)]
#[case("Ctrl+Alt+R", CommandKind::Restart)]
#[case("Ctrl+Alt+T", CommandKind::TheaterToggle)]
fn test_default_binding_resolves(#[case] keys: &str, #[case] expected: CommandKind) {
    let mgr = ShortcutManager::new();
    assert_eq!(mgr.resolve(keys), Some(expected));
}

#[test]
fn test_every_manifest_command_is_bound() {
    let mgr = ShortcutManager::new();
    for command in SHORTCUT_COMMANDS {
        assert!(mgr.get_shortcut(command).is_some(), "{} has no binding", command);
        assert!(describe(command).is_some(), "{} has no description", command);
    }
}

#[test]
fn test_register_rejects_conflict() {
    let mut mgr = ShortcutManager::new();
    let err = mgr.register_shortcut("toggle-mute", "Ctrl+Alt+P").unwrap_err();
    assert!(matches!(err, ShortcutError::Conflict(_)));
    assert_eq!(mgr.get_shortcut("toggle-mute"), Some(platform("Ctrl+Alt+M").as_str()));
}

#[test]
fn test_rebinding_same_command_is_not_a_conflict() {
    let mut mgr = ShortcutManager::new();
    mgr.register_shortcut("play-pause", "Ctrl+Alt+P").unwrap();
    mgr.register_shortcut("play-pause", "Ctrl+Shift+K").unwrap();
    assert_eq!(mgr.resolve("Ctrl+Shift+K"), Some(CommandKind::PlayPause));
    assert_eq!(mgr.resolve("Ctrl+Alt+P"), None);
}

#[test]
fn test_register_rejects_unknown_command_and_empty_keys() {
    let mut mgr = ShortcutManager::new();
    assert!(matches!(
        mgr.register_shortcut("launch-rocket", "Ctrl+Alt+L"),
        Err(ShortcutError::NotFound(_))
    ));
    assert!(matches!(
        mgr.register_shortcut("play-pause", ""),
        Err(ShortcutError::InvalidKeys(_))
    ));
}

#[test]
fn test_unregister_then_reset() {
    let mut mgr = ShortcutManager::new();
    mgr.unregister_shortcut("speed-up").unwrap();
    assert!(mgr.get_shortcut("speed-up").is_none());
    assert!(matches!(
        mgr.unregister_shortcut("speed-up"),
        Err(ShortcutError::NotFound(_))
    ));

    mgr.reset_to_defaults();
    assert_eq!(mgr.list_shortcuts().len(), SHORTCUT_COMMANDS.len());
    assert_eq!(mgr.resolve("Ctrl+Alt+Period"), Some(CommandKind::SpeedUp));
}

#[test]
fn test_has_conflict_names_the_holder() {
    let mgr = ShortcutManager::new();
    assert_eq!(mgr.has_conflict("Ctrl+Alt+S", None).as_deref(), Some("stop-video"));
    assert_eq!(mgr.has_conflict("Ctrl+Alt+S", Some("stop-video")), None);
    assert_eq!(mgr.has_conflict("Ctrl+Alt+Z", None), None);
}
