//! Shortcut Manager for the YouTube Controller.
//!
//! Maps keyboard combinations to the manifest's shortcut commands, with
//! conflict detection and platform-specific modifier key adaptation.

use std::collections::HashMap;

use crate::types::command::{CommandKind, SHORTCUT_COMMANDS};
use crate::types::errors::ShortcutError;

/// Trait defining shortcut management operations.
pub trait ShortcutManagerTrait {
    fn register_shortcut(&mut self, command: &str, keys: &str) -> Result<(), ShortcutError>;
    fn unregister_shortcut(&mut self, command: &str) -> Result<(), ShortcutError>;
    fn get_shortcut(&self, command: &str) -> Option<&str>;
    fn list_shortcuts(&self) -> &HashMap<String, String>;
    fn reset_to_defaults(&mut self);
    fn has_conflict(&self, keys: &str, exclude_command: Option<&str>) -> Option<String>;
    fn resolve(&self, keys: &str) -> Option<CommandKind>;
    fn get_default_shortcuts(&self) -> HashMap<String, String>;
}

/// Default bindings, one per manifest command.
const DEFAULT_BINDINGS: &[(&str, &str)] = &[
    ("play-pause", "Ctrl+Alt+P"),
    ("stop-video", "Ctrl+Alt+S"),
    ("restart-video", "Ctrl+Alt+R"),
    ("toggle-mute", "Ctrl+Alt+M"),
    ("volume-up", "Ctrl+Alt+Up"),
    ("volume-down", "Ctrl+Alt+Down"),
    ("theater-mode", "Ctrl+Alt+T"),
    ("speed-up", "Ctrl+Alt+Period"),
    ("speed-down", "Ctrl+Alt+Comma"),
    ("next-video", "Ctrl+Alt+Right"),
    ("previous-video", "Ctrl+Alt+Left"),
    ("skip-forward", "Ctrl+Alt+F"),
    ("skip-backward", "Ctrl+Alt+B"),
];

/// Human-readable description of a shortcut command.
pub fn describe(command: &str) -> Option<&'static str> {
    let text = match command {
        "play-pause" => "Toggle video playback",
        "stop-video" => "Stop video playback",
        "restart-video" => "Restart video from beginning",
        "toggle-mute" => "Toggle video mute",
        "volume-up" => "Increase volume by 10%",
        "volume-down" => "Decrease volume by 10%",
        "theater-mode" => "Toggle YouTube theater mode",
        "speed-up" => "Increase playback speed",
        "speed-down" => "Decrease playback speed",
        "next-video" => "Go to next video",
        "previous-video" => "Go to previous video",
        "skip-forward" => "Skip forward 10 seconds",
        "skip-backward" => "Skip backward 10 seconds",
        _ => return None,
    };
    Some(text)
}

/// Shortcut manager with in-memory bindings and platform adaptation.
pub struct ShortcutManager {
    shortcuts: HashMap<String, String>,
}

impl ShortcutManager {
    pub fn new() -> Self {
        let mut mgr = Self {
            shortcuts: HashMap::new(),
        };
        mgr.shortcuts = mgr.get_default_shortcuts();
        mgr
    }

    /// Adapts modifier keys for the current platform.
    fn adapt_for_platform(keys: &str) -> String {
        if cfg!(target_os = "macos") {
            keys.replace("Ctrl+", "Cmd+")
        } else {
            keys.to_string()
        }
    }
}

impl Default for ShortcutManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ShortcutManagerTrait for ShortcutManager {
    fn register_shortcut(&mut self, command: &str, keys: &str) -> Result<(), ShortcutError> {
        if !SHORTCUT_COMMANDS.contains(&command) {
            return Err(ShortcutError::NotFound(command.to_string()));
        }
        if keys.is_empty() {
            return Err(ShortcutError::InvalidKeys("Keys cannot be empty".to_string()));
        }

        if let Some(conflicting) = self.has_conflict(keys, Some(command)) {
            return Err(ShortcutError::Conflict(format!(
                "'{}' is already bound to '{}'",
                keys, conflicting
            )));
        }

        self.shortcuts
            .insert(command.to_string(), Self::adapt_for_platform(keys));
        Ok(())
    }

    fn unregister_shortcut(&mut self, command: &str) -> Result<(), ShortcutError> {
        self.shortcuts
            .remove(command)
            .map(|_| ())
            .ok_or_else(|| ShortcutError::NotFound(command.to_string()))
    }

    fn get_shortcut(&self, command: &str) -> Option<&str> {
        self.shortcuts.get(command).map(|s| s.as_str())
    }

    fn list_shortcuts(&self) -> &HashMap<String, String> {
        &self.shortcuts
    }

    fn reset_to_defaults(&mut self) {
        self.shortcuts = self.get_default_shortcuts();
    }

    fn has_conflict(&self, keys: &str, exclude_command: Option<&str>) -> Option<String> {
        let adapted = Self::adapt_for_platform(keys);
        self.shortcuts
            .iter()
            .find(|(command, bound)| **bound == adapted && Some(command.as_str()) != exclude_command)
            .map(|(command, _)| command.clone())
    }

    /// The command bound to `keys`, if any.
    fn resolve(&self, keys: &str) -> Option<CommandKind> {
        let adapted = Self::adapt_for_platform(keys);
        self.shortcuts
            .iter()
            .find(|(_, bound)| **bound == adapted)
            .and_then(|(command, _)| CommandKind::from_shortcut(command))
    }

    fn get_default_shortcuts(&self) -> HashMap<String, String> {
        DEFAULT_BINDINGS
            .iter()
            .map(|(c, k)| (c.to_string(), Self::adapt_for_platform(k)))
            .collect()
    }
}
