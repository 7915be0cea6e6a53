// YouTube Controller state managers
// Managers handle stateful operations: the tracked tab, popup connection sessions, shortcuts.

pub mod connection_session;
pub mod shortcut_manager;
pub mod tab_registry;
