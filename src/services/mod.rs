// YouTube Controller services
// Services provide core functionality: detection, messaging, the page probe, storage, settings, timers.

pub mod command_relay;
pub mod notification_bus;
pub mod page_probe;
pub mod scheduler;
pub mod settings_engine;
pub mod storage;
pub mod tab_detection;
pub mod url_pattern;
