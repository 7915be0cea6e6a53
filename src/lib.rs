//! ytcontroller — remote control for YouTube tabs.
//!
//! Three cooperating contexts share this crate: the persistent background
//! coordinator ([`app`]), the page probe running inside each YouTube tab
//! ([`services::page_probe`]) and the short-lived popup session
//! ([`managers::connection_session`]). They talk only through the
//! browser-facing traits in [`platform::host`].
//!
//! This library crate exposes all modules for use by the binary and integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod services;
pub mod rpc_handler;
pub mod types;
