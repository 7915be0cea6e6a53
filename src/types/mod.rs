// Shared type definitions
// Each submodule defines types used across the background, page and popup contexts.

pub mod command;
pub mod config;
pub mod errors;
pub mod message;
pub mod page;
pub mod player;
pub mod settings;
pub mod tab;
