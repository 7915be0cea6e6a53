//! Method handler for the background coordinator's JSON surface.
//!
//! The `handle_method` function dispatches named calls to the
//! `BackgroundCoordinator`; `handle_message` is the raw runtime-message
//! entry point used by pages and popups (`{type: "GET_ACTIVE_TAB"}` etc.).

use serde_json::{json, Value};

use crate::app::BackgroundCoordinator;
use crate::managers::shortcut_manager::{describe, ShortcutManagerTrait};
use crate::types::message::{RuntimeMessage, RuntimeResponse};

/// Decode one runtime message and answer it. Undecodable input yields a
/// `{success: false, error}` record rather than an error.
pub async fn handle_message(coordinator: &BackgroundCoordinator, message: &Value) -> Value {
    let response = match serde_json::from_value::<RuntimeMessage>(message.clone()) {
        Ok(message) => coordinator.handle_message(message).await,
        Err(e) => {
            tracing::debug!(error = %e, "undecodable runtime message");
            RuntimeResponse::failure(format!("Invalid message: {}", e))
        }
    };
    serde_json::to_value(&response)
        .unwrap_or_else(|e| json!({"success": false, "error": e.to_string()}))
}

/// Dispatch a method call to the background coordinator.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub async fn handle_method(
    coordinator: &BackgroundCoordinator,
    method: &str,
    params: &Value,
) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Runtime messages ───
        "runtime.message" => Ok(handle_message(coordinator, params).await),

        // ─── Tabs ───
        "tab.current" => {
            let tracked = coordinator.registry().current();
            serde_json::to_value(&tracked).map_err(|e| e.to_string())
        }
        "tab.refresh" => {
            let tracked = coordinator
                .registry()
                .refresh()
                .await
                .map_err(|e| e.to_string())?;
            serde_json::to_value(&tracked).map_err(|e| e.to_string())
        }
        "tab.inject_all" => {
            let injected = coordinator.on_installed().await;
            Ok(json!({"injected": injected}))
        }

        // ─── Shortcuts ───
        "shortcut.run" => {
            let command = params
                .get("command")
                .and_then(|v| v.as_str())
                .ok_or("missing command")?;
            let response = coordinator.handle_shortcut(command).await;
            serde_json::to_value(&response).map_err(|e| e.to_string())
        }
        "shortcut.keys" => {
            let keys = params
                .get("keys")
                .and_then(|v| v.as_str())
                .ok_or("missing keys")?;
            let response = coordinator.handle_key_combo(keys).await;
            serde_json::to_value(&response).map_err(|e| e.to_string())
        }
        "shortcut.list" => {
            let shortcuts = coordinator.shortcuts();
            let mut items: Vec<Value> = shortcuts
                .list_shortcuts()
                .iter()
                .map(|(command, keys)| {
                    json!({"command": command, "keys": keys, "description": describe(command)})
                })
                .collect();
            items.sort_by(|a, b| a["command"].as_str().cmp(&b["command"].as_str()));
            Ok(json!({"items": items}))
        }
        "shortcut.register" => {
            let command = params
                .get("command")
                .and_then(|v| v.as_str())
                .ok_or("missing command")?;
            let keys = params
                .get("keys")
                .and_then(|v| v.as_str())
                .ok_or("missing keys")?;
            coordinator
                .shortcuts()
                .register_shortcut(command, keys)
                .map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "shortcut.reset" => {
            coordinator.shortcuts().reset_to_defaults();
            Ok(json!({"ok": true}))
        }

        // ─── Auto-pause ───
        "autopause.get" => Ok(json!({"enabled": coordinator.auto_pause_enabled()})),

        _ => Err(format!("unknown method: {}", method)),
    }
}
