//! Global shortcut that toggles click-through.

use tauri::AppHandle;
use tauri_plugin_global_shortcut::{GlobalShortcutExt, ShortcutState};

use crate::error::{OverlayError, OverlayResult};

/// Register `accelerator` (e.g. `CommandOrControl+Shift+O`).
pub fn register_click_through(app: &AppHandle, accelerator: &str) -> OverlayResult<()> {
    app.global_shortcut()
        .on_shortcut(accelerator, |app, _shortcut, event| {
            if event.state == ShortcutState::Pressed {
                if let Err(e) = super::toggle_click_through(app) {
                    log::error!("[SHORTCUT] Failed to toggle click-through: {}", e);
                }
            }
        })
        .map_err(|e| OverlayError::ConfigError(format!("Failed to register {}: {}", accelerator, e)))?;

    log::info!("[SHORTCUT] Click-through toggle on {}", accelerator);
    Ok(())
}

/// Swap the registered accelerator after a settings change.
pub fn update_click_through(app: &AppHandle, previous: &str, accelerator: &str) -> OverlayResult<()> {
    if previous == accelerator {
        return Ok(());
    }
    if let Err(e) = app.global_shortcut().unregister(previous) {
        log::warn!("[SHORTCUT] Failed to unregister {}: {}", previous, e);
    }
    register_click_through(app, accelerator)
}
