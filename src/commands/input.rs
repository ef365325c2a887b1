//! Overlay input commands.

use tauri::{command, AppHandle};

use crate::error::OverlayResult;

/// Turn click-through on or off. Returns the new state.
#[command]
pub fn set_click_through(app: AppHandle, enabled: bool) -> OverlayResult<bool> {
    crate::app::apply_click_through(&app, enabled)
}
