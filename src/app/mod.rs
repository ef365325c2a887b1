//! Application lifecycle and platform integration.
//!
//! - `events`: event names and window event handlers
//! - `state`: managed app state (feed, capture backend, viewer slot)
//! - `tray`: system tray setup and menu handling
//! - `shortcut`: global click-through shortcut
//! - `windows`: overlay and composer windows

pub mod events;
pub mod state;
pub mod windows;

#[cfg(desktop)]
pub mod shortcut;
#[cfg(desktop)]
pub mod tray;

pub use state::AppState;

use tauri::{AppHandle, Emitter, Manager};

use crate::config::app::set_click_through_flag;
use crate::error::{OverlayError, OverlayResult};

/// Set click-through on the overlay and sync the tray and the web view.
pub fn apply_click_through(app: &AppHandle, enabled: bool) -> OverlayResult<bool> {
    let state = app.state::<AppState>();
    {
        let mut input = state.input().lock();
        let controller = input
            .as_mut()
            .ok_or_else(|| OverlayError::WindowError("Overlay window is not ready".to_string()))?;
        controller.set_click_through(enabled)?;
    }
    set_click_through_flag(enabled);

    #[cfg(desktop)]
    if let Some(tray) = app.try_state::<parking_lot::Mutex<tray::TrayState>>() {
        let _ = tray.lock().set_click_through_checked(enabled);
    }
    let _ = app.emit(events::CLICK_THROUGH_CHANGED, enabled);

    log::info!("[APP] Click-through {}", if enabled { "enabled" } else { "disabled" });
    Ok(enabled)
}

/// Flip click-through. Used by the tray and the global shortcut, since a
/// click-through window cannot be clicked to turn it off.
pub fn toggle_click_through(app: &AppHandle) -> OverlayResult<bool> {
    let current = app
        .state::<AppState>()
        .input()
        .lock()
        .as_ref()
        .map_or(false, |controller| controller.click_through());
    apply_click_through(app, !current)
}
