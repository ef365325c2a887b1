//! Event names shared with the web view, and window event handling.

use tauri::{Manager, PhysicalSize, Window, WindowEvent};

use super::state::AppState;
use super::windows::OVERLAY_LABEL;
use crate::overlay::Viewport;

/// Rendered overlay frame (`OverlayFrame`), to the overlay window.
pub const OVERLAY_FRAME: &str = "overlay://frame";

/// Cursor position while click-through is on (`PointerPosition`).
pub const POINTER_MOVE: &str = "overlay://pointer-move";

/// Viewer capture state (`CaptureStatus`).
pub const CAPTURE_STATUS: &str = "viewer://capture-status";

/// Viewer feed connection state (`FeedStatus`).
pub const FEED_STATUS: &str = "viewer://feed-status";

/// Route URL the web view should navigate to.
pub const NAVIGATE: &str = "navigate";

/// Click-through state after a toggle from the tray or shortcut.
pub const CLICK_THROUGH_CHANGED: &str = "overlay://click-through";

/// Handle window events for the application.
///
/// This is called from the Tauri builder's `on_window_event` hook.
pub fn handle_window_event(window: &Window, event: &WindowEvent) {
    match event {
        WindowEvent::Resized(size) => {
            // Fix Windows resize lag by adding small delay
            // See: https://github.com/tauri-apps/tauri/issues/6322#issuecomment-2495685888
            #[cfg(target_os = "windows")]
            std::thread::sleep(std::time::Duration::from_millis(1));

            if window.label() == OVERLAY_LABEL {
                resize_viewer(window, *size);
            }
        },

        // Closing the overlay ends the viewer before the window goes away.
        WindowEvent::CloseRequested { .. } if window.label() == OVERLAY_LABEL => {
            let app = window.app_handle().clone();
            tauri::async_runtime::spawn(async move {
                let state = app.state::<AppState>();
                state.close_viewer().await;
            });
        },

        _ => {},
    }
}

/// Hand the overlay's new logical size to the open viewer.
fn resize_viewer(window: &Window, size: PhysicalSize<u32>) {
    let scale = window.scale_factor().unwrap_or(1.0);
    let logical = size.to_logical::<f32>(scale);
    let viewport = Viewport {
        width: logical.width,
        height: logical.height,
    };
    let app = window.app_handle().clone();
    tauri::async_runtime::spawn(async move {
        let state = app.state::<AppState>();
        if let Some(viewer) = state.viewer().lock().await.as_ref() {
            viewer.resize(viewport);
        };
    });
}
