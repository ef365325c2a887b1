//! Source picker and viewer commands.

use std::sync::Arc;

use tauri::{command, AppHandle, Manager, State};

use crate::app::windows::{viewport_of, OVERLAY_LABEL};
use crate::app::AppState;
use crate::capture::{CaptureSourceRegistry, SourceId};
use crate::config::app::capture_config;
use crate::config::APP_CONFIG;
use crate::error::{OptionExt, OverlayResult};
use crate::overlay::OverlaySurface;
use crate::viewer::{card_styles, CardState, CardStyle, PickerState, ViewerContext, ViewerSession, ViewerStatus};

/// Enumerate capturable windows and screens for the picker.
#[command]
pub async fn list_sources(state: State<'_, AppState>) -> OverlayResult<PickerState> {
    let registry = CaptureSourceRegistry::new(state.backend(), capture_config());
    let picker = PickerState::from_listing(registry.list_sources().await);
    log::debug!("[VIEWER] Picker state: {} sources", picker.sources().len());
    Ok(picker)
}

/// Card style for every card state.
#[command]
pub fn picker_styles() -> Vec<(CardState, CardStyle)> {
    card_styles()
}

/// Open the viewer on `source_id`, replacing any open viewer.
#[command]
pub async fn open_viewer(
    app: AppHandle,
    state: State<'_, AppState>,
    source_id: String,
    source_name: String,
) -> OverlayResult<ViewerStatus> {
    let source_id: SourceId = source_id.parse()?;
    let window = app
        .get_webview_window(OVERLAY_LABEL)
        .context("Overlay window not found")?;

    let context = ViewerContext {
        backend: state.backend(),
        frames: state.frames(),
        feed: state.feed(),
        viewport: viewport_of(&window)?,
        surface: Arc::new(window) as Arc<dyn OverlaySurface>,
        events: Arc::new(app.clone()),
        config: APP_CONFIG.read().clone(),
    };

    let mut slot = state.viewer().lock().await;
    if let Some(mut previous) = slot.take() {
        previous.unmount();
    }
    let mut viewer = ViewerSession::mount(context, source_id, source_name).await;
    let mut status = viewer.status();
    status.frame_port = state.frame_port();
    *slot = Some(viewer);
    Ok(status)
}

/// Close the viewer. Closing twice is harmless.
#[command]
pub async fn close_viewer(state: State<'_, AppState>) -> OverlayResult<()> {
    state.close_viewer().await;
    Ok(())
}

/// Current viewer state, or `None` when no viewer is open.
#[command]
pub async fn viewer_status(state: State<'_, AppState>) -> OverlayResult<Option<ViewerStatus>> {
    let mut slot = state.viewer().lock().await;
    Ok(slot.as_mut().map(|viewer| {
        let mut status = viewer.status();
        status.frame_port = state.frame_port();
        status
    }))
}
