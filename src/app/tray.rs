//! System tray setup and event handling.

use parking_lot::Mutex;
use tauri::{
    image::Image,
    menu::{CheckMenuItem, Menu, MenuItem, PredefinedMenuItem},
    tray::TrayIconBuilder,
    App, AppHandle, Emitter, Manager,
};

use super::events::NAVIGATE;
use super::state::AppState;
use super::windows::{show_composer, OVERLAY_LABEL};
use crate::navigation::Route;

/// Holds references to tray menu items for dynamic updates.
pub struct TrayState {
    pub click_through: CheckMenuItem<tauri::Wry>,
}

impl TrayState {
    /// Reflect the current click-through state in the tray menu.
    pub fn set_click_through_checked(&self, checked: bool) -> Result<(), tauri::Error> {
        self.click_through.set_checked(checked)
    }
}

/// Set up the system tray with menu and event handlers.
///
/// Returns a `TrayState` that should be managed by the app for dynamic updates.
pub fn setup_system_tray(app: &App, click_through: bool) -> Result<TrayState, Box<dyn std::error::Error>> {
    let pick_source = MenuItem::with_id(app, "pick_source", "Pick Source...", true, None::<&str>)?;
    let post_comment = MenuItem::with_id(app, "post_comment", "Post Comment...", true, None::<&str>)?;
    let click_through_item = CheckMenuItem::with_id(
        app,
        "click_through",
        "Click-Through",
        true,
        click_through,
        None::<&str>,
    )?;
    let quit = MenuItem::with_id(app, "quit", "Quit Comment Overlay", true, None::<&str>)?;
    let separator = PredefinedMenuItem::separator(app)?;

    let menu = Menu::with_items(
        app,
        &[
            &pick_source,
            &post_comment,
            &separator,
            &click_through_item,
            &separator,
            &quit,
        ],
    )?;

    // Load custom tray icon (32x32 is standard for system tray)
    let tray_icon = Image::from_bytes(include_bytes!("../../icons/32x32.png"))?;

    let _tray = TrayIconBuilder::new()
        .icon(tray_icon)
        .menu(&menu)
        .show_menu_on_left_click(true)
        .on_menu_event(move |app, event| match event.id.as_ref() {
            "quit" => app.exit(0),
            "pick_source" => {
                let app_handle = app.clone();
                tauri::async_runtime::spawn(async move {
                    return_to_picker(&app_handle).await;
                });
            },
            "post_comment" => {
                if let Err(e) = show_composer(app) {
                    log::error!("[TRAY] Failed to open composer: {}", e);
                }
            },
            "click_through" => {
                if let Err(e) = super::toggle_click_through(app) {
                    log::error!("[TRAY] Failed to toggle click-through: {}", e);
                }
            },
            _ => {},
        })
        .build(app)?;

    Ok(TrayState {
        click_through: click_through_item,
    })
}

/// Close the viewer and send the overlay back to the source picker.
async fn return_to_picker(app: &AppHandle) {
    app.state::<AppState>().close_viewer().await;
    if let Some(window) = app.get_webview_window(OVERLAY_LABEL) {
        let _ = window.show();
        let _ = window.set_focus();
        if let Err(e) = window.emit(NAVIGATE, Route::SourcePicker.to_url()) {
            log::warn!("[TRAY] Failed to navigate to picker: {}", e);
        }
    }
}

/// Initialize the system tray and register it with the app state.
///
/// This is called from the app setup hook.
pub fn init(app: &App, click_through: bool) -> Result<(), Box<dyn std::error::Error>> {
    let tray_state = setup_system_tray(app, click_through)?;
    app.manage(Mutex::new(tray_state));
    Ok(())
}
