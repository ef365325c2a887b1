//! Overlay and composer windows.

use tauri::{AppHandle, Manager, Url, WebviewUrl, WebviewWindow, WebviewWindowBuilder};

use crate::config::WindowConfig;
use crate::error::{OptionExt, OverlayResult};
use crate::navigation::Route;
use crate::overlay::Viewport;

/// Frameless window hosting the picker and the viewer.
pub const OVERLAY_LABEL: &str = "overlay";

/// Regular window for posting comments.
pub const COMPOSER_LABEL: &str = "composer";

/// Create the overlay window over the primary monitor. It starts hidden;
/// `WindowInputController::apply` shows it once configured.
pub fn create_overlay_window(app: &AppHandle, config: &WindowConfig) -> OverlayResult<WebviewWindow> {
    let monitor = match app.primary_monitor()? {
        Some(monitor) => monitor,
        None => app
            .available_monitors()?
            .into_iter()
            .next()
            .context("No monitors found")?,
    };

    let scale = monitor.scale_factor();
    let position = monitor.position().to_logical::<f64>(scale);
    let size = monitor.size().to_logical::<f64>(scale);

    log::info!(
        "[WINDOW] Creating overlay at ({}, {}) with size {}x{}",
        position.x,
        position.y,
        size.width,
        size.height
    );

    let window = WebviewWindowBuilder::new(app, OVERLAY_LABEL, WebviewUrl::App("index.html".into()))
        .title("Comment Overlay")
        .position(position.x, position.y)
        .inner_size(size.width, size.height)
        .transparent(config.transparent)
        .decorations(!config.frameless)
        .always_on_top(config.always_on_top)
        .resizable(!config.not_resizable)
        .maximizable(false)
        .shadow(!config.no_shadow)
        .skip_taskbar(false)
        .visible(false)
        .on_navigation(keep_navigation_in_app)
        .build()?;

    Ok(window)
}

/// Show the composer, creating it on first use.
pub fn show_composer(app: &AppHandle) -> OverlayResult<()> {
    if let Some(window) = app.get_webview_window(COMPOSER_LABEL) {
        window.show()?;
        window.set_focus()?;
        return Ok(());
    }

    let path = Route::CommentComposer.to_url();
    let url = WebviewUrl::App(path.trim_start_matches('/').into());
    WebviewWindowBuilder::new(app, COMPOSER_LABEL, url)
        .title("Post a comment")
        .inner_size(600.0, 200.0)
        .min_inner_size(360.0, 160.0)
        .resizable(true)
        .always_on_top(true)
        .center()
        .focused(true)
        .on_navigation(keep_navigation_in_app)
        .build()?;
    Ok(())
}

/// Logical size of a window's client area.
pub fn viewport_of(window: &WebviewWindow) -> OverlayResult<Viewport> {
    let scale = window.scale_factor()?;
    let size = window.inner_size()?.to_logical::<f32>(scale);
    Ok(Viewport {
        width: size.width,
        height: size.height,
    })
}

/// Allow in-app navigation. Anything else opens in the system browser.
fn keep_navigation_in_app(url: &Url) -> bool {
    if is_app_url(url) {
        log::debug!("[WINDOW] Navigating to {:?}", Route::from_url(url));
        return true;
    }
    log::info!("[WINDOW] Opening external link {}", url);
    if let Err(e) = tauri_plugin_opener::open_url(url.as_str(), None::<&str>) {
        log::warn!("[WINDOW] Failed to open {}: {}", url, e);
    }
    false
}

fn is_app_url(url: &Url) -> bool {
    match url.scheme() {
        "tauri" | "asset" | "about" | "data" => true,
        "http" | "https" => matches!(
            url.host_str(),
            Some("tauri.localhost" | "localhost" | "127.0.0.1")
        ),
        _ => false,
    }
}
