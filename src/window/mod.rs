//! Overlay window input control.
//!
//! The overlay window is configured once at creation (frameless, always on
//! top, shadowless, fixed size, click-through) and afterwards only
//! click-through changes. While click-through is on, the web view no longer
//! receives pointer events, so a `PointerWatcher` forwards cursor moves as
//! `overlay://pointer-move` events instead.

mod pointer;

pub use pointer::{CursorSource, DesktopCursor, PointerPosition, PointerWatcher};

use std::sync::Arc;
use std::time::Duration;

use tauri::Emitter;

use crate::app::events::POINTER_MOVE;
use crate::config::WindowConfig;
use crate::error::OverlayResult;

/// Cursor polling interval while forwarding moves (~60 Hz).
const POINTER_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Builds a cursor source on the watcher thread.
pub type CursorFactory = Arc<dyn Fn() -> Box<dyn CursorSource> + Send + Sync>;

/// The window operations the controller needs.
pub trait OverlayWindow: Send + Sync + 'static {
    fn set_decorations(&self, decorations: bool) -> OverlayResult<()>;
    fn set_always_on_top(&self, always_on_top: bool) -> OverlayResult<()>;
    fn set_visible_on_all_workspaces(&self, visible: bool) -> OverlayResult<()>;
    fn set_shadow(&self, shadow: bool) -> OverlayResult<()>;
    fn set_resizable(&self, resizable: bool) -> OverlayResult<()>;
    fn set_ignore_cursor_events(&self, ignore: bool) -> OverlayResult<()>;
    /// Re-assert topmost above full-screen surfaces. No-op where the
    /// platform has no separate notion of it.
    fn pin_topmost(&self) -> OverlayResult<()> {
        Ok(())
    }
    fn show(&self) -> OverlayResult<()>;
    /// Top-left of the client area in physical screen pixels.
    fn inner_origin(&self) -> OverlayResult<(i32, i32)>;
    fn scale_factor(&self) -> OverlayResult<f64>;
    fn emit_pointer(&self, position: PointerPosition) -> OverlayResult<()>;
}

impl OverlayWindow for tauri::WebviewWindow {
    fn set_decorations(&self, decorations: bool) -> OverlayResult<()> {
        Ok(tauri::WebviewWindow::set_decorations(self, decorations)?)
    }

    fn set_always_on_top(&self, always_on_top: bool) -> OverlayResult<()> {
        Ok(tauri::WebviewWindow::set_always_on_top(self, always_on_top)?)
    }

    fn set_visible_on_all_workspaces(&self, visible: bool) -> OverlayResult<()> {
        Ok(tauri::WebviewWindow::set_visible_on_all_workspaces(self, visible)?)
    }

    fn set_shadow(&self, shadow: bool) -> OverlayResult<()> {
        Ok(tauri::WebviewWindow::set_shadow(self, shadow)?)
    }

    fn set_resizable(&self, resizable: bool) -> OverlayResult<()> {
        Ok(tauri::WebviewWindow::set_resizable(self, resizable)?)
    }

    fn set_ignore_cursor_events(&self, ignore: bool) -> OverlayResult<()> {
        Ok(tauri::WebviewWindow::set_ignore_cursor_events(self, ignore)?)
    }

    fn pin_topmost(&self) -> OverlayResult<()> {
        #[cfg(target_os = "windows")]
        {
            use windows::Win32::Foundation::HWND;
            use windows::Win32::UI::WindowsAndMessaging::{
                SetWindowPos, HWND_TOPMOST, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE,
            };

            let hwnd = self.hwnd()?;
            unsafe {
                let _ = SetWindowPos(
                    HWND(hwnd.0),
                    HWND_TOPMOST,
                    0,
                    0,
                    0,
                    0,
                    SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
                );
            }
        }
        Ok(())
    }

    fn show(&self) -> OverlayResult<()> {
        Ok(tauri::WebviewWindow::show(self)?)
    }

    fn inner_origin(&self) -> OverlayResult<(i32, i32)> {
        let position = self.inner_position()?;
        Ok((position.x, position.y))
    }

    fn scale_factor(&self) -> OverlayResult<f64> {
        Ok(tauri::WebviewWindow::scale_factor(self)?)
    }

    fn emit_pointer(&self, position: PointerPosition) -> OverlayResult<()> {
        self.emit(POINTER_MOVE, position)?;
        Ok(())
    }
}

/// Owns the overlay window's input configuration.
pub struct WindowInputController {
    window: Arc<dyn OverlayWindow>,
    config: WindowConfig,
    click_through: bool,
    cursor: CursorFactory,
    watcher: Option<PointerWatcher>,
}

impl WindowInputController {
    pub fn new(window: Arc<dyn OverlayWindow>, config: WindowConfig) -> Self {
        Self::with_cursor(
            window,
            config,
            Arc::new(|| Box::new(DesktopCursor::new()) as Box<dyn CursorSource>),
        )
    }

    pub fn with_cursor(window: Arc<dyn OverlayWindow>, config: WindowConfig, cursor: CursorFactory) -> Self {
        Self {
            window,
            config,
            click_through: false,
            cursor,
            watcher: None,
        }
    }

    /// Apply every configured window flag, then show the window.
    pub fn apply(&mut self) -> OverlayResult<()> {
        let config = self.config.clone();
        self.window.set_decorations(!config.frameless)?;
        self.window.set_shadow(!config.no_shadow)?;
        self.window.set_resizable(!config.not_resizable)?;
        self.window.set_always_on_top(config.always_on_top)?;
        if config.always_on_top {
            // Full-screen apps live on their own space on macOS.
            self.window.set_visible_on_all_workspaces(true)?;
            self.window.pin_topmost()?;
        }
        self.set_click_through(config.click_through)?;
        self.window.show()?;

        log::info!(
            "[WINDOW] Overlay configured (on top: {}, click-through: {})",
            config.always_on_top,
            config.click_through
        );
        Ok(())
    }

    /// Let pointer input fall through to whatever is beneath the overlay.
    pub fn set_click_through(&mut self, enabled: bool) -> OverlayResult<()> {
        self.window.set_ignore_cursor_events(enabled)?;
        self.click_through = enabled;

        if enabled && self.config.forward_pointer_moves {
            if self.watcher.is_none() {
                self.watcher = Some(PointerWatcher::spawn(
                    Arc::clone(&self.window),
                    POINTER_POLL_INTERVAL,
                    Arc::clone(&self.cursor),
                ));
            }
        } else if let Some(mut watcher) = self.watcher.take() {
            watcher.stop();
        }

        log::debug!("[WINDOW] Click-through {}", if enabled { "on" } else { "off" });
        Ok(())
    }

    /// Flip click-through and return the new state.
    pub fn toggle_click_through(&mut self) -> OverlayResult<bool> {
        let enabled = !self.click_through;
        self.set_click_through(enabled)?;
        Ok(enabled)
    }

    pub fn click_through(&self) -> bool {
        self.click_through
    }

    /// True while pointer moves are being forwarded.
    #[cfg(test)]
    pub fn is_forwarding(&self) -> bool {
        self.watcher.as_ref().map_or(false, |w| w.is_running())
    }
}

impl Drop for WindowInputController {
    fn drop(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            watcher.stop();
        }
    }
}

#[cfg(test)]
mod tests;
