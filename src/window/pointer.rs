//! Pointer move forwarding while the overlay ignores cursor events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use device_query::{DeviceQuery, DeviceState};
use serde::Serialize;
use ts_rs::TS;

use super::{CursorFactory, OverlayWindow};

/// Cursor position relative to the overlay's client area, in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub struct PointerPosition {
    pub x: f64,
    pub y: f64,
}

impl PointerPosition {
    /// Convert a physical screen position into window-relative logical pixels.
    pub fn relative_to(screen: (i32, i32), origin: (i32, i32), scale_factor: f64) -> Self {
        let scale = if scale_factor > 0.0 { scale_factor } else { 1.0 };
        Self {
            x: f64::from(screen.0 - origin.0) / scale,
            y: f64::from(screen.1 - origin.1) / scale,
        }
    }
}

/// Global cursor position in physical screen pixels.
pub trait CursorSource {
    fn position(&mut self) -> (i32, i32);
}

/// `device_query` cursor. Created on the watcher thread.
pub struct DesktopCursor {
    device_state: DeviceState,
}

impl DesktopCursor {
    pub fn new() -> Self {
        Self {
            device_state: DeviceState::new(),
        }
    }
}

impl Default for DesktopCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl CursorSource for DesktopCursor {
    fn position(&mut self) -> (i32, i32) {
        self.device_state.get_mouse().coords
    }
}

/// Background thread that polls the cursor and emits moves.
pub struct PointerWatcher {
    stop_tx: Option<Sender<()>>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl PointerWatcher {
    pub fn spawn(window: Arc<dyn OverlayWindow>, interval: Duration, cursor: CursorFactory) -> Self {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let running = Arc::new(AtomicBool::new(true));
        let running_flag = Arc::clone(&running);

        let thread = std::thread::Builder::new()
            .name("overlay-pointer".to_string())
            .spawn(move || {
                let mut source = cursor();
                let mut last: Option<(i32, i32)> = None;

                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {},
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }

                    let screen = source.position();
                    if last == Some(screen) {
                        continue;
                    }
                    last = Some(screen);

                    let origin = match window.inner_origin() {
                        Ok(origin) => origin,
                        Err(e) => {
                            log::debug!("[WINDOW] Pointer watcher lost the window: {}", e);
                            continue;
                        },
                    };
                    let scale = window.scale_factor().unwrap_or(1.0);
                    let position = PointerPosition::relative_to(screen, origin, scale);
                    if let Err(e) = window.emit_pointer(position) {
                        log::debug!("[WINDOW] Failed to emit pointer move: {}", e);
                    }
                }
                running_flag.store(false, Ordering::SeqCst);
            });

        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("[WINDOW] Failed to start pointer watcher: {}", e);
                running.store(false, Ordering::SeqCst);
                None
            },
        };

        Self {
            stop_tx: Some(stop_tx),
            running,
            thread,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop polling and wait for the thread. Idempotent.
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.try_send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for PointerWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
