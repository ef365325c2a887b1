//! Overlay frame pump.
//!
//! Renders the store at a fixed rate while comments are live. Once the store
//! is empty the driver presents one empty frame, then sleeps until the store
//! changes again.

use std::sync::Arc;
use std::time::Duration;

use tauri::Emitter;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::compositor::{OverlayCompositor, OverlayFrame, Viewport};
use crate::app::events::OVERLAY_FRAME;
use crate::comments::CommentStore;
use crate::error::OverlayResult;

/// Where rendered frames go.
pub trait OverlaySurface: Send + Sync + 'static {
    fn present(&self, frame: &OverlayFrame) -> OverlayResult<()>;
}

impl OverlaySurface for tauri::WebviewWindow {
    fn present(&self, frame: &OverlayFrame) -> OverlayResult<()> {
        self.emit(OVERLAY_FRAME, frame)?;
        Ok(())
    }
}

/// Handle to a running frame pump.
pub struct OverlayDriver {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    viewport: watch::Sender<Viewport>,
}

impl OverlayDriver {
    /// Start pumping frames on the current runtime.
    pub fn spawn(
        store: Arc<CommentStore>,
        mut compositor: OverlayCompositor,
        surface: Arc<dyn OverlaySurface>,
        frame_rate: u32,
    ) -> Self {
        let cancel = CancellationToken::new();
        let (viewport, mut viewports) = watch::channel(compositor.viewport());
        let period = Duration::from_micros(1_000_000 / u64::from(frame_rate.max(1)));
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut revisions = store.subscribe();
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut idle = true;

            log::debug!("[OVERLAY] Driver started at {} fps", frame_rate);
            loop {
                if idle {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        changed = revisions.changed() => {
                            if changed.is_err() {
                                break;
                            }
                            ticker.reset_immediately();
                        },
                    }
                }
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {},
                }
                revisions.borrow_and_update();
                if viewports.has_changed().unwrap_or(false) {
                    compositor.set_viewport(*viewports.borrow_and_update());
                }

                let comments = store.list();
                let frame = compositor.render(&comments, Instant::now());
                if let Err(e) = surface.present(&frame) {
                    log::warn!("[OVERLAY] Failed to present frame: {}", e);
                }
                idle = frame.is_empty();
            }
            log::debug!("[OVERLAY] Driver stopped");
        });

        Self {
            cancel,
            task: Some(task),
            viewport,
        }
    }

    /// Lay out later frames for a resized window.
    pub fn set_viewport(&self, viewport: Viewport) {
        self.viewport.send_if_modified(|current| {
            let changed = *current != viewport;
            *current = viewport;
            changed
        });
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && self.task.as_ref().map_or(false, |t| !t.is_finished())
    }

    /// Stop presenting frames. Idempotent.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        self.task.take();
    }
}

impl Drop for OverlayDriver {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
