//! Viewer session.
//!
//! One `ViewerSession` exists per open viewer. It owns the capture session,
//! the feed subscription, the comment store and the overlay driver, and
//! tears all of them down together when the viewer goes away.

pub mod picker;


pub use picker::{card_styles, CardState, CardStyle, PickerState};

use std::sync::{Arc, Weak};

use serde::Serialize;
use tauri::{AppHandle, Emitter};
use tokio::task::JoinHandle;
use ts_rs::TS;

use crate::app::events::{CAPTURE_STATUS, FEED_STATUS};
use crate::capture::{CaptureBackend, CaptureSession, SessionStatus, SourceId};
use crate::comments::{CommentStore, StoreConfig, StoreError};
use crate::config::AppConfig;
use crate::feed::{CommentFeedClient, FeedError, FeedEvent, FeedStatus, Subscription};
use crate::overlay::{OverlayCompositor, OverlayDriver, OverlaySurface, Viewport};
use crate::preview::FrameSender;

/// Capture state as the viewer web view sees it.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(tag = "state", rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub enum CaptureStatus {
    Starting,
    Active {
        #[serde(rename = "sourceId")]
        source_id: String,
        #[serde(rename = "sourceName")]
        source_name: String,
    },
    /// Recoverable: the viewer offers a way back to the picker.
    Failed { message: String },
    Stopped,
}

/// Where the viewer reports capture and feed state changes.
pub trait ViewerEvents: Send + Sync + 'static {
    fn capture_status(&self, status: &CaptureStatus);
    fn feed_status(&self, status: &FeedStatus);
}

impl ViewerEvents for AppHandle {
    fn capture_status(&self, status: &CaptureStatus) {
        if let Err(e) = self.emit(CAPTURE_STATUS, status) {
            log::warn!("[VIEWER] Failed to emit capture status: {}", e);
        }
    }

    fn feed_status(&self, status: &FeedStatus) {
        if let Err(e) = self.emit(FEED_STATUS, status) {
            log::warn!("[VIEWER] Failed to emit feed status: {}", e);
        }
    }
}

/// Everything a viewer needs from the rest of the app.
#[derive(Clone)]
pub struct ViewerContext {
    pub backend: Arc<dyn CaptureBackend>,
    pub frames: FrameSender,
    pub feed: Arc<CommentFeedClient>,
    pub surface: Arc<dyn OverlaySurface>,
    pub events: Arc<dyn ViewerEvents>,
    pub config: AppConfig,
    pub viewport: Viewport,
}

/// Snapshot returned by `viewer_status`.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub struct ViewerStatus {
    pub source_id: String,
    pub source_name: String,
    pub capture: CaptureStatus,
    pub feed: FeedStatus,
    pub live_comments: u32,
    /// Port of the local frame WebSocket, when one is running.
    pub frame_port: Option<u16>,
}

pub struct ViewerSession {
    source_id: SourceId,
    source_name: String,
    capture: CaptureSession,
    capture_status: CaptureStatus,
    store: Arc<CommentStore>,
    driver: OverlayDriver,
    subscription: Option<Subscription>,
    feed_forwarder: Option<JoinHandle<()>>,
    events: Arc<dyn ViewerEvents>,
    unmounted: bool,
}

impl ViewerSession {
    /// Start capturing `source_id` and stream comments over it.
    ///
    /// Capture or feed failures do not fail the mount: they are reported as
    /// status events and the viewer stays up so the user can go back.
    pub async fn mount(context: ViewerContext, source_id: SourceId, source_name: String) -> Self {
        let ViewerContext {
            backend,
            frames,
            feed,
            surface,
            events,
            config,
            viewport,
        } = context;

        log::info!("[VIEWER] Mounting viewer for {} ({})", source_id, source_name);

        let store = Arc::new(CommentStore::new(StoreConfig::from(&config.overlay)));
        let compositor = OverlayCompositor::new(&config.overlay, viewport);
        let driver = OverlayDriver::spawn(Arc::clone(&store), compositor, surface, config.overlay.frame_rate);

        let mut capture = CaptureSession::new(backend, config.capture.clone(), frames);
        events.capture_status(&CaptureStatus::Starting);
        let capture_status = match capture.start(source_id.clone()).await {
            Ok(()) => CaptureStatus::Active {
                source_id: source_id.to_string(),
                source_name: source_name.clone(),
            },
            Err(e) => {
                log::warn!("[VIEWER] Capture failed to start: {}", e);
                CaptureStatus::Failed { message: e.to_string() }
            },
        };
        events.capture_status(&capture_status);

        let (subscription, feed_forwarder) = subscribe_store(&feed, Arc::downgrade(&store), &events).await;

        Self {
            source_id,
            source_name,
            capture,
            capture_status,
            store,
            driver,
            subscription,
            feed_forwarder,
            events,
            unmounted: false,
        }
    }

    #[cfg(test)]
    pub fn source_id(&self) -> &SourceId {
        &self.source_id
    }

    #[cfg(test)]
    pub fn store(&self) -> &Arc<CommentStore> {
        &self.store
    }

    #[cfg(test)]
    pub fn capture(&self) -> &CaptureSession {
        &self.capture
    }

    #[cfg(test)]
    pub fn is_mounted(&self) -> bool {
        !self.unmounted
    }

    /// Follow a resize of the overlay window.
    pub fn resize(&self, viewport: Viewport) {
        if !self.unmounted {
            log::debug!("[VIEWER] Viewport {}x{}", viewport.width, viewport.height);
            self.driver.set_viewport(viewport);
        }
    }

    /// Re-check the capture source and report the current state.
    ///
    /// A source that disappeared since the last check turns into `Failed`
    /// here, and the change is emitted once.
    pub fn status(&mut self) -> ViewerStatus {
        if !self.unmounted && self.capture.status() == SessionStatus::Active {
            if let Err(e) = self.capture.ensure_live() {
                log::warn!("[VIEWER] Capture lost: {}", e);
                self.set_capture_status(CaptureStatus::Failed { message: e.to_string() });
            }
        }

        let feed = match &self.subscription {
            Some(subscription) => subscription.status().borrow().clone(),
            None => FeedStatus::Closed {
                reason: "not subscribed".to_string(),
            },
        };

        ViewerStatus {
            source_id: self.source_id.to_string(),
            source_name: self.source_name.clone(),
            capture: self.capture_status.clone(),
            feed,
            live_comments: self.store.len() as u32,
            frame_port: None,
        }
    }

    /// Unsubscribe, clear comments, stop the overlay and stop capture.
    /// Runs once; later calls do nothing.
    pub fn unmount(&mut self) {
        if self.unmounted {
            return;
        }
        self.unmounted = true;

        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        if let Some(forwarder) = self.feed_forwarder.take() {
            forwarder.abort();
        }
        self.store.clear();
        self.driver.stop();
        self.capture.stop();
        self.set_capture_status(CaptureStatus::Stopped);

        log::info!("[VIEWER] Unmounted viewer for {}", self.source_id);
    }

    fn set_capture_status(&mut self, status: CaptureStatus) {
        if self.capture_status != status {
            self.events.capture_status(&status);
            self.capture_status = status;
        }
    }
}

impl Drop for ViewerSession {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Subscribe to the feed, pushing every event into the store, and forward
/// connection state to the viewer.
async fn subscribe_store(
    feed: &CommentFeedClient,
    store: Weak<CommentStore>,
    events: &Arc<dyn ViewerEvents>,
) -> (Option<Subscription>, Option<JoinHandle<()>>) {
    let on_event = move |event: FeedEvent| {
        let Some(store) = store.upgrade() else {
            return;
        };
        match store.add(event) {
            Ok(id) => log::trace!("[VIEWER] Comment {} added", id),
            Err(StoreError::NoRuntime) => log::error!("[VIEWER] Comment dropped: no runtime"),
            Err(e) => log::debug!("[VIEWER] Comment skipped: {}", e),
        }
    };
    let on_error = |e: FeedError| log::debug!("[VIEWER] Feed error: {}", e);

    match feed.subscribe(on_event, on_error).await {
        Ok(subscription) => {
            let mut status = subscription.status();
            let events = Arc::clone(events);
            let forwarder = tokio::spawn(async move {
                loop {
                    let current = status.borrow_and_update().clone();
                    events.feed_status(&current);
                    if status.changed().await.is_err() {
                        break;
                    }
                }
            });
            (Some(subscription), Some(forwarder))
        },
        Err(e) => {
            events.feed_status(&FeedStatus::Closed { reason: e.to_string() });
            (None, None)
        },
    }
}
