//! App-wide managed state.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::capture::CaptureBackend;
use crate::config::FeedConfig;
use crate::feed::{CommentFeedClient, MemoryFeed};
use crate::preview::{FrameSender, FrameServer};
use crate::viewer::ViewerSession;
use crate::window::WindowInputController;

/// Shared services plus the single viewer slot.
pub struct AppState {
    /// In-process feed, shared by viewer and composer in offline mode.
    memory_feed: MemoryFeed,
    feed: RwLock<Arc<CommentFeedClient>>,
    backend: Arc<dyn CaptureBackend>,
    frames: FrameSender,
    frame_server: Option<FrameServer>,
    viewer: tokio::sync::Mutex<Option<ViewerSession>>,
    input: Mutex<Option<WindowInputController>>,
}

impl AppState {
    pub fn new(
        backend: Arc<dyn CaptureBackend>,
        frames: FrameSender,
        frame_server: Option<FrameServer>,
        feed_config: FeedConfig,
    ) -> Self {
        let memory_feed = MemoryFeed::new();
        let feed = CommentFeedClient::from_config(feed_config, &memory_feed);
        Self {
            memory_feed,
            feed: RwLock::new(Arc::new(feed)),
            backend,
            frames,
            frame_server,
            viewer: tokio::sync::Mutex::new(None),
            input: Mutex::new(None),
        }
    }

    pub fn feed(&self) -> Arc<CommentFeedClient> {
        self.feed.read().clone()
    }

    /// Rebuild the feed client after the feed settings changed. An open
    /// viewer keeps its current subscription until it is reopened.
    pub fn reconfigure_feed(&self, config: FeedConfig) {
        if self.feed.read().config() == &config {
            return;
        }
        let client = CommentFeedClient::from_config(config, &self.memory_feed);
        *self.feed.write() = Arc::new(client);
    }

    pub fn backend(&self) -> Arc<dyn CaptureBackend> {
        Arc::clone(&self.backend)
    }

    pub fn frames(&self) -> FrameSender {
        Arc::clone(&self.frames)
    }

    pub fn frame_port(&self) -> Option<u16> {
        self.frame_server.as_ref().map(FrameServer::port)
    }

    pub fn viewer(&self) -> &tokio::sync::Mutex<Option<ViewerSession>> {
        &self.viewer
    }

    /// Tear down the open viewer, if any.
    pub async fn close_viewer(&self) {
        if let Some(mut viewer) = self.viewer.lock().await.take() {
            viewer.unmount();
        }
    }

    pub fn set_input_controller(&self, controller: WindowInputController) {
        *self.input.lock() = Some(controller);
    }

    pub fn input(&self) -> &Mutex<Option<WindowInputController>> {
        &self.input
    }
}
