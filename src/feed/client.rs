//! Feed client and subscription lifecycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::{
    AttachOptions, ChildSink, FeedError, FeedEvent, FeedRecord, FeedStatus, FeedTransport,
    FirebaseTransport, MemoryFeed, StatusSink,
};
use crate::config::{FeedBackend, FeedConfig};

/// Client for one comment collection. Cheap to share behind an `Arc`.
pub struct CommentFeedClient {
    transport: Arc<dyn FeedTransport>,
    config: FeedConfig,
}

impl CommentFeedClient {
    pub fn new(transport: Arc<dyn FeedTransport>, config: FeedConfig) -> Self {
        Self { transport, config }
    }

    /// Build a client for the configured backend. `memory` is the app-wide
    /// in-process feed used when no remote backend is configured.
    pub fn from_config(config: FeedConfig, memory: &MemoryFeed) -> Self {
        let transport: Arc<dyn FeedTransport> = match &config.backend {
            FeedBackend::Memory => Arc::new(memory.clone()),
            FeedBackend::Firebase {
                database_url,
                auth_token,
            } => Arc::new(FirebaseTransport::new(
                database_url.clone(),
                auth_token.clone(),
                Duration::from_millis(u64::from(config.max_backoff_ms)),
            )),
        };
        log::info!(
            "[FEED] Using {} transport for '{}'",
            transport.name(),
            config.collection
        );
        Self::new(transport, config)
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Attach to the collection.
    ///
    /// `on_event` sees every well-formed child added after attachment.
    /// Malformed children are logged and dropped. `on_error` sees
    /// connection problems after the subscription is live; a failure to
    /// attach in the first place is returned instead.
    pub async fn subscribe<F, E>(&self, on_event: F, on_error: E) -> Result<Subscription, FeedError>
    where
        F: Fn(FeedEvent) + Send + Sync + 'static,
        E: Fn(FeedError) + Send + Sync + 'static,
    {
        let cancel = CancellationToken::new();
        let (status_tx, status_rx) = watch::channel(FeedStatus::Connecting);
        let status_tx = Arc::new(status_tx);

        let sink: ChildSink = {
            let cancel = cancel.clone();
            Arc::new(move |child| {
                if cancel.is_cancelled() {
                    return;
                }
                match FeedEvent::try_from(child) {
                    Ok(event) => on_event(event),
                    Err(e) => log::warn!("[FEED] Dropping child: {}", e),
                }
            })
        };

        let status: StatusSink = {
            let cancel = cancel.clone();
            let status_tx = Arc::clone(&status_tx);
            Arc::new(move |status| {
                if cancel.is_cancelled() {
                    return;
                }
                match &status {
                    FeedStatus::Reconnecting { error, .. } => {
                        log::warn!("[FEED] Connection lost: {}", error);
                        on_error(FeedError::Connection(error.clone()));
                    },
                    FeedStatus::Closed { reason } => {
                        log::error!("[FEED] Subscription closed by server: {}", reason);
                        on_error(FeedError::Connection(reason.clone()));
                    },
                    FeedStatus::Connected => log::info!("[FEED] Connected"),
                    FeedStatus::Connecting => {},
                }
                status_tx.send_replace(status);
            })
        };

        let options = AttachOptions {
            collection: self.config.collection.clone(),
            replay_existing: self.config.replay_existing,
        };
        let timeout_ms = u64::from(self.config.connect_timeout_ms);
        let attach = self.transport.attach(options, sink, status, cancel.clone());

        match tokio::time::timeout(Duration::from_millis(timeout_ms), attach).await {
            Ok(Ok(())) => {
                status_tx.send_replace(FeedStatus::Connected);
                log::info!("[FEED] Subscribed to '{}'", self.config.collection);
                Ok(Subscription {
                    cancel,
                    status: status_rx,
                    collection: self.config.collection.clone(),
                    released: false,
                })
            },
            Ok(Err(e)) => {
                cancel.cancel();
                log::error!("[FEED] Subscribe failed: {}", e);
                Err(e)
            },
            Err(_) => {
                cancel.cancel();
                log::error!("[FEED] Subscribe timed out after {} ms", timeout_ms);
                Err(FeedError::Timeout {
                    operation: "subscribe".to_string(),
                    millis: timeout_ms,
                })
            },
        }
    }

    /// Append `{ text, timestamp }` to the collection and return its key.
    ///
    /// Empty or whitespace-only text never reaches the transport.
    pub async fn publish(&self, text: &str) -> Result<String, FeedError> {
        if text.trim().is_empty() {
            return Err(FeedError::EmptyText);
        }

        let record = FeedRecord::now(text);
        let timeout_ms = u64::from(self.config.publish_timeout_ms);
        let append = self.transport.append(&self.config.collection, record);

        match tokio::time::timeout(Duration::from_millis(timeout_ms), append).await {
            Ok(Ok(key)) => {
                log::debug!("[FEED] Published {}", key);
                Ok(key)
            },
            Ok(Err(e)) => {
                log::warn!("[FEED] Publish failed: {}", e);
                Err(e)
            },
            Err(_) => Err(FeedError::Timeout {
                operation: "publish".to_string(),
                millis: timeout_ms,
            }),
        }
    }
}

/// A live subscription. Releasing it stops all observer calls.
///
/// `unsubscribe` consumes the handle so it can only run once; dropping an
/// unreleased subscription releases it too.
pub struct Subscription {
    cancel: CancellationToken,
    status: watch::Receiver<FeedStatus>,
    collection: String,
    released: bool,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.release();
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Connection state updates for this subscription.
    pub fn status(&self) -> watch::Receiver<FeedStatus> {
        self.status.clone()
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.cancel.cancel();
        log::info!("[FEED] Unsubscribed from '{}'", self.collection);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
