//! In-process feed transport.
//!
//! An append-only map of collections with broadcast fan-out. Backs the
//! offline mode (comments posted from the composer window show up in the
//! viewer of the same app) and stands in for the remote feed in tests.
//! Each collection retains only its most recent children for replay.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use super::{
    AttachOptions, ChildSink, FeedError, FeedRecord, FeedStatus, FeedTransport, RawChild,
    StatusSink,
};

/// Buffered children per subscriber before it starts lagging.
const BROADCAST_CAPACITY: usize = 256;

/// Children kept per collection for replay to late subscribers.
const DEFAULT_RETENTION: usize = 1024;

/// A child appended to some collection.
#[derive(Debug, Clone)]
struct Appended {
    collection: String,
    child: RawChild,
}

struct MemoryInner {
    collections: Mutex<HashMap<String, VecDeque<RawChild>>>,
    retention: usize,
    tx: broadcast::Sender<Appended>,
    next_key: AtomicU64,
}

/// Shared handle to an in-process feed.
#[derive(Clone)]
pub struct MemoryFeed {
    inner: Arc<MemoryInner>,
}

impl Default for MemoryFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    /// Feed that keeps at most `retention` children per collection.
    pub fn with_retention(retention: usize) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            inner: Arc::new(MemoryInner {
                collections: Mutex::new(HashMap::new()),
                retention: retention.max(1),
                tx,
                next_key: AtomicU64::new(1),
            }),
        }
    }

    /// Append an arbitrary value under `key`, bypassing validation.
    ///
    /// The same key may be pushed more than once, which is how replay after
    /// a reconnect looks to a subscriber.
    pub fn push_raw(&self, collection: &str, key: &str, value: serde_json::Value) {
        let child = RawChild::new(key, value);
        // Hold the collection lock while broadcasting so an attaching
        // subscriber sees each child either in its snapshot or live.
        let mut collections = self.inner.collections.lock();
        let children = collections.entry(collection.to_string()).or_default();
        if children.len() >= self.inner.retention {
            children.pop_front();
        }
        children.push_back(child.clone());
        let _ = self.inner.tx.send(Appended {
            collection: collection.to_string(),
            child,
        });
    }

    /// Number of attached subscribers across all collections.
    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }

    /// Time-ordered key in the spirit of Firebase push ids.
    fn generate_key(&self) -> String {
        let seq = self.inner.next_key.fetch_add(1, Ordering::Relaxed);
        let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
        format!("-m{:011x}{:06x}", millis, seq)
    }
}

impl FeedTransport for MemoryFeed {
    fn attach(
        &self,
        options: AttachOptions,
        sink: ChildSink,
        status: StatusSink,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<(), FeedError>> {
        let (existing, mut rx) = {
            let collections = self.inner.collections.lock();
            let existing: Vec<RawChild> = if options.replay_existing {
                collections
                    .get(&options.collection)
                    .map(|children| children.iter().cloned().collect())
                    .unwrap_or_default()
            } else {
                Vec::new()
            };
            (existing, self.inner.tx.subscribe())
        };

        async move {
            if cancel.is_cancelled() {
                return Err(FeedError::Cancelled);
            }

            for child in existing {
                sink(child);
            }
            status(FeedStatus::Connected);

            let collection = options.collection;
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        received = rx.recv() => match received {
                            Ok(appended) if appended.collection == collection => sink(appended.child),
                            Ok(_) => {},
                            Err(RecvError::Lagged(skipped)) => {
                                log::warn!("[MEMORY_FEED] Subscriber lagged, {} children skipped", skipped);
                            },
                            Err(RecvError::Closed) => {
                                status(FeedStatus::Closed { reason: "feed closed".to_string() });
                                break;
                            },
                        },
                    }
                }
                log::debug!("[MEMORY_FEED] Listener for '{}' stopped", collection);
            });

            Ok(())
        }
        .boxed()
    }

    fn append(
        &self,
        collection: &str,
        record: FeedRecord,
    ) -> BoxFuture<'static, Result<String, FeedError>> {
        let feed = self.clone();
        let collection = collection.to_string();
        async move {
            let key = feed.generate_key();
            let value = serde_json::to_value(&record).map_err(|e| FeedError::Rejected {
                status: 400,
                message: e.to_string(),
            })?;
            feed.push_raw(&collection, &key, value);
            Ok(key)
        }
        .boxed()
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_retention_keeps_newest_children() {
        let feed = MemoryFeed::with_retention(2);
        for i in 0..5 {
            feed.push_raw("comments", &format!("k{}", i), json!({"text": "x"}));
        }

        let keys = Arc::new(Mutex::new(Vec::new()));
        let sink_keys = Arc::clone(&keys);
        let cancel = CancellationToken::new();
        feed.attach(
            AttachOptions {
                collection: "comments".to_string(),
                replay_existing: true,
            },
            Arc::new(move |child: RawChild| sink_keys.lock().push(child.key)),
            Arc::new(|_: FeedStatus| {}),
            cancel.clone(),
        )
        .await
        .unwrap();
        cancel.cancel();

        assert_eq!(*keys.lock(), vec!["k3".to_string(), "k4".to_string()]);
        assert_eq!(feed.inner.collections.lock()["comments"].len(), 2);
    }
}
