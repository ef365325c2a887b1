//! Ephemeral entity store.
//!
//! Entities live in an arena ordered by insertion sequence. Each entry keeps
//! the `AbortHandle` of its own expiry task, and an expiry task only removes
//! the sequence number it was created for, so a stale timer can never remove
//! a newer entity that happens to share an id.

use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use rand::Rng;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::Instant;

use super::types::{Comment, CommentId};
use crate::config::overlay::{OverlayConfig, MAX_VERTICAL_OFFSET};
use crate::config::DedupPolicy;
use crate::feed::FeedEvent;

/// How many keys `AllowDuplicates` remembers for repeat numbering.
const REPEAT_COUNTER_CAPACITY: usize = 4096;

/// Reasons the store refuses an event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The event carried no visible text.
    #[error("comment text is empty")]
    EmptyText,

    /// The feed key was already delivered and the dedup policy rejects it.
    #[error("duplicate feed key: {0}")]
    Duplicate(String),

    /// `add` was called outside a tokio runtime, so no timer can be scheduled.
    #[error("no async runtime available to schedule expiry")]
    NoRuntime,
}

/// Store settings, usually derived from `OverlayConfig`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub display_ttl: Duration,
    pub dedup: DedupPolicy,
    /// Opt-in cap on live comments. Reaching it removes the oldest early.
    pub max_live: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::from(&OverlayConfig::default())
    }
}

impl From<&OverlayConfig> for StoreConfig {
    fn from(config: &OverlayConfig) -> Self {
        Self {
            display_ttl: Duration::from_millis(u64::from(config.display_ttl_ms)),
            dedup: config.dedup,
            max_live: (config.max_live > 0).then_some(config.max_live as usize),
        }
    }
}

struct Entry {
    comment: Comment,
    timer: Option<AbortHandle>,
}

impl Entry {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Mutable state behind the store lock.
struct StoreState {
    /// Insertion sequence -> entry. Iteration order is display order.
    entries: BTreeMap<u64, Entry>,
    /// Live id -> insertion sequence.
    index: HashMap<CommentId, u64>,
    next_seq: u64,
    /// Recently seen keys (`RememberRecent`).
    recent_keys: Option<LruCache<String, ()>>,
    /// Delivery count per key (`AllowDuplicates`).
    repeat_counts: Option<LruCache<String, u32>>,
}

impl StoreState {
    fn new(dedup: DedupPolicy) -> Self {
        let recent_keys = match dedup {
            DedupPolicy::RememberRecent { capacity } => {
                let capacity = NonZeroUsize::new(capacity as usize).unwrap_or(NonZeroUsize::MIN);
                Some(LruCache::new(capacity))
            }
            _ => None,
        };
        let repeat_counts = match dedup {
            DedupPolicy::AllowDuplicates => NonZeroUsize::new(REPEAT_COUNTER_CAPACITY).map(LruCache::new),
            _ => None,
        };

        Self {
            entries: BTreeMap::new(),
            index: HashMap::new(),
            next_seq: 0,
            recent_keys,
            repeat_counts,
        }
    }

    /// Decide the entity id for a feed key, or reject it.
    fn admit(&mut self, dedup: DedupPolicy, key: &str) -> Result<CommentId, StoreError> {
        let key_id = CommentId::new(key);
        match dedup {
            DedupPolicy::IgnoreLive => {
                if self.index.contains_key(&key_id) {
                    return Err(StoreError::Duplicate(key.to_string()));
                }
                Ok(key_id)
            },
            DedupPolicy::RememberRecent { .. } => {
                let seen = self
                    .recent_keys
                    .as_mut()
                    .map(|recent| recent.put(key.to_string(), ()).is_some())
                    .unwrap_or(false);
                if seen || self.index.contains_key(&key_id) {
                    return Err(StoreError::Duplicate(key.to_string()));
                }
                Ok(key_id)
            },
            DedupPolicy::AllowDuplicates => {
                let mut n = match self.repeat_counts.as_mut() {
                    Some(counts) => {
                        let count = counts.get(key).copied().unwrap_or(0) + 1;
                        counts.put(key.to_string(), count);
                        count
                    },
                    None => 1,
                };
                loop {
                    let candidate = if n <= 1 {
                        key_id.clone()
                    } else {
                        CommentId::new(format!("{}#{}", key, n))
                    };
                    if !self.index.contains_key(&candidate) {
                        return Ok(candidate);
                    }
                    n += 1;
                }
            },
        }
    }

    fn remove_seq(&mut self, seq: u64) -> Option<Comment> {
        let mut entry = self.entries.remove(&seq)?;
        entry.cancel_timer();
        self.index.remove(&entry.comment.id);
        Some(entry.comment)
    }
}

struct Shared {
    state: Mutex<StoreState>,
    revision: watch::Sender<u64>,
}

impl Shared {
    fn bump(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    /// Called by the expiry task for `seq`.
    fn expire(&self, seq: u64) {
        let removed = {
            let mut state = self.state.lock();
            // Our own task is finishing; don't abort it.
            if let Some(entry) = state.entries.get_mut(&seq) {
                entry.timer = None;
            }
            state.remove_seq(seq)
        };
        if let Some(comment) = removed {
            log::debug!("[STORE] Comment {} expired", comment.id);
            self.bump();
        }
    }
}

/// Time-bounded comment entities with exactly-once expiry.
///
/// `add` must be called from within a tokio runtime; every entry schedules its
/// own expiry task on it.
pub struct CommentStore {
    shared: Arc<Shared>,
    config: StoreConfig,
}

impl CommentStore {
    pub fn new(config: StoreConfig) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(StoreState::new(config.dedup)),
                revision,
            }),
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Turn a feed event into a live comment and schedule its removal.
    pub fn add(&self, event: FeedEvent) -> Result<CommentId, StoreError> {
        if event.text.trim().is_empty() {
            return Err(StoreError::EmptyText);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| StoreError::NoRuntime)?;

        let id = {
            let mut state = self.shared.state.lock();
            let id = state.admit(self.config.dedup, &event.id)?;

            if let Some(max_live) = self.config.max_live {
                while state.entries.len() >= max_live {
                    let Some((&oldest, _)) = state.entries.first_key_value() else {
                        break;
                    };
                    if let Some(evicted) = state.remove_seq(oldest) {
                        log::debug!("[STORE] Evicted {} (max_live={})", evicted.id, max_live);
                    }
                }
            }

            let seq = state.next_seq;
            state.next_seq += 1;

            let inserted_at = Instant::now();
            let comment = Comment {
                id: id.clone(),
                feed_key: event.id,
                text: event.text,
                vertical_offset: rand::thread_rng().gen_range(0.0..MAX_VERTICAL_OFFSET),
                created_at: chrono::Utc::now().timestamp_millis(),
                posted_at: event.timestamp,
                inserted_at,
            };

            let weak: Weak<Shared> = Arc::downgrade(&self.shared);
            let deadline = inserted_at + self.config.display_ttl;
            let task = runtime.spawn(async move {
                tokio::time::sleep_until(deadline).await;
                if let Some(shared) = weak.upgrade() {
                    shared.expire(seq);
                }
            });

            state.index.insert(id.clone(), seq);
            state.entries.insert(
                seq,
                Entry {
                    comment,
                    timer: Some(task.abort_handle()),
                },
            );
            id
        };

        log::debug!("[STORE] Added comment {}", id);
        self.shared.bump();
        Ok(id)
    }

    /// Remove a comment early. Unknown or already removed ids are ignored.
    pub fn remove(&self, id: &CommentId) -> bool {
        let removed = {
            let mut state = self.shared.state.lock();
            match state.index.get(id).copied() {
                Some(seq) => state.remove_seq(seq).is_some(),
                None => false,
            }
        };
        if removed {
            self.shared.bump();
        }
        removed
    }

    /// Cancel every pending expiry and drop all comments.
    pub fn clear(&self) {
        let cleared = {
            let mut state = self.shared.state.lock();
            let count = state.entries.len();
            for entry in state.entries.values_mut() {
                entry.cancel_timer();
            }
            state.entries.clear();
            state.index.clear();
            count
        };
        if cleared > 0 {
            log::debug!("[STORE] Cleared {} comments", cleared);
            self.shared.bump();
        }
    }

    /// Live comments, oldest first.
    pub fn list(&self) -> Vec<Comment> {
        self.shared
            .state
            .lock()
            .entries
            .values()
            .map(|entry| entry.comment.clone())
            .collect()
    }

    pub fn contains(&self, id: &CommentId) -> bool {
        self.shared.state.lock().index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.shared.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of expiry tasks that have not fired or been cancelled.
    #[cfg(test)]
    pub fn pending_timers(&self) -> usize {
        self.shared
            .state
            .lock()
            .entries
            .values()
            .filter(|entry| entry.timer.is_some())
            .count()
    }

    /// Receiver that changes every time the entity set changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    /// Current revision (number of changes so far).
    #[cfg(test)]
    pub fn revision(&self) -> u64 {
        *self.shared.revision.borrow()
    }
}

impl Drop for CommentStore {
    fn drop(&mut self) {
        self.clear();
    }
}
