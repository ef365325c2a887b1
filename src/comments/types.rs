//! Comment entity types.

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use ts_rs::TS;

/// Unique id of a live comment, derived from the feed key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub struct CommentId(String);

impl CommentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CommentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A comment currently on screen.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub struct Comment {
    pub id: CommentId,
    /// Key as delivered by the feed.
    pub feed_key: String,
    pub text: String,
    /// Percent of viewport height, in `[0, 80)`. Fixed at creation.
    pub vertical_offset: f32,
    /// When the entity was created (Unix ms).
    #[ts(type = "number")]
    pub created_at: i64,
    /// Timestamp carried by the feed record (Unix ms).
    #[ts(type = "number")]
    pub posted_at: i64,
    /// Monotonic insertion time; drives expiry and animation.
    #[serde(skip)]
    #[ts(skip)]
    pub inserted_at: Instant,
}

impl Comment {
    /// Time since the comment was inserted, measured against `now`.
    pub fn age(&self, now: Instant) -> std::time::Duration {
        now.saturating_duration_since(self.inserted_at)
    }
}
