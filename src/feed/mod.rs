//! Comment feed: subscribe to and publish into a remote append-only
//! collection.
//!
//! ## Architecture
//!
//! ```text
//! feed/
//!   mod.rs      - FeedTransport trait, re-exports
//!   client.rs   - CommentFeedClient + Subscription (validation, timeouts, lifecycle)
//!   firebase.rs - Firebase Realtime Database REST streaming transport
//!   memory.rs   - In-process transport (offline mode, tests)
//!   types.rs    - FeedEvent, FeedError, FeedStatus, RawChild
//! ```
//!
//! Transports only move raw JSON children. Validation, the empty-text rule
//! and bounded waits live in the client so every transport gets them.

pub mod client;
pub mod firebase;
pub mod memory;
pub mod types;

pub use client::{CommentFeedClient, Subscription};
pub use firebase::FirebaseTransport;
pub use memory::MemoryFeed;
pub use types::{FeedError, FeedEvent, FeedRecord, FeedStatus, RawChild};

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

/// Receives every child added to a collection.
pub type ChildSink = Arc<dyn Fn(RawChild) + Send + Sync>;

/// Receives connection state changes.
pub type StatusSink = Arc<dyn Fn(FeedStatus) + Send + Sync>;

/// How a transport should attach to a collection.
#[derive(Debug, Clone)]
pub struct AttachOptions {
    pub collection: String,
    /// Also deliver children that exist at attach time.
    pub replay_existing: bool,
}

/// A push feed backend.
///
/// `attach` resolves once the subscription is live; children keep flowing
/// into `sink` from a background task until `cancel` fires.
pub trait FeedTransport: Send + Sync {
    fn attach(
        &self,
        options: AttachOptions,
        sink: ChildSink,
        status: StatusSink,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<(), FeedError>>;

    /// Append a record and return the key the backend assigned.
    fn append(
        &self,
        collection: &str,
        record: FeedRecord,
    ) -> BoxFuture<'static, Result<String, FeedError>>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}
