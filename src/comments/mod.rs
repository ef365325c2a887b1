//! Ephemeral comment entities.
//!
//! Feed events become `Comment`s that live for a fixed display TTL. The
//! store owns one cancellable expiry timer per comment so that tearing down
//! the viewer cancels everything in a single pass.

pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

pub use store::{CommentStore, StoreConfig, StoreError};
pub use types::{Comment, CommentId};
