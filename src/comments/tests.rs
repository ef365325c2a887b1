use std::time::Duration;

use tokio::time::{advance, Instant};

use super::*;
use crate::config::overlay::MAX_VERTICAL_OFFSET;
use crate::config::DedupPolicy;
use crate::feed::FeedEvent;

fn event(id: &str, text: &str) -> FeedEvent {
    FeedEvent::new(id, text, 1_700_000_000_000)
}

fn store_with(dedup: DedupPolicy, max_live: Option<usize>) -> CommentStore {
    CommentStore::new(StoreConfig {
        display_ttl: Duration::from_millis(6000),
        dedup,
        max_live,
    })
}

/// Let spawned expiry tasks observe the advanced clock.
async fn settle() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_comment_expires_after_ttl() {
    let store = CommentStore::new(StoreConfig::default());
    let id = store.add(event("c1", "hello")).unwrap();
    assert_eq!(store.len(), 1);

    advance(Duration::from_millis(5999)).await;
    settle().await;
    assert!(store.contains(&id), "still live just before the deadline");

    advance(Duration::from_millis(1)).await;
    settle().await;
    assert!(!store.contains(&id));
    assert!(store.is_empty());
    assert_eq!(store.pending_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_expiry_notifies_exactly_once() {
    let store = CommentStore::new(StoreConfig::default());
    let start = store.revision();
    store.add(event("c1", "once")).unwrap();
    assert_eq!(store.revision(), start + 1);

    advance(Duration::from_secs(20)).await;
    settle().await;
    assert_eq!(store.revision(), start + 2);

    advance(Duration::from_secs(20)).await;
    settle().await;
    assert_eq!(store.revision(), start + 2);
}

#[tokio::test(start_paused = true)]
async fn test_clear_cancels_pending_timers() {
    let store = CommentStore::new(StoreConfig::default());
    store.add(event("a", "one")).unwrap();
    store.add(event("b", "two")).unwrap();
    assert_eq!(store.pending_timers(), 2);

    store.clear();
    assert!(store.is_empty());
    assert_eq!(store.pending_timers(), 0);
    let after_clear = store.revision();

    advance(Duration::from_secs(10)).await;
    settle().await;
    assert_eq!(store.revision(), after_clear, "no expiry fires after clear");

    // Idempotent.
    store.clear();
    assert_eq!(store.revision(), after_clear);
}

#[tokio::test(start_paused = true)]
async fn test_remove_is_idempotent() {
    let store = CommentStore::new(StoreConfig::default());
    let id = store.add(event("x", "bye")).unwrap();
    assert!(store.remove(&id));
    assert!(!store.remove(&id));
    assert!(!store.remove(&CommentId::new("never-existed")));

    let rev = store.revision();
    advance(Duration::from_secs(10)).await;
    settle().await;
    assert_eq!(store.revision(), rev);
}

#[tokio::test(start_paused = true)]
async fn test_list_is_insertion_ordered() {
    let store = CommentStore::new(StoreConfig::default());
    for id in ["k3", "k1", "k2"] {
        store.add(event(id, id)).unwrap();
        advance(Duration::from_millis(100)).await;
    }
    let ids: Vec<String> = store.list().into_iter().map(|c| c.feed_key).collect();
    assert_eq!(ids, vec!["k3", "k1", "k2"]);

    // Expire one by one in the same order.
    advance(Duration::from_millis(5750)).await;
    settle().await;
    let ids: Vec<String> = store.list().into_iter().map(|c| c.feed_key).collect();
    assert_eq!(ids, vec!["k1", "k2"]);
}

#[tokio::test(start_paused = true)]
async fn test_vertical_offset_in_range() {
    let store = store_with(DedupPolicy::AllowDuplicates, None);
    for i in 0..500 {
        store.add(event(&format!("k{}", i), "t")).unwrap();
    }
    for comment in store.list() {
        assert!(comment.vertical_offset >= 0.0);
        assert!(comment.vertical_offset < MAX_VERTICAL_OFFSET);
    }
}

#[tokio::test(start_paused = true)]
async fn test_empty_text_is_rejected() {
    let store = CommentStore::new(StoreConfig::default());
    assert_eq!(store.add(event("e", "")), Err(StoreError::EmptyText));
    assert_eq!(store.add(event("e", "  \t")), Err(StoreError::EmptyText));
    assert!(store.is_empty());
}

#[test]
fn test_add_without_runtime() {
    let store = CommentStore::new(StoreConfig::default());
    assert_eq!(store.add(event("a", "b")), Err(StoreError::NoRuntime));
    assert!(store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_remember_recent_rejects_expired_keys() {
    let store = CommentStore::new(StoreConfig::default());
    store.add(event("dup", "first")).unwrap();
    assert_eq!(
        store.add(event("dup", "again")),
        Err(StoreError::Duplicate("dup".to_string()))
    );

    advance(Duration::from_secs(7)).await;
    settle().await;
    assert!(store.is_empty());
    assert!(store.add(event("dup", "replayed")).is_err());
}

#[tokio::test(start_paused = true)]
async fn test_remember_recent_forgets_beyond_capacity() {
    let store = store_with(DedupPolicy::RememberRecent { capacity: 2 }, None);
    store.add(event("a", "1")).unwrap();
    store.add(event("b", "2")).unwrap();
    store.add(event("c", "3")).unwrap();
    advance(Duration::from_secs(7)).await;
    settle().await;

    // "a" fell out of the window of remembered keys.
    assert!(store.add(event("a", "again")).is_ok());
    assert!(store.add(event("c", "again")).is_err());
}

#[tokio::test(start_paused = true)]
async fn test_ignore_live_accepts_after_expiry() {
    let store = store_with(DedupPolicy::IgnoreLive, None);
    store.add(event("k", "first")).unwrap();
    assert!(matches!(store.add(event("k", "second")), Err(StoreError::Duplicate(_))));

    advance(Duration::from_secs(7)).await;
    settle().await;
    let id = store.add(event("k", "third")).unwrap();
    assert_eq!(id.as_str(), "k");
}

#[tokio::test(start_paused = true)]
async fn test_allow_duplicates_assigns_unique_ids() {
    let store = store_with(DedupPolicy::AllowDuplicates, None);
    let first = store.add(event("k", "one")).unwrap();
    let second = store.add(event("k", "two")).unwrap();
    let third = store.add(event("k", "three")).unwrap();
    assert_eq!(first.as_str(), "k");
    assert_eq!(second.as_str(), "k#2");
    assert_eq!(third.as_str(), "k#3");
    assert_eq!(store.len(), 3);
    assert!(store.list().iter().all(|c| c.feed_key == "k"));
}

#[tokio::test(start_paused = true)]
async fn test_flood_does_not_expire_early_by_default() {
    let store = CommentStore::new(StoreConfig::default());
    store.add(event("first", "first")).unwrap();
    for i in 0..200 {
        store.add(event(&format!("c{}", i), "flood")).unwrap();
    }
    settle().await;
    assert_eq!(store.len(), 201);
    assert_eq!(store.list()[0].feed_key, "first");

    advance(Duration::from_millis(5999)).await;
    settle().await;
    assert_eq!(store.len(), 201);

    advance(Duration::from_millis(2)).await;
    settle().await;
    assert!(store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_max_live_evicts_oldest_when_enabled() {
    let store = store_with(DedupPolicy::IgnoreLive, Some(3));
    for id in ["a", "b", "c", "d"] {
        store.add(event(id, id)).unwrap();
    }
    let keys: Vec<String> = store.list().into_iter().map(|c| c.feed_key).collect();
    assert_eq!(keys, vec!["b", "c", "d"]);
    assert_eq!(store.pending_timers(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_stale_timer_does_not_remove_newer_entity() {
    let store = store_with(DedupPolicy::IgnoreLive, None);
    let id = store.add(event("k", "old")).unwrap();
    advance(Duration::from_secs(3)).await;

    store.remove(&id);
    let newer = store.add(event("k", "new")).unwrap();
    assert_eq!(newer, id);

    // The first deadline passes; the re-added comment must survive it.
    advance(Duration::from_secs(3)).await;
    settle().await;
    assert!(store.contains(&newer));

    advance(Duration::from_secs(3)).await;
    settle().await;
    assert!(!store.contains(&newer));
}

#[tokio::test(start_paused = true)]
async fn test_comment_fields() {
    let store = CommentStore::new(StoreConfig::default());
    let before = Instant::now();
    store.add(FeedEvent::new("f1", "payload", 42)).unwrap();
    let comment = store.list().remove(0);
    assert_eq!(comment.text, "payload");
    assert_eq!(comment.posted_at, 42);
    assert!(comment.created_at > 0);
    assert_eq!(comment.age(before), Duration::ZERO);

    advance(Duration::from_millis(250)).await;
    assert_eq!(comment.age(Instant::now()), Duration::from_millis(250));
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_sees_changes() {
    let store = CommentStore::new(StoreConfig::default());
    let mut rx = store.subscribe();
    store.add(event("w", "watch me")).unwrap();
    assert!(rx.has_changed().unwrap());
    rx.borrow_and_update();

    advance(Duration::from_secs(7)).await;
    settle().await;
    assert!(rx.has_changed().unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_drop_cancels_timers() {
    let store = CommentStore::new(StoreConfig::default());
    let rx = store.subscribe();
    store.add(event("a", "x")).unwrap();
    drop(store);

    advance(Duration::from_secs(10)).await;
    settle().await;
    // Sender is gone with the store; nothing panicked on the expiry path.
    assert!(rx.has_changed().is_err());
}
