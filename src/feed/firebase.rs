//! Firebase Realtime Database transport over the REST streaming API.
//!
//! Subscribing opens `GET <db>/<collection>.json` with
//! `Accept: text/event-stream`. The server first sends a `put` at path `/`
//! holding the whole collection, then `put` / `patch` events for changes.
//! Publishing is a `POST` to the same URL, answered with `{"name": <key>}`.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use eventsource_stream::{Event as SseEvent, Eventsource};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use lru::LruCache;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::{
    AttachOptions, ChildSink, FeedError, FeedRecord, FeedStatus, FeedTransport, RawChild,
    StatusSink,
};

/// First reconnect delay; doubled on each failed attempt.
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Child keys remembered per subscription for reconnect dedup.
const KNOWN_KEYS_CAPACITY: usize = 4096;

#[derive(Debug, Deserialize)]
struct PathData {
    path: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

/// What the stream reader should do after an event.
#[derive(Debug, PartialEq, Eq)]
enum StreamControl {
    Continue,
    /// Server ended the subscription for good (`cancel` / `auth_revoked`).
    Terminate(String),
}

/// Tracks which child keys a subscriber has already been given.
///
/// The first snapshot seeds the set (or is delivered, when replaying);
/// snapshots after a reconnect only deliver keys never seen before. Only
/// the most recent `capacity` keys are remembered.
struct ChildTracker {
    known: LruCache<String, ()>,
    seen_snapshot: bool,
    replay_existing: bool,
}

impl ChildTracker {
    fn new(replay_existing: bool) -> Self {
        Self::with_capacity(replay_existing, KNOWN_KEYS_CAPACITY)
    }

    fn with_capacity(replay_existing: bool, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            known: LruCache::new(capacity),
            seen_snapshot: false,
            replay_existing,
        }
    }

    /// Record `key`, returning whether it was new.
    fn remember(&mut self, key: &str) -> bool {
        self.known.put(key.to_string(), ()).is_none()
    }

    /// Translate one server event into newly added children.
    fn apply(&mut self, event: &SseEvent) -> Result<(Vec<RawChild>, StreamControl), FeedError> {
        match event.event.as_str() {
            "put" | "patch" => {
                let payload: PathData =
                    serde_json::from_str(&event.data).map_err(|e| FeedError::Parse {
                        key: String::new(),
                        reason: format!("{} event: {}", event.event, e),
                    })?;
                let added = if event.event == "put" {
                    self.on_put(payload)
                } else {
                    self.on_patch(payload)
                };
                Ok((added, StreamControl::Continue))
            },
            "keep-alive" => Ok((Vec::new(), StreamControl::Continue)),
            "cancel" => Ok((
                Vec::new(),
                StreamControl::Terminate("permission denied by security rules".to_string()),
            )),
            "auth_revoked" => Ok((
                Vec::new(),
                StreamControl::Terminate("auth token revoked or expired".to_string()),
            )),
            other => {
                log::debug!("[FIREBASE] Ignoring event '{}'", other);
                Ok((Vec::new(), StreamControl::Continue))
            },
        }
    }

    fn on_put(&mut self, payload: PathData) -> Vec<RawChild> {
        let segments: Vec<&str> = payload.path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => {
                let first = !self.seen_snapshot;
                self.seen_snapshot = true;
                let children = match payload.data {
                    serde_json::Value::Object(map) => map,
                    _ => return Vec::new(),
                };
                let deliver = !first || self.replay_existing;
                children
                    .into_iter()
                    .filter_map(|(key, value)| {
                        let fresh = self.remember(&key);
                        (fresh && deliver).then(|| RawChild::new(key, value))
                    })
                    .collect()
            },
            [key] => {
                if payload.data.is_null() || !self.remember(key) {
                    return Vec::new();
                }
                vec![RawChild::new(*key, payload.data)]
            },
            // Writes below a child are edits, not additions.
            _ => Vec::new(),
        }
    }

    fn on_patch(&mut self, payload: PathData) -> Vec<RawChild> {
        if !payload.path.trim_matches('/').is_empty() {
            return Vec::new();
        }
        match payload.data {
            serde_json::Value::Object(map) => map
                .into_iter()
                .filter(|(key, value)| !value.is_null() && self.remember(key))
                .map(|(key, value)| RawChild::new(key, value))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// REST transport for one Firebase Realtime Database.
pub struct FirebaseTransport {
    client: reqwest::Client,
    database_url: String,
    auth_token: Option<String>,
    max_backoff: Duration,
}

impl FirebaseTransport {
    pub fn new(database_url: String, auth_token: Option<String>, max_backoff: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            database_url: database_url.trim_end_matches('/').to_string(),
            auth_token,
            max_backoff,
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}.json", self.database_url, collection.trim_matches('/'))
    }
}

async fn open_stream(
    client: &reqwest::Client,
    url: &str,
    auth_token: Option<&str>,
) -> Result<reqwest::Response, FeedError> {
    let mut request = client
        .get(url)
        .header(reqwest::header::ACCEPT, "text/event-stream");
    if let Some(token) = auth_token {
        request = request.query(&[("auth", token)]);
    }

    let response = request
        .send()
        .await
        .map_err(|e| FeedError::Connection(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(FeedError::Rejected {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

/// Read one connected stream until it ends. `Ok` carries a terminal reason
/// when the server closed the subscription for good.
async fn read_stream(
    response: reqwest::Response,
    tracker: &mut ChildTracker,
    sink: &ChildSink,
    cancel: &CancellationToken,
) -> Result<Option<String>, String> {
    let mut events = response.bytes_stream().eventsource();

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return Ok(None),
            next = events.next() => next,
        };
        let event = match next {
            Some(Ok(event)) => event,
            Some(Err(e)) => return Err(e.to_string()),
            None => return Err("stream ended".to_string()),
        };

        match tracker.apply(&event) {
            Ok((added, control)) => {
                for child in added {
                    sink(child);
                }
                if let StreamControl::Terminate(reason) = control {
                    return Ok(Some(reason));
                }
            },
            Err(e) => log::warn!("[FIREBASE] {}", e),
        }
    }
}

impl FeedTransport for FirebaseTransport {
    fn attach(
        &self,
        options: AttachOptions,
        sink: ChildSink,
        status: StatusSink,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<(), FeedError>> {
        let client = self.client.clone();
        let url = self.collection_url(&options.collection);
        let auth_token = self.auth_token.clone();
        let max_backoff = self.max_backoff;

        async move {
            let first = open_stream(&client, &url, auth_token.as_deref()).await?;
            log::info!("[FIREBASE] Stream open for '{}'", options.collection);

            let status = Arc::clone(&status);
            tokio::spawn(async move {
                let mut tracker = ChildTracker::new(options.replay_existing);
                let mut response = Some(first);
                let mut attempt: u32 = 0;
                let mut backoff = INITIAL_BACKOFF;

                loop {
                    let error = match response.take() {
                        Some(stream) => {
                            attempt = 0;
                            backoff = INITIAL_BACKOFF;
                            match read_stream(stream, &mut tracker, &sink, &cancel).await {
                                Ok(None) => break,
                                Ok(Some(reason)) => {
                                    status(FeedStatus::Closed { reason });
                                    break;
                                },
                                Err(e) => e,
                            }
                        },
                        None => match open_stream(&client, &url, auth_token.as_deref()).await {
                            Ok(stream) => {
                                status(FeedStatus::Connected);
                                response = Some(stream);
                                continue;
                            },
                            Err(e) => e.to_string(),
                        },
                    };

                    if cancel.is_cancelled() {
                        break;
                    }
                    attempt += 1;
                    status(FeedStatus::Reconnecting { attempt, error });

                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {},
                    }
                    backoff = (backoff * 2).min(max_backoff);
                }

                log::debug!("[FIREBASE] Listener for '{}' stopped", options.collection);
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
        let mut request = self.client.post(self.collection_url(collection)).json(&record);
        if let Some(token) = &self.auth_token {
            request = request.query(&[("auth", token.as_str())]);
        }

        async move {
            let response = request
                .send()
                .await
                .map_err(|e| FeedError::Connection(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(FeedError::Rejected {
                    status: status.as_u16(),
                    message,
                });
            }

            let body: PushResponse = response
                .json()
                .await
                .map_err(|e| FeedError::Connection(format!("bad push response: {}", e)))?;
            Ok(body.name)
        }
        .boxed()
    }

    fn name(&self) -> &'static str {
        "firebase"
    }
}
