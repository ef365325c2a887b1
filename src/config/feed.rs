//! Push feed configuration.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Environment variable that overrides the Firebase database URL.
pub const FEED_URL_ENV: &str = "COMMENT_OVERLAY_FEED_URL";

/// Which transport backs the comment feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub enum FeedBackend {
    /// In-process feed. Comments posted from this app show up in this app only.
    Memory,
    /// Firebase Realtime Database over its REST streaming API.
    Firebase {
        /// e.g. `https://my-project-default-rtdb.firebaseio.com`
        #[serde(rename = "databaseUrl")]
        database_url: String,
        /// Database secret or ID token, sent as `?auth=`.
        #[serde(rename = "authToken")]
        auth_token: Option<String>,
    },
}

/// Settings for the comment feed client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub struct FeedConfig {
    pub backend: FeedBackend,

    /// Collection the comments are appended to.
    pub collection: String,

    /// Deliver children that already exist when the subscription attaches.
    pub replay_existing: bool,

    /// Bounded wait for the stream to connect (1000-60000 ms).
    pub connect_timeout_ms: u32,

    /// Bounded wait for a publish to be acknowledged (1000-60000 ms).
    pub publish_timeout_ms: u32,

    /// Upper bound on the reconnect backoff (1000-300000 ms).
    pub max_backoff_ms: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            backend: FeedBackend::Memory,
            collection: "comments".to_string(),
            replay_existing: false,
            connect_timeout_ms: 10_000,
            publish_timeout_ms: 10_000,
            max_backoff_ms: 30_000,
        }
    }
}

impl FeedConfig {
    /// Validate and clamp settings to acceptable ranges.
    pub fn validate(&mut self) {
        self.connect_timeout_ms = self.connect_timeout_ms.clamp(1000, 60_000);
        self.publish_timeout_ms = self.publish_timeout_ms.clamp(1000, 60_000);
        self.max_backoff_ms = self.max_backoff_ms.clamp(1000, 300_000);

        let trimmed = self.collection.trim().trim_matches('/');
        self.collection = if trimmed.is_empty() {
            "comments".to_string()
        } else {
            trimmed.to_string()
        };

        if let FeedBackend::Firebase { database_url, .. } = &mut self.backend {
            *database_url = database_url.trim().trim_end_matches('/').to_string();
        }
    }

    /// Apply the `COMMENT_OVERLAY_FEED_URL` override if it is set.
    pub fn apply_env_override(&mut self) {
        if let Ok(url) = std::env::var(FEED_URL_ENV) {
            if url.trim().is_empty() {
                return;
            }
            let auth_token = match &self.backend {
                FeedBackend::Firebase { auth_token, .. } => auth_token.clone(),
                FeedBackend::Memory => None,
            };
            log::info!("[CONFIG] Feed URL taken from {}", FEED_URL_ENV);
            self.backend = FeedBackend::Firebase {
                database_url: url,
                auth_token,
            };
            self.validate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_memory_comments() {
        let config = FeedConfig::default();
        assert_eq!(config.backend, FeedBackend::Memory);
        assert_eq!(config.collection, "comments");
        assert!(!config.replay_existing);
    }

    #[test]
    fn test_validate_normalizes_collection_and_url() {
        let mut config = FeedConfig {
            backend: FeedBackend::Firebase {
                database_url: " https://example.firebaseio.com/ ".to_string(),
                auth_token: None,
            },
            collection: "/ ".to_string(),
            connect_timeout_ms: 0,
            ..FeedConfig::default()
        };
        config.validate();
        assert_eq!(config.collection, "comments");
        assert_eq!(config.connect_timeout_ms, 1000);
        assert_eq!(
            config.backend,
            FeedBackend::Firebase {
                database_url: "https://example.firebaseio.com".to_string(),
                auth_token: None,
            }
        );
    }

    #[test]
    fn test_firebase_wire_format() {
        let backend: FeedBackend = serde_json::from_str(
            r#"{"kind":"firebase","databaseUrl":"https://x.firebaseio.com","authToken":null}"#,
        )
        .unwrap();
        assert!(matches!(backend, FeedBackend::Firebase { .. }));
    }
}
