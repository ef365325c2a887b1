//! Types shared by the feed client and its transports.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

/// Errors produced by the comment feed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// A record did not have the expected shape. Dropped, never surfaced.
    #[error("malformed feed payload for key {key}: {reason}")]
    Parse { key: String, reason: String },

    /// The subscription stream could not be opened or broke.
    #[error("feed connection failed: {0}")]
    Connection(String),

    /// The backend refused the request.
    #[error("feed rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Publishing was attempted with empty or whitespace-only text.
    #[error("comment text is empty")]
    EmptyText,

    /// A bounded wait elapsed.
    #[error("feed {operation} timed out after {millis} ms")]
    Timeout { operation: String, millis: u64 },

    /// The subscription was cancelled before it attached.
    #[error("feed subscription cancelled")]
    Cancelled,
}

/// A child record as it arrives from a transport, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChild {
    pub key: String,
    pub value: serde_json::Value,
}

impl RawChild {
    pub fn new(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Record shape stored in the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedRecord {
    pub text: String,
    pub timestamp: i64,
}

impl FeedRecord {
    /// A record stamped with the current wall clock.
    pub fn now(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// A validated child-added event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub struct FeedEvent {
    /// Feed-assigned key.
    pub id: String,
    pub text: String,
    #[ts(type = "number")]
    pub timestamp: i64,
}

impl FeedEvent {
    pub fn new(id: impl Into<String>, text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            timestamp,
        }
    }
}

impl TryFrom<RawChild> for FeedEvent {
    type Error = FeedError;

    fn try_from(child: RawChild) -> Result<Self, Self::Error> {
        let parse_err = |reason: &str| FeedError::Parse {
            key: child.key.clone(),
            reason: reason.to_string(),
        };

        if child.key.is_empty() {
            return Err(parse_err("empty key"));
        }
        let object = child
            .value
            .as_object()
            .ok_or_else(|| parse_err("value is not an object"))?;
        let text = object
            .get("text")
            .and_then(|t| t.as_str())
            .ok_or_else(|| parse_err("missing text"))?
            .to_string();
        // Missing or non-numeric timestamps fall back to arrival time.
        let timestamp = object
            .get("timestamp")
            .and_then(|t| t.as_i64().or_else(|| t.as_f64().map(|f| f as i64)))
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

        Ok(Self {
            id: child.key,
            text,
            timestamp,
        })
    }
}

/// Connection state of a subscription, reported to the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(tag = "state", rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub enum FeedStatus {
    Connecting,
    Connected,
    Reconnecting { attempt: u32, error: String },
    Closed { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_valid_child() {
        let child = RawChild::new("c1", json!({"text": "hello", "timestamp": 1700000000000i64}));
        let event = FeedEvent::try_from(child).unwrap();
        assert_eq!(event, FeedEvent::new("c1", "hello", 1700000000000));
    }

    #[test]
    fn test_parse_float_timestamp() {
        let child = RawChild::new("c2", json!({"text": "x", "timestamp": 12.9}));
        assert_eq!(FeedEvent::try_from(child).unwrap().timestamp, 12);
    }

    #[test]
    fn test_parse_missing_text_is_rejected() {
        let child = RawChild::new("c3", json!({"timestamp": 1}));
        let err = FeedEvent::try_from(child).unwrap_err();
        assert!(matches!(err, FeedError::Parse { ref key, .. } if key == "c3"));
    }

    #[test]
    fn test_parse_non_object_is_rejected() {
        assert!(FeedEvent::try_from(RawChild::new("c4", json!("just text"))).is_err());
        assert!(FeedEvent::try_from(RawChild::new("c5", serde_json::Value::Null)).is_err());
        assert!(FeedEvent::try_from(RawChild::new("c6", json!({"text": 42}))).is_err());
    }

    #[test]
    fn test_missing_timestamp_uses_now() {
        let before = chrono::Utc::now().timestamp_millis();
        let event = FeedEvent::try_from(RawChild::new("c7", json!({"text": "t"}))).unwrap();
        assert!(event.timestamp >= before);
    }

    #[test]
    fn test_record_wire_format() {
        let record = FeedRecord {
            text: "hi".to_string(),
            timestamp: 5,
        };
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"text": "hi", "timestamp": 5})
        );
    }

    #[test]
    fn test_status_wire_format() {
        let status = FeedStatus::Reconnecting {
            attempt: 2,
            error: "reset".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({"state": "reconnecting", "attempt": 2, "error": "reset"})
        );
    }
}
