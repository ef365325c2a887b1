//! Shared types for the capture module.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

/// What kind of surface a source is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub enum SourceKind {
    Window,
    Screen,
}

impl SourceKind {
    fn prefix(self) -> &'static str {
        match self {
            SourceKind::Window => "window",
            SourceKind::Screen => "screen",
        }
    }
}

/// Opaque source identifier, `window:<n>` or `screen:<n>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceId {
    kind: SourceKind,
    native: u32,
}

impl SourceId {
    pub fn window(native: u32) -> Self {
        Self {
            kind: SourceKind::Window,
            native,
        }
    }

    pub fn screen(native: u32) -> Self {
        Self {
            kind: SourceKind::Screen,
            native,
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Platform id of the window or monitor.
    pub fn native(&self) -> u32 {
        self.native
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.prefix(), self.native)
    }
}

impl FromStr for SourceId {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CaptureError::InvalidSource(s.to_string());
        let (prefix, native) = s.split_once(':').ok_or_else(invalid)?;
        let native: u32 = native.parse().map_err(|_| invalid())?;
        match prefix {
            "window" => Ok(Self::window(native)),
            "screen" => Ok(Self::screen(native)),
            _ => Err(invalid()),
        }
    }
}

impl Serialize for SourceId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SourceId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A window or screen the operator can pick. Snapshot at enumeration time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub struct CaptureSource {
    #[ts(type = "string")]
    pub id: SourceId,
    pub name: String,
    /// `data:image/png;base64,...` or empty when no thumbnail could be made.
    pub thumbnail: String,
    pub kind: SourceKind,
}

/// Lifecycle of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub enum SessionStatus {
    Idle,
    Starting,
    Active,
    Failed,
    Stopped,
}

/// Capture session errors. All of them are recoverable from the viewer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("screen capture permission denied")]
    PermissionDenied,

    /// The window or screen went away.
    #[error("capture source is gone: {0}")]
    SourceGone(String),

    #[error("invalid capture source: {0}")]
    InvalidSource(String),

    #[error("failed to acquire capture stream: {0}")]
    Acquisition(String),

    #[error("capture did not start within {millis} ms")]
    Timeout { millis: u64 },

    /// Operation needs an active session.
    #[error("no active capture session")]
    Inactive,
}

/// Source enumeration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("screen capture permission denied")]
    PermissionDenied,

    #[error("failed to enumerate capture sources: {0}")]
    Enumeration(String),

    #[error("source enumeration timed out after {millis} ms")]
    Timeout { millis: u64 },
}

/// Heuristic for platform errors that mean the OS refused capture access.
pub(crate) fn is_permission_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("permission") || lower.contains("not authorized") || lower.contains("access is denied")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_id_parse_and_display() {
        let id: SourceId = "window:7".parse().unwrap();
        assert_eq!(id, SourceId::window(7));
        assert_eq!(id.to_string(), "window:7");

        let id: SourceId = "screen:0".parse().unwrap();
        assert_eq!(id.kind(), SourceKind::Screen);
        assert_eq!(id.native(), 0);
    }

    #[test]
    fn test_source_id_rejects_garbage() {
        for raw in ["", "window", "window:", "window:x", "tab:3", "screen:-1"] {
            assert!(
                matches!(raw.parse::<SourceId>(), Err(CaptureError::InvalidSource(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_source_serializes_as_plain_string() {
        let source = CaptureSource {
            id: SourceId::screen(2),
            name: "Display 2".to_string(),
            thumbnail: String::new(),
            kind: SourceKind::Screen,
        };
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["id"], "screen:2");
        assert_eq!(json["kind"], "screen");

        let back: CaptureSource = serde_json::from_value(json).unwrap();
        assert_eq!(back, source);
    }

    #[test]
    fn test_permission_heuristic() {
        assert!(is_permission_error("Screen Recording permission not granted"));
        assert!(is_permission_error("Access is denied. (0x80070005)"));
        assert!(!is_permission_error("window not found"));
    }
}
