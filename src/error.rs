//! Central error types for the comment overlay.
//!
//! Each subsystem owns a narrow error enum (`FeedError`, `StoreError`,
//! `CaptureError`, `RegistryError`). `OverlayError` wraps them at the IPC
//! boundary and implements `Serialize` so Tauri can hand it to the web view.

use serde::Serialize;
use thiserror::Error;

use crate::capture::{CaptureError, RegistryError};
use crate::comments::StoreError;
use crate::feed::FeedError;

/// Main error type for overlay operations.
#[derive(Error, Debug)]
pub enum OverlayError {
    /// Capture session failed (recoverable, shown in the viewer)
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// Source enumeration failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Push feed failed
    #[error(transparent)]
    Feed(#[from] FeedError),

    /// Entity store rejected an event
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Window management error
    #[error("Window error: {0}")]
    WindowError(String),

    /// Settings could not be loaded or saved
    #[error("Config error: {0}")]
    ConfigError(String),

    /// Filesystem operation failed
    #[error("Storage error: {0}")]
    StorageError(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

/// Tauri requires command errors to be serializable.
impl Serialize for OverlayError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<tauri::Error> for OverlayError {
    fn from(err: tauri::Error) -> Self {
        OverlayError::WindowError(err.to_string())
    }
}

impl From<String> for OverlayError {
    fn from(msg: String) -> Self {
        OverlayError::Other(msg)
    }
}

impl From<&str> for OverlayError {
    fn from(msg: &str) -> Self {
        OverlayError::Other(msg.to_string())
    }
}

/// Extension trait for adding context to Results.
///
/// # Example
/// ```ignore
/// use crate::error::{OverlayResult, ResultExt};
///
/// fn read_settings() -> OverlayResult<String> {
///     std::fs::read_to_string("settings.json").context("failed to read settings")
/// }
/// ```
pub trait ResultExt<T> {
    /// Add context to an error, converting it to OverlayError::Other.
    fn context(self, msg: &str) -> OverlayResult<T>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F: FnOnce() -> String>(self, f: F) -> OverlayResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn context(self, msg: &str) -> OverlayResult<T> {
        self.map_err(|e| OverlayError::Other(format!("{}: {}", msg, e)))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> OverlayResult<T> {
        self.map_err(|e| OverlayError::Other(format!("{}: {}", f(), e)))
    }
}

/// Extension trait for adding context to Option types.
pub trait OptionExt<T> {
    /// Convert None to OverlayError::Other with the given message.
    fn context(self, msg: &str) -> OverlayResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn context(self, msg: &str) -> OverlayResult<T> {
        self.ok_or_else(|| OverlayError::Other(msg.to_string()))
    }
}

/// Type alias for Results using OverlayError.
pub type OverlayResult<T> = Result<T, OverlayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_error_is_transparent() {
        let err: OverlayError = CaptureError::SourceGone("window:7".to_string()).into();
        assert!(matches!(err, OverlayError::Capture(_)));
        assert!(err.to_string().contains("window:7"));
    }

    #[test]
    fn test_error_serialization() {
        let err: OverlayError = FeedError::EmptyText.into();
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("empty"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: OverlayError = io_err.into();
        assert!(matches!(err, OverlayError::StorageError(_)));
    }

    #[test]
    fn test_from_string() {
        let err: OverlayError = "test error".into();
        assert!(matches!(err, OverlayError::Other(_)));
    }

    #[test]
    fn test_result_ext_context() {
        let result: Result<(), &str> = Err("original error");
        let msg = result.context("operation failed").unwrap_err().to_string();
        assert!(msg.contains("operation failed"));
        assert!(msg.contains("original error"));
    }

    #[test]
    fn test_result_ext_with_context() {
        let result: Result<(), &str> = Err("inner");
        let msg = result
            .with_context(|| format!("ctx-{}", 42))
            .unwrap_err()
            .to_string();
        assert!(msg.contains("ctx-42"));
        assert!(msg.contains("inner"));
    }

    #[test]
    fn test_option_ext_context() {
        let opt: Option<i32> = None;
        let result = opt.context("value was missing");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("value was missing"));
        assert_eq!(Some(3).context("unused").unwrap(), 3);
    }
}
