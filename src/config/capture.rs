//! Capture configuration.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Settings for source enumeration and capture sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub struct CaptureConfig {
    /// Frames per second grabbed from the selected source (1-60).
    pub frame_rate: u32,

    /// Bounded wait for a session to start (500-30000 ms).
    pub start_timeout_ms: u32,

    /// Bounded wait for source enumeration (500-30000 ms).
    pub enumerate_timeout_ms: u32,

    /// Width of source thumbnails in pixels (64-1024).
    pub thumbnail_width: u32,

    /// Include screens (monitors) alongside windows.
    pub include_screens: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30,
            start_timeout_ms: 5000,
            enumerate_timeout_ms: 5000,
            thumbnail_width: 320,
            include_screens: true,
        }
    }
}

impl CaptureConfig {
    /// Validate and clamp settings to acceptable ranges.
    pub fn validate(&mut self) {
        self.frame_rate = self.frame_rate.clamp(1, 60);
        self.start_timeout_ms = self.start_timeout_ms.clamp(500, 30_000);
        self.enumerate_timeout_ms = self.enumerate_timeout_ms.clamp(500, 30_000);
        self.thumbnail_width = self.thumbnail_width.clamp(64, 1024);
    }

    /// Interval between grabbed frames.
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(1000 / u64::from(self.frame_rate.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_interval() {
        let config = CaptureConfig::default();
        assert_eq!(config.frame_interval().as_millis(), 33);
    }

    #[test]
    fn test_validate_clamps() {
        let mut config = CaptureConfig {
            frame_rate: 0,
            thumbnail_width: 10_000,
            ..CaptureConfig::default()
        };
        config.validate();
        assert_eq!(config.frame_rate, 1);
        assert_eq!(config.thumbnail_width, 1024);
    }
}
