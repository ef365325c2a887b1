//! Application-level configuration.
//!
//! Aggregates the per-subsystem configs into one struct that is persisted as a
//! whole in `settings.json` through `tauri-plugin-store`.
//!
//! Uses `parking_lot::RwLock` for thread-safe access; the frontend replaces
//! the whole config in a single IPC call.

use lazy_static::lazy_static;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::{CaptureConfig, FeedConfig, OverlayConfig, WindowConfig};

lazy_static! {
    /// Global app configuration.
    pub static ref APP_CONFIG: RwLock<AppConfig> = RwLock::new(AppConfig::default());
}

/// Every user-tunable setting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub struct AppConfig {
    pub overlay: OverlayConfig,
    pub feed: FeedConfig,
    pub capture: CaptureConfig,
    pub window: WindowConfig,
}

impl AppConfig {
    /// Validate and clamp every section.
    pub fn validate(&mut self) {
        self.overlay.validate();
        self.feed.validate();
        self.capture.validate();
    }
}

// ============================================================================
// Getters (for internal Rust use)
// ============================================================================

pub fn capture_config() -> CaptureConfig {
    APP_CONFIG.read().capture.clone()
}

/// Replace the whole configuration, validating it first.
pub fn replace_app_config(mut config: AppConfig) -> AppConfig {
    config.validate();
    log::debug!("[APP_CONFIG] replaced: {:?}", config);
    *APP_CONFIG.write() = config.clone();
    config
}

/// Update only the click-through flag (toggled from shortcut and tray).
pub fn set_click_through_flag(enabled: bool) {
    APP_CONFIG.write().window.click_through = enabled;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_json_keeps_sections() {
        let mut config = AppConfig::default();
        config.overlay.display_ttl_ms = 7000;
        config.capture.frame_rate = 15;

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["overlay"]["displayTtlMs"], 7000);
        assert_eq!(json["capture"]["frameRate"], 15);

        let restored: AppConfig = serde_json::from_value(json).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_empty_object_is_default() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_replace_validates() {
        let mut config = AppConfig::default();
        config.overlay.frame_rate = 0;
        let stored = replace_app_config(config);
        assert_eq!(stored.overlay.frame_rate, 1);
        assert_eq!(APP_CONFIG.read().overlay.frame_rate, 1);
        replace_app_config(AppConfig::default());
    }
}
