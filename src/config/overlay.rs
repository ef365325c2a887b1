//! Overlay configuration.
//!
//! Display TTL and animation duration are deliberately separate knobs: the
//! comment finishes its sweep one second before it is removed.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Default time a comment stays in the store.
pub const DEFAULT_DISPLAY_TTL_MS: u32 = 6000;

/// Default time a comment takes to cross the viewport.
pub const DEFAULT_ANIMATION_MS: u32 = 5000;

/// Comments are placed in the top 80% of the viewport.
pub const MAX_VERTICAL_OFFSET: f32 = 80.0;

/// What the store does when a feed key arrives more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub enum DedupPolicy {
    /// Every delivery becomes an entity. Repeats get `<key>#<n>` ids.
    AllowDuplicates,
    /// Reject a key while an entity for it is still on screen.
    IgnoreLive,
    /// Reject a key seen among the last `capacity` keys, live or expired.
    RememberRecent { capacity: u32 },
}

impl Default for DedupPolicy {
    fn default() -> Self {
        Self::RememberRecent { capacity: 1024 }
    }
}

/// Settings for the comment store and compositor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub struct OverlayConfig {
    /// How long a comment lives before automatic removal (500-60000 ms).
    pub display_ttl_ms: u32,

    /// How long the right-to-left sweep takes (500-60000 ms).
    pub animation_ms: u32,

    /// Duplicate key handling.
    pub dedup: DedupPolicy,

    /// Optional cap on simultaneously live comments (0 = unbounded, up to
    /// 1000). When set, the oldest comment leaves early to make room.
    pub max_live: u32,

    /// Overlay frames per second (1-120).
    pub frame_rate: u32,

    /// Font size in pixels for comment text (8-200).
    pub font_size: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            display_ttl_ms: DEFAULT_DISPLAY_TTL_MS,
            animation_ms: DEFAULT_ANIMATION_MS,
            dedup: DedupPolicy::default(),
            max_live: 0,
            frame_rate: 60,
            font_size: 32.0,
        }
    }
}

impl OverlayConfig {
    /// Validate and clamp settings to acceptable ranges.
    pub fn validate(&mut self) {
        self.display_ttl_ms = self.display_ttl_ms.clamp(500, 60_000);
        self.animation_ms = self.animation_ms.clamp(500, 60_000);
        self.max_live = self.max_live.min(1000);
        self.frame_rate = self.frame_rate.clamp(1, 120);
        self.font_size = self.font_size.clamp(8.0, 200.0);
        if let DedupPolicy::RememberRecent { capacity } = &mut self.dedup {
            *capacity = (*capacity).clamp(1, 100_000);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_keep_ttl_longer_than_animation() {
        let config = OverlayConfig::default();
        assert_eq!(config.display_ttl_ms, 6000);
        assert_eq!(config.animation_ms, 5000);
        assert!(config.display_ttl_ms > config.animation_ms);
        assert_eq!(config.max_live, 0, "live comments are unbounded by default");
    }

    #[test]
    fn test_validate_clamps() {
        let mut config = OverlayConfig {
            display_ttl_ms: 0,
            animation_ms: 1_000_000,
            dedup: DedupPolicy::RememberRecent { capacity: 0 },
            max_live: 5000,
            frame_rate: 500,
            font_size: 1.0,
        };
        config.validate();
        assert_eq!(config.display_ttl_ms, 500);
        assert_eq!(config.animation_ms, 60_000);
        assert_eq!(config.dedup, DedupPolicy::RememberRecent { capacity: 1 });
        assert_eq!(config.max_live, 1000);
        assert_eq!(config.frame_rate, 120);
        assert_eq!(config.font_size, 8.0);
    }

    #[test]
    fn test_dedup_policy_wire_format() {
        let json = serde_json::to_string(&DedupPolicy::IgnoreLive).unwrap();
        assert_eq!(json, r#"{"kind":"ignoreLive"}"#);

        let parsed: DedupPolicy =
            serde_json::from_str(r#"{"kind":"rememberRecent","capacity":16}"#).unwrap();
        assert_eq!(parsed, DedupPolicy::RememberRecent { capacity: 16 });
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: OverlayConfig = serde_json::from_str(r#"{"displayTtlMs":9000}"#).unwrap();
        assert_eq!(config.display_ttl_ms, 9000);
        assert_eq!(config.animation_ms, DEFAULT_ANIMATION_MS);
    }
}
