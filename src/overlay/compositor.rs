//! Overlay compositor.
//!
//! Turns the live comment set into a draw list for one instant. Each comment
//! starts flush against the right edge, just off screen, and slides left at
//! constant speed until its right edge meets the left edge of the viewport,
//! where it stays until the store removes it.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use ts_rs::TS;

use crate::comments::{Comment, CommentId};
use crate::config::OverlayConfig;

/// Width of a narrow glyph relative to the font size (bold sans-serif).
const NARROW_GLYPH_EM: f32 = 0.6;

/// Width of a full-width glyph (CJK, kana, emoji) relative to the font size.
const WIDE_GLYPH_EM: f32 = 1.0;

/// Overlay area in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
        }
    }
}

/// How comment text is painted. Shipped with every frame.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub struct CommentStyle {
    pub font_size: f32,
    pub font_weight: u16,
    pub color: String,
    pub outline_color: String,
    pub outline_width: f32,
}

impl Default for CommentStyle {
    fn default() -> Self {
        Self {
            font_size: 32.0,
            font_weight: 700,
            color: "#FFFFFF".to_string(),
            outline_color: "#000000".to_string(),
            outline_width: 2.0,
        }
    }
}

/// One comment positioned for drawing.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub struct DrawItem {
    pub id: CommentId,
    pub text: String,
    /// Distance from the top, percent of viewport height.
    pub top_percent: f32,
    /// Animation progress in `[0, 1]`.
    pub progress: f32,
    /// Left edge in pixels, from the estimated text width.
    pub x: f32,
    /// Always false: comments never take pointer input.
    pub interactive: bool,
}

/// Everything the viewer needs to paint the overlay once.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub struct OverlayFrame {
    pub viewport: Viewport,
    pub style: CommentStyle,
    pub items: Vec<DrawItem>,
}

impl OverlayFrame {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Linear progress of an animation, clamped to `[0, 1]`.
pub fn progress(age: Duration, animation: Duration) -> f32 {
    if animation.is_zero() {
        return 1.0;
    }
    (age.as_secs_f64() / animation.as_secs_f64()).clamp(0.0, 1.0) as f32
}

/// Left edge of a comment of `text_width` at `progress`.
///
/// Starts at `viewport_width` (just off the right edge) and ends at
/// `-text_width` (just off the left edge).
pub fn left_edge(progress: f32, viewport_width: f32, text_width: f32) -> f32 {
    (1.0 - progress) * viewport_width - progress * text_width
}

fn is_wide(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x115F
        | 0x2E80..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x1F300..=0x1FAFF
        | 0x20000..=0x3FFFD)
}

/// Rough rendered width of `text`. The web view measures the real width;
/// this only feeds `DrawItem::x`.
pub fn estimate_text_width(text: &str, font_size: f32) -> f32 {
    text.chars()
        .map(|c| if is_wide(c) { WIDE_GLYPH_EM } else { NARROW_GLYPH_EM })
        .sum::<f32>()
        * font_size
}

/// Pure renderer from comments to frames.
#[derive(Debug, Clone)]
pub struct OverlayCompositor {
    animation: Duration,
    style: CommentStyle,
    viewport: Viewport,
}

impl OverlayCompositor {
    pub fn new(config: &OverlayConfig, viewport: Viewport) -> Self {
        Self {
            animation: Duration::from_millis(u64::from(config.animation_ms)),
            style: CommentStyle {
                font_size: config.font_size,
                ..CommentStyle::default()
            },
            viewport,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn render(&self, comments: &[Comment], now: Instant) -> OverlayFrame {
        let items = comments
            .iter()
            .map(|comment| {
                let p = progress(comment.age(now), self.animation);
                let text_width = estimate_text_width(&comment.text, self.style.font_size);
                DrawItem {
                    id: comment.id.clone(),
                    text: comment.text.clone(),
                    top_percent: comment.vertical_offset,
                    progress: p,
                    x: left_edge(p, self.viewport.width, text_width),
                    interactive: false,
                }
            })
            .collect();

        OverlayFrame {
            viewport: self.viewport,
            style: self.style.clone(),
            items,
        }
    }
}
