//! Comment overlay: pure compositor plus the frame pump that drives it.

pub mod compositor;
pub mod driver;

pub use compositor::{
    estimate_text_width, CommentStyle, DrawItem, OverlayCompositor, OverlayFrame, Viewport,
};
pub use driver::{OverlayDriver, OverlaySurface};
