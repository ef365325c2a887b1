//! Application configuration management.
//!
//! Centralized, thread-safe configuration for the overlay, the comment feed,
//! capture sessions and the overlay window.
//!
//! ## Architecture
//!
//! - `OverlayConfig`: display TTL, animation duration, dedup policy
//! - `FeedConfig`: transport, collection, timeouts
//! - `CaptureConfig`: frame rate, thumbnails, timeouts
//! - `WindowConfig`: overlay window flags and click-through shortcut
//!
//! All of them live in one `AppConfig` behind a `parking_lot::RwLock`.

pub mod app;
pub mod capture;
pub mod feed;
pub mod overlay;
pub mod window;

pub use app::{AppConfig, APP_CONFIG};
pub use capture::CaptureConfig;
pub use feed::{FeedBackend, FeedConfig};
pub use overlay::{DedupPolicy, OverlayConfig};
pub use window::WindowConfig;
