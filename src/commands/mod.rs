//! Tauri command surface for the web view.
//!
//! - `viewer`: source listing and the viewer lifecycle
//! - `comments`: posting from the composer
//! - `input`: click-through
//! - `navigation`: route resolution
//! - `settings`: configuration load, save and persistence
//!
//! Logging commands (`write_log`, `get_log_dir`) live in `crate::logging`.

pub mod comments;
pub mod input;
pub mod navigation;
pub mod settings;
pub mod viewer;
