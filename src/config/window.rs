//! Overlay window configuration.
//!
//! These flags are applied once when the overlay window is created. Only
//! click-through can be changed afterwards.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Visual and input properties of the overlay window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub struct WindowConfig {
    pub frameless: bool,
    pub transparent: bool,
    /// Stay above other windows, including full-screen surfaces.
    pub always_on_top: bool,
    pub no_shadow: bool,
    pub not_resizable: bool,
    /// Let pointer input fall through to the window beneath.
    pub click_through: bool,
    /// Keep reporting pointer moves while click-through is on.
    pub forward_pointer_moves: bool,
    /// Global shortcut that toggles click-through.
    pub click_through_shortcut: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            frameless: true,
            transparent: true,
            always_on_top: true,
            no_shadow: true,
            not_resizable: true,
            click_through: true,
            forward_pointer_moves: true,
            click_through_shortcut: "CommandOrControl+Shift+O".to_string(),
        }
    }
}
