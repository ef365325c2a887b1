//! Source picker model.
//!
//! The picker web view renders `PickerState` as-is. Card hover styling is a
//! pure function of `CardState`, so the view never mutates styles itself.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::capture::{CaptureSource, RegistryError};

/// What the picker shows.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(tag = "state", rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub enum PickerState {
    /// Enumeration in flight.
    Loading,
    Ready { sources: Vec<CaptureSource> },
    /// Enumeration succeeded but nothing can be captured.
    NoSources,
    /// The OS refused screen capture.
    PermissionDenied,
    Failed { message: String },
}

impl PickerState {
    pub fn from_listing(listing: Result<Vec<CaptureSource>, RegistryError>) -> Self {
        match listing {
            Ok(sources) if sources.is_empty() => Self::NoSources,
            Ok(sources) => Self::Ready { sources },
            Err(RegistryError::PermissionDenied) => Self::PermissionDenied,
            Err(e) => Self::Failed { message: e.to_string() },
        }
    }

    pub fn sources(&self) -> &[CaptureSource] {
        match self {
            Self::Ready { sources } => sources,
            _ => &[],
        }
    }
}

/// Interaction state of one source card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub enum CardState {
    #[default]
    Idle,
    Hovered,
    /// Keyboard focus looks like hover.
    Focused,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub struct CardStyle {
    pub border_color: String,
    pub scale: f32,
}

impl From<CardState> for CardStyle {
    fn from(state: CardState) -> Self {
        match state {
            CardState::Idle => Self {
                border_color: "#dddddd".to_string(),
                scale: 1.0,
            },
            CardState::Hovered | CardState::Focused => Self {
                border_color: "#007bff".to_string(),
                scale: 1.02,
            },
        }
    }
}

/// Style table for every card state, sent once to the picker.
pub fn card_styles() -> Vec<(CardState, CardStyle)> {
    [CardState::Idle, CardState::Hovered, CardState::Focused]
        .into_iter()
        .map(|state| (state, CardStyle::from(state)))
        .collect()
}
