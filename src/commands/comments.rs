//! Comment composer commands.

use tauri::{command, State};

use crate::app::AppState;
use crate::error::OverlayResult;

/// Publish a comment and return the key the feed assigned to it.
///
/// Empty or whitespace-only text is rejected before anything is sent.
#[command]
pub async fn post_comment(state: State<'_, AppState>, text: String) -> OverlayResult<String> {
    let feed = state.feed();
    let key = feed.publish(&text).await?;
    log::info!("[COMMENTS] Posted comment {}", key);
    Ok(key)
}
