//! Route resolution for the web view.

use tauri::command;

use crate::navigation::Route;

/// Resolve the web view's current location against the route table.
/// Missing `sourceId` and unknown paths come back as the picker.
#[command]
pub fn resolve_route(url: String) -> Route {
    Route::parse(&url)
}
