//! Canonical route table.
//!
//! `/` is the source picker, `/viewer` the capture viewer, `/post` the
//! comment composer. The viewer needs `sourceId` (and shows `sourceName`);
//! without a source it falls back to the picker, as does any unknown path.

use serde::Serialize;
use tauri::Url;
use ts_rs::TS;

/// Base that relative routes are resolved against.
const APP_BASE: &str = "tauri://localhost/";

/// Entry document; serves the picker.
const INDEX_PATH: &str = "/index.html";

pub const PICKER_PATH: &str = "/";
pub const VIEWER_PATH: &str = "/viewer";
pub const COMPOSER_PATH: &str = "/post";

/// A resolved route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(tag = "route", rename_all = "camelCase")]
#[ts(export, export_to = "../ui/src/types/generated/")]
pub enum Route {
    SourcePicker,
    Viewer {
        #[serde(rename = "sourceId")]
        source_id: String,
        #[serde(rename = "sourceName")]
        source_name: String,
    },
    CommentComposer,
}

impl Route {
    pub fn viewer(source_id: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self::Viewer {
            source_id: source_id.into(),
            source_name: source_name.into(),
        }
    }

    /// Resolve a path with optional query string, e.g. `/viewer?sourceId=window%3A7`.
    pub fn parse(url: &str) -> Self {
        match Url::parse(APP_BASE).and_then(|base| base.join(url)) {
            Ok(url) => Self::from_url(&url),
            Err(e) => {
                log::debug!("[NAV] Unparseable route {:?} ({}), using picker", url, e);
                Self::SourcePicker
            },
        }
    }

    /// Resolve a full app URL. Only the path and query matter.
    pub fn from_url(url: &Url) -> Self {
        let path = match url.path().trim_end_matches('/') {
            "" | INDEX_PATH => PICKER_PATH,
            trimmed => trimmed,
        };
        let param = |name: &str| {
            url.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
        };

        match path {
            VIEWER_PATH => match param("sourceId").filter(|id| !id.is_empty()) {
                Some(source_id) => Self::Viewer {
                    source_id,
                    source_name: param("sourceName").unwrap_or_default(),
                },
                None => {
                    log::debug!("[NAV] Viewer without sourceId, redirecting to picker");
                    Self::SourcePicker
                },
            },
            COMPOSER_PATH => Self::CommentComposer,
            PICKER_PATH => Self::SourcePicker,
            other => {
                log::debug!("[NAV] Unknown path {}, redirecting to picker", other);
                Self::SourcePicker
            },
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::SourcePicker => PICKER_PATH,
            Self::Viewer { .. } => VIEWER_PATH,
            Self::CommentComposer => COMPOSER_PATH,
        }
    }

    /// Path plus URL-encoded query string.
    pub fn to_url(&self) -> String {
        match self {
            Self::Viewer {
                source_id,
                source_name,
            } => format!(
                "{}?sourceId={}&sourceName={}",
                VIEWER_PATH,
                urlencoding::encode(source_id),
                urlencoding::encode(source_name)
            ),
            other => other.path().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_paths() {
        assert_eq!(Route::parse("/"), Route::SourcePicker);
        assert_eq!(Route::parse(""), Route::SourcePicker);
        assert_eq!(Route::parse("/post"), Route::CommentComposer);
        assert_eq!(Route::parse("/post/"), Route::CommentComposer);
        assert_eq!(Route::parse("/index.html"), Route::SourcePicker);
    }

    #[test]
    fn test_full_app_urls_resolve() {
        let url = Url::parse("http://tauri.localhost/viewer?sourceName=Chat&sourceId=window%3A3").unwrap();
        assert_eq!(Route::from_url(&url), Route::viewer("window:3", "Chat"));
        assert_eq!(Route::parse("tauri://localhost/post"), Route::CommentComposer);
    }

    #[test]
    fn test_viewer_round_trip_encodes_query() {
        let route = Route::viewer("window:7", "Chat & Stream / Live");
        let url = route.to_url();
        assert_eq!(
            url,
            "/viewer?sourceId=window%3A7&sourceName=Chat%20%26%20Stream%20%2F%20Live"
        );
        assert_eq!(Route::parse(&url), route);
    }

    #[test]
    fn test_viewer_without_source_redirects_to_picker() {
        assert_eq!(Route::parse("/viewer"), Route::SourcePicker);
        assert_eq!(Route::parse("/viewer?sourceName=x"), Route::SourcePicker);
        assert_eq!(Route::parse("/viewer?sourceId="), Route::SourcePicker);
    }

    #[test]
    fn test_viewer_name_is_optional() {
        assert_eq!(Route::parse("/viewer?sourceId=screen%3A1"), Route::viewer("screen:1", ""));
    }

    #[test]
    fn test_unknown_paths_resolve_to_picker() {
        assert_eq!(Route::parse("/settings"), Route::SourcePicker);
        assert_eq!(Route::parse("/viewer/extra?sourceId=1"), Route::SourcePicker);
    }

    #[test]
    fn test_plus_decodes_to_space() {
        let route = Route::parse("/viewer?sourceId=window%3A1&sourceName=My+Window#top");
        assert_eq!(route, Route::viewer("window:1", "My Window"));
    }

    #[test]
    fn test_route_binding_matches_wire_names() {
        let decl = Route::decl();
        assert!(decl.contains("sourceId"), "{}", decl);
        assert!(decl.contains("commentComposer"), "{}", decl);
    }

    #[test]
    fn test_route_wire_format() {
        let json = serde_json::to_value(Route::viewer("window:1", "w")).unwrap();
        assert_eq!(json["route"], "viewer");
        assert_eq!(json["sourceId"], "window:1");
    }
}
