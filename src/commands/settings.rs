//! Settings commands and persistence.
//!
//! The whole `AppConfig` is stored under one key in `settings.json` through
//! `tauri-plugin-store`, and mirrored in `APP_CONFIG` for Rust-side reads.

use serde_json::Value;
use tauri::{command, AppHandle, State};
use tauri_plugin_store::StoreExt;

use crate::app::AppState;
use crate::config::app::replace_app_config;
use crate::config::{AppConfig, APP_CONFIG};
use crate::error::{OverlayError, OverlayResult};

const SETTINGS_FILE: &str = "settings.json";
const CONFIG_KEY: &str = "config";

/// Parse a stored config, falling back to defaults for anything unreadable.
fn config_from_stored(stored: Option<Value>) -> AppConfig {
    match stored {
        Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
            log::warn!("[SETTINGS] Stored config is invalid, using defaults: {}", e);
            AppConfig::default()
        }),
        None => AppConfig::default(),
    }
}

/// Load settings into `APP_CONFIG`. Called once during setup.
pub fn load_settings(app: &AppHandle) -> OverlayResult<AppConfig> {
    let store = app
        .store(SETTINGS_FILE)
        .map_err(|e| OverlayError::ConfigError(format!("Failed to open {}: {}", SETTINGS_FILE, e)))?;

    let mut config = config_from_stored(store.get(CONFIG_KEY));
    config.feed.apply_env_override();
    let config = replace_app_config(config);
    log::info!("[SETTINGS] Loaded settings (feed: {:?})", config.feed.backend);
    Ok(config)
}

fn save_settings(app: &AppHandle, config: &AppConfig) -> OverlayResult<()> {
    let store = app
        .store(SETTINGS_FILE)
        .map_err(|e| OverlayError::ConfigError(format!("Failed to open {}: {}", SETTINGS_FILE, e)))?;
    store.set(CONFIG_KEY, serde_json::to_value(config)?);
    store
        .save()
        .map_err(|e| OverlayError::ConfigError(format!("Failed to save {}: {}", SETTINGS_FILE, e)))
}

#[command]
pub fn get_config() -> AppConfig {
    APP_CONFIG.read().clone()
}

/// Validate, apply and persist a new configuration. Returns what was stored
/// after clamping.
#[command]
pub fn set_config(app: AppHandle, state: State<'_, AppState>, config: AppConfig) -> OverlayResult<AppConfig> {
    let previous = APP_CONFIG.read().clone();
    let config = replace_app_config(config);
    save_settings(&app, &config)?;

    state.reconfigure_feed(config.feed.clone());

    #[cfg(desktop)]
    if let Err(e) = crate::app::shortcut::update_click_through(
        &app,
        &previous.window.click_through_shortcut,
        &config.window.click_through_shortcut,
    ) {
        log::warn!("[SETTINGS] {}", e);
    }

    if previous.window.click_through != config.window.click_through {
        crate::app::apply_click_through(&app, config.window.click_through)?;
    }
    Ok(config)
}
