use std::sync::Arc;

use tauri::Manager;

mod app;
mod capture;
mod commands;
mod comments;
mod config;
mod error;
mod feed;
mod logging;
mod navigation;
mod overlay;
mod preview;
mod viewer;
mod window;

use app::windows::create_overlay_window;
use app::AppState;
use capture::DesktopBackend;
use window::WindowInputController;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    logging::init();

    let mut builder = tauri::Builder::default();

    #[cfg(desktop)]
    {
        builder = builder.plugin(tauri_plugin_single_instance::init(|app, _args, _cwd| {
            if let Some(window) = app.get_webview_window(app::windows::OVERLAY_LABEL) {
                let _ = window.show();
                let _ = window.set_focus();
            }
        }));
    }

    builder = builder
        .plugin(tauri_plugin_store::Builder::default().build())
        .plugin(tauri_plugin_opener::init());

    #[cfg(desktop)]
    {
        builder = builder.plugin(tauri_plugin_global_shortcut::Builder::new().build());
    }

    builder
        .on_window_event(app::events::handle_window_event)
        .invoke_handler(tauri::generate_handler![
            // Picker + viewer
            commands::viewer::list_sources,
            commands::viewer::picker_styles,
            commands::viewer::open_viewer,
            commands::viewer::close_viewer,
            commands::viewer::viewer_status,
            commands::navigation::resolve_route,
            // Composer
            commands::comments::post_comment,
            // Overlay input
            commands::input::set_click_through,
            // Settings
            commands::settings::get_config,
            commands::settings::set_config,
            // Logging
            logging::write_log,
            logging::get_log_dir,
        ])
        .setup(|app| {
            let handle = app.handle().clone();

            if let Err(e) = logging::init_file_logging(&handle) {
                log::warn!("[APP] File logging disabled: {}", e);
            }

            let config = commands::settings::load_settings(&handle).unwrap_or_else(|e| {
                log::warn!("[APP] Using default settings: {}", e);
                config::app::replace_app_config(config::AppConfig::default())
            });

            let frames = preview::frame_channel();
            let frame_server = match tauri::async_runtime::block_on(preview::FrameServer::start(&frames)) {
                Ok(server) => Some(server),
                Err(e) => {
                    log::error!("[APP] Frame server failed to start: {}", e);
                    None
                },
            };

            app.manage(AppState::new(
                Arc::new(DesktopBackend::new()),
                frames,
                frame_server,
                config.feed.clone(),
            ));

            let overlay = create_overlay_window(&handle, &config.window)?;
            let mut controller = WindowInputController::new(Arc::new(overlay), config.window.clone());
            controller.apply()?;
            app.state::<AppState>().set_input_controller(controller);

            #[cfg(desktop)]
            {
                app::tray::init(app, config.window.click_through)?;
                if let Err(e) =
                    app::shortcut::register_click_through(&handle, &config.window.click_through_shortcut)
                {
                    log::warn!("[APP] {}", e);
                }
            }

            log::info!("[APP] Comment overlay ready");
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
