//! Desktop capture backend using xcap.
//!
//! Lists top-level windows and monitors with PNG thumbnails and grabs frames
//! from the picked one.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine};
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use xcap::{Monitor, Window};

use super::backend::{CaptureBackend, EnumerateOptions, FrameGrabber};
use super::types::{
    is_permission_error, CaptureError, CaptureSource, RegistryError, SourceId, SourceKind,
};

/// Windows smaller than this in either dimension are not offered.
const MIN_WINDOW_SIZE: u32 = 50;

/// Bounding box of all monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScreenBounds {
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
}

impl ScreenBounds {
    fn of(monitors: &[Monitor]) -> Self {
        let mut bounds = Self {
            min_x: 0,
            min_y: 0,
            max_x: 3840,
            max_y: 2160,
        };
        for monitor in monitors {
            let mx = monitor.x().unwrap_or(0);
            let my = monitor.y().unwrap_or(0);
            let mw = monitor.width().unwrap_or(1920) as i32;
            let mh = monitor.height().unwrap_or(1080) as i32;
            bounds.min_x = bounds.min_x.min(mx);
            bounds.min_y = bounds.min_y.min(my);
            bounds.max_x = bounds.max_x.max(mx + mw);
            bounds.max_y = bounds.max_y.max(my + mh);
        }
        bounds
    }

    fn intersects(&self, x: i32, y: i32, width: u32, height: u32) -> bool {
        let right = x + width as i32;
        let bottom = y + height as i32;
        !(right < self.min_x || x > self.max_x || bottom < self.min_y || y > self.max_y)
    }
}

/// Properties of a window relevant to listing it.
#[derive(Debug, Clone, Default)]
struct WindowProps {
    title: String,
    app_name: String,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    minimized: bool,
    own_process: bool,
}

impl WindowProps {
    fn read(window: &Window) -> Self {
        Self {
            title: window.title().unwrap_or_default(),
            app_name: window.app_name().unwrap_or_default(),
            x: window.x().unwrap_or(0),
            y: window.y().unwrap_or(0),
            width: window.width().unwrap_or(0),
            height: window.height().unwrap_or(0),
            minimized: window.is_minimized().unwrap_or(true),
            own_process: window.pid().map(|pid| pid == std::process::id()).unwrap_or(false),
        }
    }
}

/// Shell surfaces that show up as top-level windows but are not content.
fn is_shell_surface(app_name: &str, title: &str) -> bool {
    let app = app_name.to_lowercase();
    let title = title.to_lowercase();

    if app == "explorer.exe" || app == "explorer" {
        return title == "program manager" || title == "start";
    }
    if app == "dock" || app == "window server" || app == "windowserver" {
        return true;
    }

    [
        "applicationframehost",
        "textinputhost",
        "searchhost",
        "searchui",
        "shellexperiencehost",
        "lockapp",
        "widgets",
    ]
    .iter()
    .any(|shell| app.contains(shell))
}

fn is_listable(props: &WindowProps, bounds: &ScreenBounds) -> bool {
    !props.minimized
        && !props.own_process
        && !props.title.trim().is_empty()
        && props.width >= MIN_WINDOW_SIZE
        && props.height >= MIN_WINDOW_SIZE
        && bounds.intersects(props.x, props.y, props.width, props.height)
        && !is_shell_surface(&props.app_name, &props.title)
}

/// Downscale to `width` (keeping aspect ratio) and encode as a PNG data URL.
pub(crate) fn thumbnail_data_url(image: RgbaImage, width: u32) -> Result<String, image::ImageError> {
    let dynamic = DynamicImage::ImageRgba8(image);
    let thumb = if dynamic.width() > width && dynamic.width() > 0 {
        let height = ((u64::from(dynamic.height()) * u64::from(width)) / u64::from(dynamic.width())).max(1);
        dynamic.resize_exact(width, height as u32, FilterType::Triangle)
    } else {
        dynamic
    };

    let mut buffer = Cursor::new(Vec::new());
    thumb.write_to(&mut buffer, image::ImageFormat::Png)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(buffer.get_ref())))
}

/// Thumbnail failures leave the thumbnail empty instead of failing the listing.
fn thumbnail_or_empty(grab: xcap::XCapResult<RgbaImage>, width: u32, label: &str) -> String {
    match grab {
        Ok(image) => thumbnail_data_url(image, width).unwrap_or_else(|e| {
            log::debug!("[DESKTOP] Thumbnail encode failed for {}: {}", label, e);
            String::new()
        }),
        Err(e) => {
            log::debug!("[DESKTOP] Thumbnail grab failed for {}: {}", label, e);
            String::new()
        },
    }
}

fn registry_error(context: &str, err: xcap::XCapError) -> RegistryError {
    let message = err.to_string();
    if is_permission_error(&message) {
        RegistryError::PermissionDenied
    } else {
        RegistryError::Enumeration(format!("{}: {}", context, message))
    }
}

fn capture_error(err: xcap::XCapError) -> CaptureError {
    let message = err.to_string();
    if is_permission_error(&message) {
        CaptureError::PermissionDenied
    } else {
        CaptureError::Acquisition(message)
    }
}

/// xcap-backed implementation of `CaptureBackend`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopBackend;

impl DesktopBackend {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureBackend for DesktopBackend {
    fn enumerate(&self, options: &EnumerateOptions) -> Result<Vec<CaptureSource>, RegistryError> {
        let monitors = Monitor::all().map_err(|e| registry_error("Failed to get monitors", e))?;
        let windows = Window::all().map_err(|e| registry_error("Failed to get windows", e))?;
        let bounds = ScreenBounds::of(&monitors);

        let mut sources = Vec::new();
        for window in &windows {
            let props = WindowProps::read(window);
            if !is_listable(&props, &bounds) {
                continue;
            }
            let Ok(id) = window.id() else {
                continue;
            };
            let id = SourceId::window(id);
            let thumbnail = thumbnail_or_empty(window.capture_image(), options.thumbnail_width, &id.to_string());
            sources.push(CaptureSource {
                id,
                name: props.title,
                thumbnail,
                kind: SourceKind::Window,
            });
        }

        if options.include_screens {
            for (idx, monitor) in monitors.iter().enumerate() {
                let Ok(id) = monitor.id() else {
                    continue;
                };
                let id = SourceId::screen(id);
                let name = match monitor.name() {
                    Ok(name) if !name.trim().is_empty() => name,
                    _ => format!("Screen {}", idx + 1),
                };
                let thumbnail = thumbnail_or_empty(monitor.capture_image(), options.thumbnail_width, &id.to_string());
                sources.push(CaptureSource {
                    id,
                    name,
                    thumbnail,
                    kind: SourceKind::Screen,
                });
            }
        }

        log::debug!(
            "[DESKTOP] Enumerated {} sources ({} windows, {} monitors scanned)",
            sources.len(),
            windows.len(),
            monitors.len()
        );
        Ok(sources)
    }

    fn open(&self, source: &SourceId) -> Result<Box<dyn FrameGrabber>, CaptureError> {
        match source.kind() {
            SourceKind::Window => {
                let window = find_window(source.native())?
                    .ok_or_else(|| CaptureError::SourceGone(source.to_string()))?;
                Ok(Box::new(WindowGrabber {
                    id: source.clone(),
                    window,
                }))
            },
            SourceKind::Screen => {
                let monitor = find_monitor(source.native())?
                    .ok_or_else(|| CaptureError::SourceGone(source.to_string()))?;
                Ok(Box::new(ScreenGrabber {
                    id: source.clone(),
                    monitor,
                }))
            },
        }
    }
}

fn find_window(native: u32) -> Result<Option<Window>, CaptureError> {
    let windows = Window::all().map_err(capture_error)?;
    Ok(windows.into_iter().find(|w| w.id().map(|id| id == native).unwrap_or(false)))
}

fn find_monitor(native: u32) -> Result<Option<Monitor>, CaptureError> {
    let monitors = Monitor::all().map_err(capture_error)?;
    Ok(monitors.into_iter().find(|m| m.id().map(|id| id == native).unwrap_or(false)))
}

struct WindowGrabber {
    id: SourceId,
    window: Window,
}

impl FrameGrabber for WindowGrabber {
    fn grab(&mut self) -> Result<RgbaImage, CaptureError> {
        match self.window.capture_image() {
            Ok(image) => Ok(image),
            Err(e) => {
                // A failed grab is only fatal once the window is really gone.
                if find_window(self.id.native())?.is_none() {
                    return Err(CaptureError::SourceGone(self.id.to_string()));
                }
                if self.window.is_minimized().unwrap_or(false) {
                    return Err(CaptureError::Acquisition("window is minimized".to_string()));
                }
                Err(capture_error(e))
            },
        }
    }
}

struct ScreenGrabber {
    id: SourceId,
    monitor: Monitor,
}

impl FrameGrabber for ScreenGrabber {
    fn grab(&mut self) -> Result<RgbaImage, CaptureError> {
        match self.monitor.capture_image() {
            Ok(image) => Ok(image),
            Err(e) => {
                if find_monitor(self.id.native())?.is_none() {
                    return Err(CaptureError::SourceGone(self.id.to_string()));
                }
                Err(capture_error(e))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(title: &str, app: &str) -> WindowProps {
        WindowProps {
            title: title.to_string(),
            app_name: app.to_string(),
            x: 100,
            y: 100,
            width: 800,
            height: 600,
            minimized: false,
            own_process: false,
        }
    }

    fn bounds() -> ScreenBounds {
        ScreenBounds {
            min_x: 0,
            min_y: 0,
            max_x: 1920,
            max_y: 1080,
        }
    }

    #[test]
    fn test_regular_window_is_listed() {
        assert!(is_listable(&props("Slides - Deck", "powerpnt.exe"), &bounds()));
    }

    #[test]
    fn test_filters_untitled_tiny_and_minimized() {
        assert!(!is_listable(&props("  ", "app"), &bounds()));

        let mut tiny = props("Tooltip", "app");
        tiny.height = 20;
        assert!(!is_listable(&tiny, &bounds()));

        let mut minimized = props("Editor", "code");
        minimized.minimized = true;
        assert!(!is_listable(&minimized, &bounds()));
    }

    #[test]
    fn test_filters_own_process_and_offscreen() {
        let mut own = props("Comment Overlay", "comment-overlay");
        own.own_process = true;
        assert!(!is_listable(&own, &bounds()));

        let mut offscreen = props("Hidden", "app");
        offscreen.x = -5000;
        assert!(!is_listable(&offscreen, &bounds()));
    }

    #[test]
    fn test_shell_surfaces() {
        assert!(is_shell_surface("explorer.exe", "Program Manager"));
        assert!(is_shell_surface("SearchHost.exe", "Search"));
        assert!(is_shell_surface("Dock", "Dock"));
        assert!(!is_shell_surface("explorer.exe", "Downloads"));
        assert!(!is_shell_surface("firefox", "Mozilla Firefox"));
    }

    #[test]
    fn test_thumbnail_data_url_downscales() {
        let image = RgbaImage::from_pixel(640, 480, image::Rgba([10, 20, 30, 255]));
        let url = thumbnail_data_url(image, 320).unwrap();
        let encoded = url.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = STANDARD.decode(encoded).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (320, 240));
    }

    #[test]
    fn test_thumbnail_keeps_small_images() {
        let image = RgbaImage::from_pixel(100, 50, image::Rgba([0, 0, 0, 255]));
        let url = thumbnail_data_url(image, 320).unwrap();
        let bytes = STANDARD
            .decode(url.trim_start_matches("data:image/png;base64,"))
            .unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 100);
    }
}
