use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::*;

#[derive(Default)]
struct FakeWindow {
    calls: Mutex<Vec<String>>,
    pointer_moves: Mutex<Vec<PointerPosition>>,
}

impl FakeWindow {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) -> OverlayResult<()> {
        self.calls.lock().push(call);
        Ok(())
    }

    fn moves(&self) -> Vec<PointerPosition> {
        self.pointer_moves.lock().clone()
    }
}

impl OverlayWindow for FakeWindow {
    fn set_decorations(&self, decorations: bool) -> OverlayResult<()> {
        self.record(format!("decorations={}", decorations))
    }

    fn set_always_on_top(&self, always_on_top: bool) -> OverlayResult<()> {
        self.record(format!("always_on_top={}", always_on_top))
    }

    fn set_visible_on_all_workspaces(&self, visible: bool) -> OverlayResult<()> {
        self.record(format!("all_workspaces={}", visible))
    }

    fn set_shadow(&self, shadow: bool) -> OverlayResult<()> {
        self.record(format!("shadow={}", shadow))
    }

    fn set_resizable(&self, resizable: bool) -> OverlayResult<()> {
        self.record(format!("resizable={}", resizable))
    }

    fn set_ignore_cursor_events(&self, ignore: bool) -> OverlayResult<()> {
        self.record(format!("ignore_cursor={}", ignore))
    }

    fn pin_topmost(&self) -> OverlayResult<()> {
        self.record("topmost".to_string())
    }

    fn show(&self) -> OverlayResult<()> {
        self.record("show".to_string())
    }

    fn inner_origin(&self) -> OverlayResult<(i32, i32)> {
        Ok((100, 50))
    }

    fn scale_factor(&self) -> OverlayResult<f64> {
        Ok(2.0)
    }

    fn emit_pointer(&self, position: PointerPosition) -> OverlayResult<()> {
        self.pointer_moves.lock().push(position);
        Ok(())
    }
}

/// Cursor whose position the test moves by hand.
struct ScriptedCursor(Arc<Mutex<(i32, i32)>>);

impl CursorSource for ScriptedCursor {
    fn position(&mut self) -> (i32, i32) {
        *self.0.lock()
    }
}

fn controller(config: WindowConfig) -> (Arc<FakeWindow>, Arc<Mutex<(i32, i32)>>, WindowInputController) {
    let window = Arc::new(FakeWindow::default());
    let cursor = Arc::new(Mutex::new((100, 50)));
    let factory_cursor = Arc::clone(&cursor);
    let factory: CursorFactory =
        Arc::new(move || Box::new(ScriptedCursor(Arc::clone(&factory_cursor))) as Box<dyn CursorSource>);
    let window_dyn: Arc<dyn OverlayWindow> = window.clone();
    let controller = WindowInputController::with_cursor(window_dyn, config, factory);
    (window, cursor, controller)
}

fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    check()
}

#[test]
fn test_apply_sets_every_flag_then_shows() {
    let (window, _cursor, mut controller) = controller(WindowConfig::default());
    controller.apply().unwrap();

    let calls = window.calls();
    for expected in [
        "decorations=false",
        "shadow=false",
        "resizable=false",
        "always_on_top=true",
        "all_workspaces=true",
        "topmost",
        "ignore_cursor=true",
    ] {
        assert!(calls.contains(&expected.to_string()), "missing {}", expected);
    }
    assert_eq!(calls.last().map(String::as_str), Some("show"));
    assert!(controller.click_through());
    assert!(controller.is_forwarding());
}

#[test]
fn test_not_on_top_skips_topmost() {
    let config = WindowConfig {
        always_on_top: false,
        ..WindowConfig::default()
    };
    let (window, _cursor, mut controller) = controller(config);
    controller.apply().unwrap();

    let calls = window.calls();
    assert!(calls.contains(&"always_on_top=false".to_string()));
    assert!(!calls.contains(&"topmost".to_string()));
}

#[test]
fn test_toggle_click_through_starts_and_stops_forwarding() {
    let (window, _cursor, mut controller) = controller(WindowConfig::default());
    assert!(!controller.is_forwarding());

    assert!(controller.toggle_click_through().unwrap());
    assert!(controller.is_forwarding());

    assert!(!controller.toggle_click_through().unwrap());
    assert!(!controller.is_forwarding());
    assert_eq!(window.calls(), vec!["ignore_cursor=true", "ignore_cursor=false"]);
}

#[test]
fn test_forwarding_can_be_disabled() {
    let config = WindowConfig {
        forward_pointer_moves: false,
        ..WindowConfig::default()
    };
    let (_window, _cursor, mut controller) = controller(config);
    controller.set_click_through(true).unwrap();
    assert!(controller.click_through());
    assert!(!controller.is_forwarding());
}

#[test]
fn test_forwarded_moves_are_window_relative_and_deduplicated() {
    let (window, cursor, mut controller) = controller(WindowConfig::default());
    controller.set_click_through(true).unwrap();

    assert!(wait_until(|| window.moves().len() == 1));
    assert_eq!(window.moves()[0], PointerPosition { x: 0.0, y: 0.0 });

    // Unchanged cursor emits nothing new.
    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(window.moves().len(), 1);

    *cursor.lock() = (300, 250);
    assert!(wait_until(|| window.moves().len() == 2));
    assert_eq!(window.moves()[1], PointerPosition { x: 100.0, y: 100.0 });

    controller.set_click_through(false).unwrap();
    *cursor.lock() = (500, 500);
    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(window.moves().len(), 2);
}

#[test]
fn test_drop_stops_watcher() {
    let (window, cursor, mut controller) = controller(WindowConfig::default());
    controller.set_click_through(true).unwrap();
    assert!(wait_until(|| !window.moves().is_empty()));
    drop(controller);

    let before = window.moves().len();
    *cursor.lock() = (999, 999);
    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(window.moves().len(), before);
}

#[test]
fn test_relative_position_handles_bad_scale() {
    let position = PointerPosition::relative_to((10, 20), (0, 0), 0.0);
    assert_eq!(position, PointerPosition { x: 10.0, y: 20.0 });
}
