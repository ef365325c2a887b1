//! Scriptable capture backend for tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use parking_lot::Mutex;

use super::backend::{CaptureBackend, EnumerateOptions, FrameGrabber};
use super::types::{CaptureError, CaptureSource, RegistryError, SourceId, SourceKind};

#[derive(Default)]
struct FakeState {
    listing: Option<Result<Vec<CaptureSource>, RegistryError>>,
    alive: HashSet<SourceId>,
    open_error: Option<CaptureError>,
    open_delay: Duration,
    enumerate_delay: Duration,
}

#[derive(Default)]
struct FakeInner {
    state: Mutex<FakeState>,
    opened: AtomicUsize,
    live_grabbers: AtomicUsize,
}

/// Windows and screens that exist only in memory.
#[derive(Clone, Default)]
pub(crate) struct FakeBackend {
    inner: Arc<FakeInner>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend exposing one window per id.
    pub fn with_windows(ids: &[u32]) -> Self {
        let backend = Self::new();
        for &id in ids {
            backend.add_source(SourceId::window(id), &format!("Window {}", id));
        }
        backend
    }

    pub fn add_source(&self, id: SourceId, name: &str) {
        let mut state = self.inner.state.lock();
        state.alive.insert(id.clone());
        let source = CaptureSource {
            kind: id.kind(),
            id,
            name: name.to_string(),
            thumbnail: String::new(),
        };
        if let Ok(list) = state.listing.get_or_insert_with(|| Ok(Vec::new())) {
            list.push(source);
        }
    }

    /// Make the next enumerations return `listing`.
    pub fn set_listing(&self, listing: Result<Vec<CaptureSource>, RegistryError>) {
        self.inner.state.lock().listing = Some(listing);
    }

    /// Simulate the window or screen going away.
    pub fn close(&self, id: &SourceId) {
        self.inner.state.lock().alive.remove(id);
    }

    pub fn fail_open(&self, error: CaptureError) {
        self.inner.state.lock().open_error = Some(error);
    }

    pub fn delay_open(&self, delay: Duration) {
        self.inner.state.lock().open_delay = delay;
    }

    pub fn delay_enumerate(&self, delay: Duration) {
        self.inner.state.lock().enumerate_delay = delay;
    }

    pub fn opened(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    /// Grabbers that have been opened and not yet dropped.
    pub fn live_grabbers(&self) -> usize {
        self.inner.live_grabbers.load(Ordering::SeqCst)
    }
}

impl CaptureBackend for FakeBackend {
    fn enumerate(&self, options: &EnumerateOptions) -> Result<Vec<CaptureSource>, RegistryError> {
        let (delay, listing) = {
            let state = self.inner.state.lock();
            (state.enumerate_delay, state.listing.clone())
        };
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        let mut sources = listing.unwrap_or_else(|| Ok(Vec::new()))?;
        if !options.include_screens {
            sources.retain(|s| s.kind != SourceKind::Screen);
        }
        Ok(sources)
    }

    fn open(&self, source: &SourceId) -> Result<Box<dyn FrameGrabber>, CaptureError> {
        let (delay, error, alive) = {
            let state = self.inner.state.lock();
            (state.open_delay, state.open_error.clone(), state.alive.contains(source))
        };
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        if let Some(error) = error {
            return Err(error);
        }
        if !alive {
            return Err(CaptureError::SourceGone(source.to_string()));
        }

        self.inner.opened.fetch_add(1, Ordering::SeqCst);
        self.inner.live_grabbers.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeGrabber {
            id: source.clone(),
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct FakeGrabber {
    id: SourceId,
    inner: Arc<FakeInner>,
}

impl FrameGrabber for FakeGrabber {
    fn grab(&mut self) -> Result<RgbaImage, CaptureError> {
        if !self.inner.state.lock().alive.contains(&self.id) {
            return Err(CaptureError::SourceGone(self.id.to_string()));
        }
        Ok(RgbaImage::from_pixel(8, 6, image::Rgba([40, 40, 40, 255])))
    }
}

impl Drop for FakeGrabber {
    fn drop(&mut self) {
        self.inner.live_grabbers.fetch_sub(1, Ordering::SeqCst);
    }
}
