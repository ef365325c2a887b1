//! Platform seam for capture.
//!
//! Both calls are blocking. The registry runs `enumerate` on the blocking
//! pool; `open` runs on the video track's own thread, so a grabber never has
//! to cross threads.

use image::RgbaImage;

use super::types::{CaptureError, CaptureSource, RegistryError, SourceId};

/// What to include when listing sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumerateOptions {
    pub thumbnail_width: u32,
    pub include_screens: bool,
}

/// Enumerates and opens capture sources.
pub trait CaptureBackend: Send + Sync + 'static {
    /// Windows first, then screens, in platform order.
    fn enumerate(&self, options: &EnumerateOptions) -> Result<Vec<CaptureSource>, RegistryError>;

    /// Open a source for repeated frame grabs.
    fn open(&self, source: &SourceId) -> Result<Box<dyn FrameGrabber>, CaptureError>;
}

/// Pulls frames from one opened source.
pub trait FrameGrabber {
    /// Grab the current contents of the source.
    ///
    /// `CaptureError::SourceGone` ends the track; other errors are treated as
    /// transient until they repeat.
    fn grab(&mut self) -> Result<RgbaImage, CaptureError>;
}
