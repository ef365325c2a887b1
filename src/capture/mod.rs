//! Capture source selection and capture sessions.
//!
//! ## Architecture
//!
//! ```text
//! capture/
//!   backend.rs  - CaptureBackend / FrameGrabber traits (platform seam)
//!   desktop.rs  - xcap implementation (windows + monitors)
//!   registry.rs - CaptureSourceRegistry (async, bounded enumeration)
//!   session.rs  - CaptureSession state machine
//!   track.rs    - MediaStream / VideoTrack (one capture thread per track)
//!   types.rs    - SourceId, CaptureSource, errors
//! ```

pub mod backend;
pub mod desktop;
pub mod registry;
pub mod session;
pub mod track;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use backend::{CaptureBackend, EnumerateOptions, FrameGrabber};
pub use desktop::DesktopBackend;
pub use registry::CaptureSourceRegistry;
pub use session::CaptureSession;
pub use track::{MediaStream, VideoTrack};
pub use types::{CaptureError, CaptureSource, RegistryError, SessionStatus, SourceId, SourceKind};
