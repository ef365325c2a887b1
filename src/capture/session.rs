//! Capture session: owns at most one live stream for the viewer.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::oneshot;

use super::backend::CaptureBackend;
use super::track::{MediaStream, VideoTrack};
use super::types::{CaptureError, SessionStatus, SourceId};
use crate::config::CaptureConfig;
use crate::preview::FrameSender;

/// Acquires and releases one video stream bound to a capture source.
///
/// `Idle -> Starting -> Active -> Stopped`, `Starting -> Failed`. A source
/// that disappears forces `Active -> Stopped` with the error kept for the
/// next operation. A new `start` is the only way out of `Failed` or
/// `Stopped`, and it always releases the previous stream first.
pub struct CaptureSession {
    backend: Arc<dyn CaptureBackend>,
    config: CaptureConfig,
    frames: FrameSender,
    source_id: Option<SourceId>,
    stream: Option<MediaStream>,
    status: SessionStatus,
    last_error: Option<CaptureError>,
}

impl CaptureSession {
    pub fn new(backend: Arc<dyn CaptureBackend>, config: CaptureConfig, frames: FrameSender) -> Self {
        Self {
            backend,
            config,
            frames,
            source_id: None,
            stream: None,
            status: SessionStatus::Idle,
            last_error: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[cfg(test)]
    pub fn source_id(&self) -> Option<&SourceId> {
        self.source_id.as_ref()
    }

    #[cfg(test)]
    pub fn last_error(&self) -> Option<&CaptureError> {
        self.last_error.as_ref()
    }

    #[cfg(test)]
    pub fn stream(&self) -> Option<&MediaStream> {
        self.stream.as_ref()
    }

    /// Bind a new stream to `source_id`, replacing any current one.
    pub async fn start(&mut self, source_id: SourceId) -> Result<(), CaptureError> {
        self.release_stream();

        log::info!("[CAPTURE] Starting session for {}", source_id);
        self.status = SessionStatus::Starting;
        self.source_id = Some(source_id.clone());
        self.last_error = None;

        let (ready_tx, ready_rx) = oneshot::channel();
        let mut track = match VideoTrack::spawn(
            Arc::clone(&self.backend),
            source_id.clone(),
            self.config.frame_interval(),
            Arc::clone(&self.frames),
            ready_tx,
        ) {
            Ok(track) => track,
            Err(e) => return Err(self.fail(e)),
        };

        let timeout_ms = u64::from(self.config.start_timeout_ms);
        match tokio::time::timeout(Duration::from_millis(timeout_ms), ready_rx).await {
            Ok(Ok(Ok(()))) => {
                self.stream = Some(MediaStream::new(track));
                self.status = SessionStatus::Active;
                log::info!("[CAPTURE] Session active for {}", source_id);
                Ok(())
            },
            Ok(Ok(Err(e))) => {
                track.stop();
                Err(self.fail(e))
            },
            Ok(Err(_)) => {
                track.stop();
                Err(self.fail(CaptureError::Acquisition("capture thread exited before starting".to_string())))
            },
            Err(_) => {
                track.detach();
                Err(self.fail(CaptureError::Timeout { millis: timeout_ms }))
            },
        }
    }

    /// Stop every track, then drop the stream. No-op without a stream.
    /// Only an active session becomes `Stopped`.
    pub fn stop(&mut self) {
        if !self.release_stream() {
            return;
        }
        let source = self.source_id.as_ref().map(ToString::to_string).unwrap_or_default();
        if self.status == SessionStatus::Active {
            self.status = SessionStatus::Stopped;
            log::info!("[CAPTURE] Session for {} stopped", source);
        } else {
            log::debug!("[CAPTURE] Released stream of {:?} session for {}", self.status, source);
        }
    }

    /// Fail if the stream ended on its own since it started.
    ///
    /// An ended stream is torn down on the spot; the session becomes
    /// `Stopped` and keeps reporting the error until the next `start`.
    pub fn ensure_live(&mut self) -> Result<(), CaptureError> {
        if self.status != SessionStatus::Active {
            return Err(self.last_error.clone().unwrap_or(CaptureError::Inactive));
        }

        if let Some(error) = self.stream.as_ref().and_then(MediaStream::ended_with) {
            log::warn!("[CAPTURE] Stream ended: {}", error);
            self.release_stream();
            self.status = SessionStatus::Stopped;
            self.last_error = Some(error.clone());
            return Err(error);
        }
        Ok(())
    }

    /// Most recent frame of a live session.
    #[cfg(test)]
    pub fn latest_frame(&mut self) -> Result<Option<crate::preview::WSFrame>, CaptureError> {
        self.ensure_live()?;
        Ok(self.frames.borrow().clone())
    }

    /// Record a failed start.
    fn fail(&mut self, error: CaptureError) -> CaptureError {
        log::error!("[CAPTURE] Session failed: {}", error);
        self.status = SessionStatus::Failed;
        self.last_error = Some(error.clone());
        error
    }

    fn release_stream(&mut self) -> bool {
        let Some(mut stream) = self.stream.take() else {
            return false;
        };
        join_tracks(move || {
            stream.stop_all();
            drop(stream);
        });
        self.frames.send_replace(None);
        true
    }
}

/// Run a blocking track join without stalling other tasks on a
/// multi-threaded runtime.
fn join_tracks<F: FnOnce()>(join: F) {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(join)
        },
        _ => join(),
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release_stream();
    }
}
