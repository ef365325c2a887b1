//! Media stream and video track.
//!
//! A `VideoTrack` owns one capture thread. The thread opens the source
//! through the backend, reports readiness once, then grabs frames at a fixed
//! interval into the shared frame channel until it is told to stop or the
//! source disappears.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::backend::CaptureBackend;
use super::types::{CaptureError, SourceId};
use crate::preview::{FrameSender, WSFrame};

/// Consecutive transient grab failures tolerated before the track ends.
const MAX_CONSECUTIVE_FAILURES: u32 = 30;

/// State shared between a track handle and its thread.
#[derive(Default)]
struct TrackShared {
    ended_with: Mutex<Option<CaptureError>>,
}

impl TrackShared {
    fn fail(&self, error: CaptureError) {
        *self.ended_with.lock() = Some(error);
    }
}

/// One video track bound to a capture source.
pub struct VideoTrack {
    id: String,
    source_id: SourceId,
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
    shared: Arc<TrackShared>,
}

impl VideoTrack {
    /// Spawn the capture thread. `ready` receives the outcome of opening the
    /// source.
    pub(crate) fn spawn(
        backend: Arc<dyn CaptureBackend>,
        source_id: SourceId,
        interval: Duration,
        frames: FrameSender,
        ready: oneshot::Sender<Result<(), CaptureError>>,
    ) -> Result<Self, CaptureError> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let shared = Arc::new(TrackShared::default());
        let id = uuid::Uuid::new_v4().to_string();

        let thread = {
            let shared = Arc::clone(&shared);
            let source_id = source_id.clone();
            std::thread::Builder::new()
                .name(format!("capture-{}", source_id))
                .spawn(move || {
                    let mut grabber = match backend.open(&source_id) {
                        Ok(grabber) => grabber,
                        Err(e) => {
                            log::warn!("[TRACK] Failed to open {}: {}", source_id, e);
                            shared.fail(e.clone());
                            let _ = ready.send(Err(e));
                            return;
                        },
                    };
                    if ready.send(Ok(())).is_err() {
                        // Start was abandoned (timed out) while opening.
                        return;
                    }

                    let started = Instant::now();
                    let mut next_grab = started;
                    let mut failures = 0u32;
                    let mut frame_number = 0u32;

                    loop {
                        match stop_rx.recv_timeout(next_grab.saturating_duration_since(Instant::now())) {
                            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                            Err(RecvTimeoutError::Timeout) => {},
                        }
                        next_grab += interval;
                        let now = Instant::now();
                        if next_grab < now {
                            next_grab = now + interval;
                        }

                        match grabber.grab() {
                            Ok(image) => {
                                failures = 0;
                                let elapsed = started.elapsed().as_nanos() as u64;
                                frames.send_replace(Some(WSFrame::from_image(image, frame_number, elapsed)));
                                frame_number = frame_number.wrapping_add(1);
                            },
                            Err(e @ CaptureError::SourceGone(_)) => {
                                log::warn!("[TRACK] {}", e);
                                shared.fail(e);
                                break;
                            },
                            Err(e) => {
                                failures += 1;
                                log::debug!("[TRACK] Grab failed ({}x): {}", failures, e);
                                if failures >= MAX_CONSECUTIVE_FAILURES {
                                    log::warn!("[TRACK] Giving up on {}: {}", source_id, e);
                                    shared.fail(e);
                                    break;
                                }
                            },
                        }
                    }

                    log::debug!("[TRACK] Capture thread for {} exited", source_id);
                })
                .map_err(|e| CaptureError::Acquisition(format!("Failed to spawn capture thread: {}", e)))?
        };

        Ok(Self {
            id,
            source_id,
            stop_tx: Some(stop_tx),
            thread: Some(thread),
            shared,
        })
    }

    /// Why the track ended on its own, if it did.
    pub fn ended_with(&self) -> Option<CaptureError> {
        self.shared.ended_with.lock().clone()
    }

    /// Signal the thread and wait for it to exit. Idempotent.
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.try_send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("[TRACK] Capture thread for {} panicked", self.source_id);
            }
            log::debug!("[TRACK] Track {} stopped", self.id);
        }
    }

    /// Signal the thread without waiting. Used when the thread may still be
    /// blocked opening the source; it exits as soon as that returns.
    pub(crate) fn detach(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.try_send(());
        }
        self.thread.take();
    }
}

impl Drop for VideoTrack {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The stream a session holds: exactly one video track.
pub struct MediaStream {
    tracks: Vec<VideoTrack>,
}

impl MediaStream {
    pub fn new(track: VideoTrack) -> Self {
        log::debug!("[TRACK] Stream holds track {}", track.id);
        Self { tracks: vec![track] }
    }

    #[cfg(test)]
    pub fn tracks(&self) -> &[VideoTrack] {
        &self.tracks
    }

    /// First error a track ended with.
    pub fn ended_with(&self) -> Option<CaptureError> {
        self.tracks.iter().find_map(VideoTrack::ended_with)
    }

    /// Stop every track. Idempotent.
    pub fn stop_all(&mut self) {
        for track in &mut self.tracks {
            track.stop();
        }
    }
}

impl Drop for MediaStream {
    fn drop(&mut self) {
        self.stop_all();
    }
}
