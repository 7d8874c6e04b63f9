use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::capture::CaptureStream;
use crate::recorder::{RecorderEngine, RecorderState};

/// Status of the page's recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Ready,
    Countdown,
    Recording,
    Paused,
    Processing,
}

/// Overlay UI flags driven by commands
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayState {
    pub visible: bool,
    pub settings_open: bool,
    pub camera_visible: bool,
    pub screenshot_mode: bool,
}

/// Observable view of the orchestrator, published after every transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub countdown_remaining: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_ms: u64,
    pub chunk_count: usize,
    pub artifact_pending: bool,
    pub overlay: OverlayState,
}

impl SessionSnapshot {
    /// Leaving the page now would lose an active recording
    pub fn should_confirm_unload(&self) -> bool {
        self.status == SessionStatus::Recording
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            status: SessionStatus::Ready,
            countdown_remaining: None,
            started_at: None,
            elapsed_ms: 0,
            chunk_count: 0,
            artifact_pending: false,
            overlay: OverlayState::default(),
        }
    }
}

/// The recording aggregate owned by the orchestrator
///
/// Holds the capture stream and the recorder engine (and with it the
/// collected chunks) for the current cycle.
pub struct RecordingSession {
    status: SessionStatus,
    started_at: Option<DateTime<Utc>>,
    started_instant: Option<Instant>,
    elapsed_ms: u64,
    stream: Option<CaptureStream>,
    engine: Option<RecorderEngine>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Ready,
            started_at: None,
            started_instant: None,
            elapsed_ms: 0,
            stream: None,
            engine: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn stream(&self) -> Option<&CaptureStream> {
        self.stream.as_ref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut RecorderEngine> {
        self.engine.as_mut()
    }

    pub fn chunk_count(&self) -> usize {
        self.engine.as_ref().map(RecorderEngine::chunk_count).unwrap_or(0)
    }

    pub(crate) fn enter_countdown(&mut self) {
        self.status = SessionStatus::Countdown;
    }

    pub(crate) fn cancel_countdown(&mut self) {
        if self.status == SessionStatus::Countdown {
            self.status = SessionStatus::Ready;
        }
    }

    /// A started engine and its stream become the active recording
    pub(crate) fn begin(&mut self, stream: CaptureStream, engine: RecorderEngine) {
        self.stream = Some(stream);
        self.engine = Some(engine);
        self.started_at = Some(Utc::now());
        self.started_instant = Some(Instant::now());
        self.elapsed_ms = 0;
        self.status = SessionStatus::Recording;
    }

    /// Mirror the engine state while recording or paused
    pub(crate) fn sync_with_engine(&mut self) {
        let Some(engine) = &self.engine else {
            return;
        };
        match (self.status, engine.state()) {
            (SessionStatus::Recording, RecorderState::Paused) => {
                self.status = SessionStatus::Paused;
            }
            (SessionStatus::Paused, RecorderState::Recording) => {
                self.status = SessionStatus::Recording;
            }
            _ => {}
        }
    }

    pub(crate) fn update_elapsed(&mut self) {
        if let Some(started) = self.started_instant {
            self.elapsed_ms = started.elapsed().as_millis() as u64;
        }
    }

    /// Hand back the stream for release and wait for the engine to finalize
    pub(crate) fn mark_processing(&mut self) -> Option<CaptureStream> {
        self.update_elapsed();
        self.status = SessionStatus::Processing;
        self.stream.take()
    }

    /// Finish the cycle: drop the engine (and its chunks), return any stream
    /// still held so the caller can release it.
    pub(crate) fn finish(&mut self) -> Option<CaptureStream> {
        self.update_elapsed();
        self.engine = None;
        self.started_instant = None;
        self.status = SessionStatus::Ready;
        self.stream.take()
    }

    /// Clear everything from the last cycle
    pub(crate) fn reset(&mut self) {
        self.engine = None;
        self.stream = None;
        self.started_at = None;
        self.started_instant = None;
        self.elapsed_ms = 0;
        self.status = SessionStatus::Ready;
    }
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}
