//! Recording session management
//!
//! This module provides the `SessionOrchestrator` that runs inside the page:
//! - Countdown before capture
//! - Stream acquisition and recorder lifecycle
//! - Pause/resume, stop and finalization
//! - Saving or discarding the finished recording
//! - Overlay state and lifecycle events

mod config;
mod orchestrator;
mod session;
mod settings;
mod sinks;

pub use config::{SessionConfig, COUNTDOWN_TICK, PROGRESS_TICK};
pub use orchestrator::{
    Collaborators, OrchestratorHandle, OverlayAction, OverlayInput, SessionOrchestrator,
};
pub use session::{OverlayState, RecordingSession, SessionSnapshot, SessionStatus};
pub use settings::{
    AudioSource, CaptureSource, MemorySettingsStore, Quality, RecordingMode, Settings,
    SettingsStore,
};
pub use sinks::{
    ArtifactKind, DownloadSink, FileDownloadSink, HistoryEntry, HistoryStore, JsonHistoryStore,
    MemoryHistory,
};
