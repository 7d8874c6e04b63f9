pub mod capture;
pub mod command;
pub mod config;
pub mod error;
pub mod host;
pub mod recorder;
pub mod router;
pub mod session;

pub use capture::{CaptureKind, CaptureStream, MediaTrack, StreamAcquisition, TrackKind};
pub use command::{Command, OverlayEvent, OverlayReason, PopupRequest, RuntimeMessage, Shortcut};
pub use config::Config;
pub use error::{Error, HostError, Result};
pub use host::{SimulatedBrowser, SimulatedEncoder};
pub use recorder::{Artifact, RecorderEngine, RecorderOptions, RecorderState};
pub use router::{Background, ControlPlaneRouter, Origin, RelayReport, RouterConfig};
pub use session::{
    Collaborators, OrchestratorHandle, OverlayAction, RecordingMode, SessionConfig,
    SessionOrchestrator, SessionSnapshot, SessionStatus, Settings,
};
