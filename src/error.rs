//! Error types
//!
//! Domain errors for capture, recording and command delivery. Host
//! primitives report failures with [`HostError`]; the components map those
//! into [`Error`] variants.

use thiserror::Error;

/// Failure reported by a host primitive (messaging, injection, media, ...)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("no receiver registered in tab {0}")]
    NoReceiver(u32),

    #[error("timed out after {0}ms")]
    Timeout(u64),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("platform error: {0}")]
    Platform(String),
}

/// Errors produced by the recording and control-plane subsystems
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The user dismissed the capture picker or permission prompt
    #[error("capture permission denied: {0}")]
    AcquisitionDenied(String),

    /// The platform failed to provide a capture stream
    #[error("capture failed: {0}")]
    Acquisition(String),

    /// The recorder could not be started
    #[error("recorder error: {0}")]
    Engine(String),

    /// Every delivery attempt and fallback was exhausted
    #[error("could not deliver {command} to tab {tab}")]
    DeliveryFailure { command: String, tab: u32 },

    /// One injection fallback step failed
    #[error("injection step '{step}' failed: {reason}")]
    InjectionFailure { step: &'static str, reason: String },

    /// No focused tab to deliver to
    #[error("no active tab")]
    NoActiveTab,
}

impl Error {
    /// Map a media-device failure into the acquisition taxonomy
    pub fn from_acquisition(err: HostError) -> Self {
        match err {
            HostError::PermissionDenied(reason) => Error::AcquisitionDenied(reason),
            other => Error::Acquisition(other.to_string()),
        }
    }
}

/// Result type alias using the domain [`Error`]
pub type Result<T> = std::result::Result<T, Error>;
