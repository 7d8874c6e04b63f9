use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::capture::CaptureStream;
use crate::error::HostError;

/// Constraints for a display capture request (`getDisplayMedia`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayConstraints {
    pub video: bool,
    pub audio: bool,
}

/// Constraints for a camera request (`getUserMedia`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraConstraints {
    /// Pin an exact camera, otherwise the default camera is used
    pub device_id: Option<String>,
    pub audio: bool,
}

/// A video input device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraDevice {
    pub device_id: String,
    pub label: String,
}

/// Media device access provided by the page context
///
/// Requests may suspend on a platform permission prompt. A dismissed prompt
/// is reported as [`HostError::PermissionDenied`].
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn get_display_media(
        &self,
        constraints: &DisplayConstraints,
    ) -> Result<CaptureStream, HostError>;

    async fn get_user_media(
        &self,
        constraints: &CameraConstraints,
    ) -> Result<CaptureStream, HostError>;

    /// Video input devices currently attached
    async fn enumerate_cameras(&self) -> Result<Vec<CameraDevice>, HostError>;
}

/// Platform media encoder (`MediaRecorder`)
///
/// `start` returns a receiver of encoded fragments emitted every `timeslice`.
/// `stop` requests a flush and returns without waiting for the consumer; the
/// receiver closes after the final fragment has been delivered.
#[async_trait]
pub trait MediaEncoder: Send + Sync {
    async fn start(
        &mut self,
        stream: &CaptureStream,
        mime_type: &str,
        timeslice: Duration,
    ) -> Result<mpsc::Receiver<Vec<u8>>, HostError>;

    fn pause(&mut self);

    fn resume(&mut self);

    async fn stop(&mut self) -> Result<(), HostError>;

    /// Encoder name for logging
    fn name(&self) -> &str;
}

/// Creates one encoder per recording
pub trait EncoderFactory: Send + Sync {
    fn create(&self) -> Box<dyn MediaEncoder>;
}
