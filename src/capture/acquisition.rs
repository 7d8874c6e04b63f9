use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::stream::CaptureStream;
use crate::error::{Error, Result};
use crate::host::{CameraConstraints, CameraDevice, DisplayConstraints, MediaDevices};

/// What the user intends to share. Advisory only: the display request is
/// the same for every kind and the platform picker decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureKind {
    Screen,
    Window,
    Tab,
}

/// Obtains capture streams from the page's media devices
#[derive(Clone)]
pub struct StreamAcquisition {
    devices: Arc<dyn MediaDevices>,
}

impl StreamAcquisition {
    pub fn new(devices: Arc<dyn MediaDevices>) -> Self {
        Self { devices }
    }

    /// Request a display stream with video and audio
    pub async fn acquire_display(&self, kind: CaptureKind) -> Result<CaptureStream> {
        info!("Requesting display capture ({:?})", kind);

        let constraints = DisplayConstraints {
            video: true,
            audio: true,
        };

        let stream = self
            .devices
            .get_display_media(&constraints)
            .await
            .map_err(Error::from_acquisition)?;

        info!(
            "Display capture granted: {} ({} tracks)",
            stream.id(),
            stream.tracks().len()
        );
        Ok(stream)
    }

    /// Request a camera-only stream, optionally pinned to `device_id`
    pub async fn acquire_camera(&self, device_id: Option<&str>) -> Result<CaptureStream> {
        info!("Requesting camera capture (device: {})", device_id.unwrap_or("default"));

        let constraints = CameraConstraints {
            device_id: device_id.map(str::to_string),
            audio: false,
        };

        let stream = self
            .devices
            .get_user_media(&constraints)
            .await
            .map_err(Error::from_acquisition)?;

        info!("Camera capture granted: {}", stream.id());
        Ok(stream)
    }

    /// Stop every track of `stream`. Safe on an already stopped stream.
    pub fn release(&self, stream: &CaptureStream) {
        if stream.is_active() {
            info!("Releasing capture stream {}", stream.id());
        }
        stream.stop_all();
    }

    /// Attached cameras; empty when enumeration fails
    pub async fn list_cameras(&self) -> Vec<CameraDevice> {
        match self.devices.enumerate_cameras().await {
            Ok(devices) => devices
                .into_iter()
                .map(|d| CameraDevice {
                    label: if d.label.is_empty() {
                        "Camera".to_string()
                    } else {
                        d.label
                    },
                    device_id: d.device_id,
                })
                .collect(),
            Err(e) => {
                warn!("Failed to enumerate cameras: {}", e);
                Vec::new()
            }
        }
    }
}
