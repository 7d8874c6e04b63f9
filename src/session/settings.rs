use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::capture::CaptureKind;

/// What a recording start captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingMode {
    Screen,
    Window,
    Tab,
    Camera,
    Screenshot,
}

impl RecordingMode {
    /// Display capture kind for display-based modes
    pub fn capture_kind(self) -> Option<CaptureKind> {
        match self {
            RecordingMode::Screen => Some(CaptureKind::Screen),
            RecordingMode::Window => Some(CaptureKind::Window),
            RecordingMode::Tab => Some(CaptureKind::Tab),
            RecordingMode::Camera | RecordingMode::Screenshot => None,
        }
    }
}

/// Preferred capture source shown in the settings panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    Screen,
    Window,
    Tab,
    Application,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// 1080p / 60fps
    High,
    /// 720p / 30fps
    Medium,
    /// 480p / 24fps
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioSource {
    System,
    Microphone,
    Both,
    None,
}

/// User settings persisted by the settings store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub mode: RecordingMode,
    pub source: CaptureSource,
    pub quality: Quality,
    pub audio_source: AudioSource,
    pub microphone_enabled: bool,
    pub webcam_enabled: bool,

    /// Seconds to count down before capture starts (0 = start immediately)
    pub countdown_seconds: u32,

    /// Camera to use in camera mode; default camera when unset
    pub camera_device_id: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: RecordingMode::Screen,
            source: CaptureSource::Screen,
            quality: Quality::High,
            audio_source: AudioSource::System,
            microphone_enabled: false,
            webcam_enabled: false,
            countdown_seconds: 0,
            camera_device_id: None,
        }
    }
}

/// Key-value settings persistence
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self) -> Result<Settings>;

    async fn set(&self, settings: Settings) -> Result<()>;
}

/// Settings kept in memory for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: RwLock<Settings>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self) -> Result<Settings> {
        Ok(self.settings.read().await.clone())
    }

    async fn set(&self, settings: Settings) -> Result<()> {
        *self.settings.write().await = settings;
        Ok(())
    }
}
