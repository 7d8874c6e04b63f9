use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::session::RecordingMode;

/// Command delivered from the background to the overlay running in a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    #[serde(rename = "SHOW_OVERLAY")]
    ShowOverlay,
    #[serde(rename = "SHOW_OVERLAY_SETTINGS")]
    ShowOverlaySettings,
    #[serde(rename = "SHOW_OVERLAY_AND_START")]
    ShowOverlayAndStart {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mode: Option<RecordingMode>,
    },
    #[serde(rename = "COMMAND_START_RECORDING")]
    StartRecording,
    #[serde(rename = "COMMAND_STOP_RECORDING")]
    StopRecording,
    #[serde(rename = "COMMAND_TAKE_SCREENSHOT")]
    TakeScreenshot,
}

impl Command {
    /// Wire name of the command, used in logs and failure reports
    pub fn kind(&self) -> &'static str {
        match self {
            Command::ShowOverlay => "SHOW_OVERLAY",
            Command::ShowOverlaySettings => "SHOW_OVERLAY_SETTINGS",
            Command::ShowOverlayAndStart { .. } => "SHOW_OVERLAY_AND_START",
            Command::StartRecording => "COMMAND_START_RECORDING",
            Command::StopRecording => "COMMAND_STOP_RECORDING",
            Command::TakeScreenshot => "COMMAND_TAKE_SCREENSHOT",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Request sent from the popup to the background
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PopupRequest {
    #[serde(rename = "OPEN_OVERLAY_AND_START")]
    OpenOverlayAndStart {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mode: Option<RecordingMode>,
    },
    #[serde(rename = "OPEN_SETTINGS_PANEL")]
    OpenSettingsPanel,
}

impl PopupRequest {
    /// Command the overlay should receive for this request
    pub fn into_command(self) -> Command {
        match self {
            PopupRequest::OpenOverlayAndStart { mode } => Command::ShowOverlayAndStart { mode },
            PopupRequest::OpenSettingsPanel => Command::ShowOverlaySettings,
        }
    }
}

/// Keyboard shortcut registered with the extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shortcut {
    #[serde(rename = "start-recording")]
    Start,
    #[serde(rename = "stop-recording")]
    Stop,
    #[serde(rename = "take-screenshot")]
    Screenshot,
}

impl Shortcut {
    pub fn into_command(self) -> Command {
        match self {
            Shortcut::Start => Command::StartRecording,
            Shortcut::Stop => Command::StopRecording,
            Shortcut::Screenshot => Command::TakeScreenshot,
        }
    }
}

impl FromStr for Shortcut {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start-recording" => Ok(Shortcut::Start),
            "stop-recording" => Ok(Shortcut::Stop),
            "take-screenshot" => Ok(Shortcut::Screenshot),
            other => Err(format!("unknown shortcut: {}", other)),
        }
    }
}

/// Why the overlay became visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlayReason {
    #[serde(rename = "SHOW_OVERLAY")]
    ShowOverlay,
    #[serde(rename = "SHOW_OVERLAY_SETTINGS")]
    ShowOverlaySettings,
    #[serde(rename = "SHOW_OVERLAY_AND_START")]
    ShowOverlayAndStart,
}

/// Lifecycle event emitted by the overlay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OverlayEvent {
    #[serde(rename = "CONTENT_SCRIPT_MOUNTED")]
    ContentScriptMounted,
    #[serde(rename = "OVERLAY_SHOWN")]
    OverlayShown { reason: OverlayReason },
    #[serde(rename = "ARTIFACT_READY", rename_all = "camelCase")]
    ArtifactReady {
        duration_ms: u64,
        mime_type: String,
        size_bytes: usize,
    },
    #[serde(rename = "SCREENSHOT_REQUESTED")]
    ScreenshotRequested,
}

/// Anything the background's runtime listener can receive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuntimeMessage {
    Popup(PopupRequest),
    Overlay(OverlayEvent),
}
