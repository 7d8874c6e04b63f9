// Tests for the wire format of commands, popup requests and overlay events
//
// These are the JSON shapes exchanged between the popup, the background
// and the overlay, so their tags must not drift.

use anyhow::Result;
use prorecorder::command::{Command, OverlayEvent, OverlayReason, PopupRequest, RuntimeMessage, Shortcut};
use prorecorder::session::{SessionSnapshot, Settings};
use prorecorder::RecordingMode;
use serde_json::json;

#[test]
fn test_command_tags() -> Result<()> {
    assert_eq!(
        serde_json::to_value(Command::ShowOverlay)?,
        json!({ "type": "SHOW_OVERLAY" })
    );
    assert_eq!(
        serde_json::to_value(Command::ShowOverlayAndStart { mode: None })?,
        json!({ "type": "SHOW_OVERLAY_AND_START" })
    );
    assert_eq!(
        serde_json::to_value(Command::ShowOverlayAndStart {
            mode: Some(RecordingMode::Tab)
        })?,
        json!({ "type": "SHOW_OVERLAY_AND_START", "mode": "tab" })
    );

    let stop: Command = serde_json::from_str(r#"{"type":"COMMAND_STOP_RECORDING"}"#)?;
    assert_eq!(stop, Command::StopRecording);
    assert_eq!(stop.to_string(), "COMMAND_STOP_RECORDING");

    assert!(serde_json::from_str::<Command>(r#"{"type":"REBOOT"}"#).is_err());

    Ok(())
}

#[test]
fn test_popup_requests_map_to_commands() {
    assert_eq!(
        PopupRequest::OpenOverlayAndStart {
            mode: Some(RecordingMode::Screen)
        }
        .into_command(),
        Command::ShowOverlayAndStart {
            mode: Some(RecordingMode::Screen)
        }
    );
    assert_eq!(
        PopupRequest::OpenSettingsPanel.into_command(),
        Command::ShowOverlaySettings
    );
}

#[test]
fn test_runtime_message_variants() -> Result<()> {
    let popup: RuntimeMessage = serde_json::from_str(r#"{"type":"OPEN_SETTINGS_PANEL"}"#)?;
    assert_eq!(popup, RuntimeMessage::Popup(PopupRequest::OpenSettingsPanel));

    let shown: RuntimeMessage =
        serde_json::from_str(r#"{"type":"OVERLAY_SHOWN","reason":"SHOW_OVERLAY_SETTINGS"}"#)?;
    assert_eq!(
        shown,
        RuntimeMessage::Overlay(OverlayEvent::OverlayShown {
            reason: OverlayReason::ShowOverlaySettings
        })
    );

    Ok(())
}

#[test]
fn test_artifact_ready_is_camel_case() -> Result<()> {
    let event = OverlayEvent::ArtifactReady {
        duration_ms: 1500,
        mime_type: "video/webm".to_string(),
        size_bytes: 42,
    };

    assert_eq!(
        serde_json::to_value(&event)?,
        json!({
            "type": "ARTIFACT_READY",
            "durationMs": 1500,
            "mimeType": "video/webm",
            "sizeBytes": 42
        })
    );

    Ok(())
}

#[test]
fn test_shortcut_names() {
    assert_eq!("start-recording".parse::<Shortcut>(), Ok(Shortcut::Start));
    assert_eq!("stop-recording".parse::<Shortcut>(), Ok(Shortcut::Stop));
    assert_eq!("take-screenshot".parse::<Shortcut>(), Ok(Shortcut::Screenshot));
    assert!("record".parse::<Shortcut>().is_err());

    assert_eq!(Shortcut::Start.into_command(), Command::StartRecording);
    assert_eq!(Shortcut::Stop.into_command(), Command::StopRecording);
    assert_eq!(Shortcut::Screenshot.into_command(), Command::TakeScreenshot);
}

#[test]
fn test_settings_use_stored_names() -> Result<()> {
    let settings: Settings = serde_json::from_str(
        r#"{"mode":"camera","webcamEnabled":true,"countdownSeconds":3,"cameraDeviceId":"cam-1"}"#,
    )?;

    assert_eq!(settings.mode, RecordingMode::Camera);
    assert!(settings.webcam_enabled);
    assert_eq!(settings.countdown_seconds, 3);
    assert_eq!(settings.camera_device_id.as_deref(), Some("cam-1"));
    // Missing keys fall back to defaults
    assert!(!settings.microphone_enabled);

    let snapshot = serde_json::to_value(SessionSnapshot::default())?;
    assert_eq!(snapshot["status"], "ready");
    assert_eq!(snapshot["artifactPending"], false);

    Ok(())
}
