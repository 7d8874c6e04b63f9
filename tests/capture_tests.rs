// Integration tests for stream acquisition
//
// Acquisition is exercised against the simulated browser's media devices.

use anyhow::Result;
use prorecorder::host::{CameraDevice, HostCall, PickerResponse, SimulatedBrowser};
use prorecorder::{CaptureKind, Error, StreamAcquisition, TrackKind};
use std::sync::Arc;

fn acquisition(browser: &SimulatedBrowser) -> StreamAcquisition {
    StreamAcquisition::new(Arc::new(browser.clone()))
}

#[tokio::test]
async fn test_display_stream_has_video_and_audio() -> Result<()> {
    let browser = SimulatedBrowser::new("test-extension");

    let stream = acquisition(&browser)
        .acquire_display(CaptureKind::Window)
        .await?;

    assert_eq!(stream.video_tracks().count(), 1);
    assert_eq!(stream.audio_tracks().count(), 1);
    assert!(stream.is_active());
    assert_eq!(browser.calls(), vec![HostCall::DisplayMedia]);

    Ok(())
}

#[tokio::test]
async fn test_denied_and_failed_requests_are_distinct() {
    let browser = SimulatedBrowser::new("test-extension");
    let acquisition = acquisition(&browser);

    browser.set_picker(PickerResponse::Deny);
    let denied = acquisition.acquire_display(CaptureKind::Screen).await;
    assert!(matches!(denied, Err(Error::AcquisitionDenied(_))));

    browser.set_picker(PickerResponse::Fail);
    let failed = acquisition.acquire_display(CaptureKind::Screen).await;
    assert!(matches!(failed, Err(Error::Acquisition(_))));
}

#[tokio::test]
async fn test_camera_stream_has_no_audio() -> Result<()> {
    let browser = SimulatedBrowser::new("test-extension");
    browser.set_cameras(vec![CameraDevice {
        device_id: "cam-0".to_string(),
        label: "Built-in".to_string(),
    }]);

    let stream = acquisition(&browser).acquire_camera(None).await?;

    assert_eq!(stream.tracks().len(), 1);
    assert_eq!(stream.tracks()[0].kind(), TrackKind::Video);
    assert_eq!(stream.tracks()[0].label(), "Built-in");

    let missing = acquisition(&browser).acquire_camera(Some("cam-9")).await;
    assert!(matches!(missing, Err(Error::Acquisition(_))));

    Ok(())
}

#[tokio::test]
async fn test_release_is_idempotent() -> Result<()> {
    let browser = SimulatedBrowser::new("test-extension");
    let acquisition = acquisition(&browser);

    let stream = acquisition.acquire_display(CaptureKind::Tab).await?;
    assert_eq!(browser.live_track_count(), 2);

    acquisition.release(&stream);
    acquisition.release(&stream);

    assert!(!stream.is_active());
    assert!(stream.tracks().iter().all(|t| t.is_ended()));
    assert_eq!(browser.live_track_count(), 0);

    Ok(())
}

#[tokio::test]
async fn test_unlabeled_cameras_get_a_default_label() {
    let browser = SimulatedBrowser::new("test-extension");
    browser.set_cameras(vec![
        CameraDevice {
            device_id: "cam-0".to_string(),
            label: String::new(),
        },
        CameraDevice {
            device_id: "cam-1".to_string(),
            label: "USB Camera".to_string(),
        },
    ]);

    let cameras = acquisition(&browser).list_cameras().await;

    let labels: Vec<&str> = cameras.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["Camera", "USB Camera"]);
}
