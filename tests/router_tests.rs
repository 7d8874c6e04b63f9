// Integration tests for the control-plane router
//
// These tests drive the popup relay, shortcuts and toolbar clicks against
// the simulated browser. Timing tests run on a paused clock so the retry
// backoff and settle delay are observed exactly.

use prorecorder::host::{HostCall, PageProgram, SimulatedBrowser, TabId};
use prorecorder::router::{
    Background, ControlPlaneRouter, DeliveryOutcome, FallbackStep, Origin, RouterConfig,
    ScriptTagInjection, BANNER_ELEMENT_ID, CONTENT_SCRIPT_PATH, LOADER_MARKER_ID,
};
use prorecorder::session::OverlayInput;
use prorecorder::{Command, Error, PopupRequest, RuntimeMessage, Shortcut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn router(browser: &SimulatedBrowser) -> ControlPlaneRouter {
    ControlPlaneRouter::new(
        Arc::new(browser.clone()),
        Arc::new(browser.clone()),
        Arc::new(browser.clone()),
        RouterConfig::default(),
    )
}

/// Page program that mounts a listener forwarding everything to the test
fn forwarding_program(received: mpsc::UnboundedSender<OverlayInput>) -> PageProgram {
    Arc::new(move |_tab: TabId| {
        let (tx, mut rx) = mpsc::channel::<OverlayInput>(8);
        let received = received.clone();
        tokio::spawn(async move {
            while let Some(input) = rx.recv().await {
                let _ = received.send(input);
            }
        });
        Some(tx)
    })
}

fn sends(browser: &SimulatedBrowser) -> Vec<(Duration, HostCall)> {
    browser
        .timeline()
        .into_iter()
        .filter(|(_, call)| matches!(call, HostCall::SendMessage { .. }))
        .collect()
}

fn assert_near(actual: Duration, expected_ms: u64) {
    let actual_ms = actual.as_millis() as u64;
    assert!(
        actual_ms >= expected_ms && actual_ms <= expected_ms + 5,
        "expected ~{}ms, got {}ms",
        expected_ms,
        actual_ms
    );
}

#[tokio::test(start_paused = true)]
async fn test_no_listener_retries_then_injects() {
    let browser = SimulatedBrowser::new("test-extension");
    let tab = browser.open_tab("https://example.com/");

    let router = router(&browser);
    let report = router
        .relay(&Command::ShowOverlayAndStart { mode: None }, Origin::Popup)
        .await;

    // Three direct attempts, 200ms apart, then one after injection + 1000ms
    let sends = sends(&browser);
    assert_eq!(sends.len(), 4, "Should send 3 direct attempts and 1 after injection");
    assert_near(sends[0].0, 0);
    assert_near(sends[1].0, 200);
    assert_near(sends[2].0, 400);
    assert_near(sends[3].0, 1600);

    let inject_at = browser
        .timeline()
        .into_iter()
        .find(|(_, call)| matches!(call, HostCall::InjectFile { .. }))
        .map(|(at, _)| at)
        .expect("file injection should be attempted");
    assert_near(inject_at, 600);

    assert_eq!(report.tab, Some(tab));
    let retries: Vec<u32> = report.attempts.iter().map(|a| a.retry).collect();
    assert_eq!(retries, vec![0, 1, 2, 3]);
    assert!(report
        .attempts
        .iter()
        .all(|a| a.outcome == DeliveryOutcome::NoReceiver));

    // The file injected fine but never mounted a listener
    let injection = report.injection.as_ref().expect("injection should run");
    assert_eq!(injection.succeeded, Some("file"));

    assert!(report.banner_shown, "Banner is shown after injection");
    assert!(!report.delivered());
    assert_eq!(
        report.error,
        Some(Error::DeliveryFailure {
            command: "SHOW_OVERLAY_AND_START".to_string(),
            tab,
        })
    );

    let notifications = browser.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].0, "ProRecorder");
    assert_eq!(notifications[0].1, "Failed to open overlay in the current tab");
}

#[tokio::test(start_paused = true)]
async fn test_second_attempt_delivers_without_injection() {
    let browser = SimulatedBrowser::new("test-extension");
    let tab = browser.open_tab("https://example.com/");

    // The overlay finishes mounting between the first and second attempt
    let (listener, mut received) = mpsc::channel(8);
    let late = browser.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        late.register_listener(tab, listener);
    });

    let report = router(&browser)
        .relay(&Command::ShowOverlaySettings, Origin::Popup)
        .await;

    let outcomes: Vec<DeliveryOutcome> = report.attempts.iter().map(|a| a.outcome).collect();
    assert_eq!(
        outcomes,
        vec![DeliveryOutcome::NoReceiver, DeliveryOutcome::Delivered]
    );
    assert!(report.delivered());
    assert!(report.injection.is_none(), "No injection when a retry succeeds");
    assert!(!report.banner_shown);
    assert!(report.error.is_none());
    assert!(browser.notifications().is_empty());

    let input = received.recv().await.expect("command should arrive");
    assert_eq!(input, OverlayInput::Command(Command::ShowOverlaySettings));
}

#[tokio::test(start_paused = true)]
async fn test_script_tag_fallback_mounts_overlay() {
    let browser = SimulatedBrowser::new("test-extension");
    let tab = browser.open_tab("https://example.com/");
    browser.fail_injection("file");

    let (received_tx, mut received) = mpsc::unbounded_channel();
    browser.set_page_program(forwarding_program(received_tx));

    let router = router(&browser);
    let report = router
        .relay(&Command::ShowOverlayAndStart { mode: None }, Origin::Popup)
        .await;

    let injection = report.injection.as_ref().expect("injection should run");
    assert_eq!(injection.succeeded, Some("script-tag"));
    assert_eq!(injection.failures.len(), 1);
    assert!(matches!(
        injection.failures[0],
        Error::InjectionFailure { step: "file", .. }
    ));

    assert!(report.delivered(), "Post-injection attempt should deliver");
    assert!(report.error.is_none());
    assert!(browser.has_element(tab, LOADER_MARKER_ID));
    assert!(browser.notifications().is_empty());

    let input = received.recv().await.expect("command should arrive");
    assert_eq!(
        input,
        OverlayInput::Command(Command::ShowOverlayAndStart { mode: None })
    );

    // Once mounted, the next relay is delivered on the first attempt
    let again = router.relay(&Command::StopRecording, Origin::Popup).await;
    assert_eq!(again.attempts.len(), 1);
    assert!(again.delivered());
    assert!(again.injection.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_script_tag_injection_mounts_once() {
    let browser = SimulatedBrowser::new("test-extension");
    let tab = browser.open_tab("https://example.com/");

    let mounts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&mounts);
    browser.set_page_program(Arc::new(move |_tab: TabId| {
        counter.fetch_add(1, Ordering::SeqCst);
        let (tx, _rx) = mpsc::channel::<OverlayInput>(8);
        Some(tx)
    }));

    let step = ScriptTagInjection::new(
        Arc::new(browser.clone()),
        CONTENT_SCRIPT_PATH,
        LOADER_MARKER_ID,
    );

    step.run(tab).await.expect("first injection should succeed");
    step.run(tab).await.expect("second injection should succeed");

    assert_eq!(mounts.load(Ordering::SeqCst), 1, "Marker guards a second mount");
    assert!(browser.has_element(tab, LOADER_MARKER_ID));
}

#[tokio::test(start_paused = true)]
async fn test_all_injection_steps_fail() {
    let browser = SimulatedBrowser::new("test-extension");
    let tab = browser.open_tab("chrome://settings/");
    browser.fail_injection("file");
    browser.fail_injection("script-loader");
    browser.fail_injection("legacy");

    let report = router(&browser)
        .relay(&Command::ShowOverlay, Origin::Popup)
        .await;

    let injection = report.injection.as_ref().expect("injection should run");
    assert_eq!(injection.succeeded, None);
    assert_eq!(injection.failures.len(), 3);
    assert_eq!(injection.attempted(), 3);

    assert!(!report.delivered());
    assert!(matches!(report.error, Some(Error::DeliveryFailure { .. })));
    assert!(!browser.has_element(tab, LOADER_MARKER_ID));
    assert_eq!(
        browser.notifications()[0].1,
        "Failed to open overlay in the current tab"
    );
}

#[tokio::test(start_paused = true)]
async fn test_no_active_tab_notifies_and_sends_nothing() {
    let browser = SimulatedBrowser::new("test-extension");

    let report = router(&browser)
        .relay(&Command::ShowOverlay, Origin::Popup)
        .await;

    assert_eq!(report.error, Some(Error::NoActiveTab));
    assert!(report.attempts.is_empty());
    assert!(sends(&browser).is_empty());
    assert_eq!(
        browser.notifications(),
        vec![(
            "ProRecorder".to_string(),
            "Could not open overlay: no active tab detected".to_string()
        )]
    );
}

#[tokio::test(start_paused = true)]
async fn test_slow_tab_times_out() {
    let browser = SimulatedBrowser::new("test-extension");
    let tab = browser.open_tab("https://example.com/");
    let (listener, _received) = mpsc::channel(8);
    browser.register_listener(tab, listener);
    browser.set_send_delay(Some(Duration::from_secs(6)));

    let report = router(&browser)
        .relay(&Command::StopRecording, Origin::Page(tab))
        .await;

    assert_eq!(report.attempts.len(), 1, "Page origin is delivered once");
    assert_eq!(report.attempts[0].outcome, DeliveryOutcome::Timeout);
    assert!(matches!(report.error, Some(Error::DeliveryFailure { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_banner_removes_itself() {
    let browser = SimulatedBrowser::new("test-extension");
    let tab = browser.open_tab("https://example.com/");

    let (received_tx, _received) = mpsc::unbounded_channel();
    browser.set_page_program(forwarding_program(received_tx));

    let report = router(&browser)
        .relay(&Command::ShowOverlay, Origin::Popup)
        .await;
    assert!(report.banner_shown);
    assert!(browser.has_element(tab, BANNER_ELEMENT_ID));

    tokio::time::sleep(Duration::from_millis(2300)).await;
    assert!(
        !browser.has_element(tab, BANNER_ELEMENT_ID),
        "Banner should be gone after its lifetime"
    );
}

#[tokio::test(start_paused = true)]
async fn test_popup_message_dispatch() {
    let browser = SimulatedBrowser::new("test-extension");
    let tab = browser.open_tab("https://example.com/");
    let (listener, mut received) = mpsc::channel(8);
    browser.register_listener(tab, listener);

    let background = Background::new(router(&browser));

    let message: RuntimeMessage =
        serde_json::from_str(r#"{"type":"OPEN_OVERLAY_AND_START","mode":"window"}"#)
            .expect("popup message should parse");
    let report = background
        .handle_runtime_message(message, None)
        .await
        .expect("popup requests are relayed");
    assert!(report.delivered());

    let input = received.recv().await.expect("command should arrive");
    assert_eq!(
        input,
        OverlayInput::Command(Command::ShowOverlayAndStart {
            mode: Some(prorecorder::RecordingMode::Window)
        })
    );

    // Overlay lifecycle events are only logged
    let event: RuntimeMessage = serde_json::from_str(r#"{"type":"CONTENT_SCRIPT_MOUNTED"}"#)
        .expect("overlay event should parse");
    assert!(background
        .handle_runtime_message(event, Some(tab))
        .await
        .is_none());

    let settings = RuntimeMessage::Popup(PopupRequest::OpenSettingsPanel);
    let report = background
        .handle_runtime_message(settings, None)
        .await
        .expect("popup requests are relayed");
    assert!(report.delivered());
    assert_eq!(
        received.recv().await,
        Some(OverlayInput::Command(Command::ShowOverlaySettings))
    );
}

#[tokio::test(start_paused = true)]
async fn test_shortcut_goes_to_active_tab_once() {
    let browser = SimulatedBrowser::new("test-extension");
    let tab = browser.open_tab("https://example.com/");

    let background = Background::new(router(&browser));

    // No listener: a single attempt, no retries, no injection, no notification
    let report = background.handle_shortcut(Shortcut::Start).await;
    assert_eq!(report.attempts.len(), 1);
    assert!(report.injection.is_none());
    assert!(browser.notifications().is_empty());

    let (listener, mut received) = mpsc::channel(8);
    browser.register_listener(tab, listener);

    let report = background.handle_shortcut(Shortcut::Screenshot).await;
    assert!(report.delivered());
    assert_eq!(
        received.recv().await,
        Some(OverlayInput::Command(Command::TakeScreenshot))
    );

    browser.activate(None);
    let report = background.handle_shortcut(Shortcut::Stop).await;
    assert_eq!(report.error, Some(Error::NoActiveTab));
    assert!(browser.notifications().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_toolbar_click_shows_overlay() {
    let browser = SimulatedBrowser::new("test-extension");
    let tab = browser.open_tab("https://example.com/");
    let (listener, mut received) = mpsc::channel(8);
    browser.register_listener(tab, listener);

    let background = Background::new(router(&browser));

    let report = background.handle_toolbar_click(Some(tab)).await;
    assert!(report.delivered());
    assert_eq!(
        received.recv().await,
        Some(OverlayInput::Command(Command::ShowOverlay))
    );

    let report = background.handle_toolbar_click(None).await;
    assert_eq!(report.error, Some(Error::NoActiveTab));
}
