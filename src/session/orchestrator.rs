use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{self, Instant, Interval};
use tracing::{debug, error, info, warn};

use super::config::{SessionConfig, COUNTDOWN_TICK, PROGRESS_TICK};
use super::session::{OverlayState, RecordingSession, SessionSnapshot, SessionStatus};
use super::settings::{RecordingMode, Settings, SettingsStore};
use super::sinks::{ArtifactKind, DownloadSink, HistoryEntry, HistoryStore};
use crate::capture::StreamAcquisition;
use crate::command::{Command, OverlayEvent, OverlayReason};
use crate::error::{Error, HostError};
use crate::host::{EncoderFactory, MediaDevices, Notifier};
use crate::recorder::{Artifact, RecorderEngine};

const INBOX_CAPACITY: usize = 32;
const EVENT_CAPACITY: usize = 64;

/// Actions issued by the overlay UI inside the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayAction {
    Start,
    Stop,
    Pause,
    Resume,
    Save,
    Discard,
    OpenSettings,
    CloseSettings,
    ApplySettings(Settings),
    /// Escape pressed
    Hide,
    ScreenshotComplete,
}

/// Everything the orchestrator's inbox accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayInput {
    /// Relayed from the background
    Command(Command),
    /// From the overlay UI
    Action(OverlayAction),
}

/// External collaborators of the orchestrator
#[derive(Clone)]
pub struct Collaborators {
    pub media: Arc<dyn MediaDevices>,
    pub encoders: Arc<dyn EncoderFactory>,
    pub settings: Arc<dyn SettingsStore>,
    pub downloads: Arc<dyn DownloadSink>,
    pub history: Arc<dyn HistoryStore>,
    pub notifier: Arc<dyn Notifier>,
}

struct Countdown {
    remaining: u32,
    mode: Option<RecordingMode>,
    ticker: Interval,
}

/// The page's recording state machine
///
/// `ready → countdown → recording ⇄ paused → processing → ready`
///
/// One orchestrator exists per page load. It owns the recording session,
/// the capture stream and the recorder engine, and is driven from a single
/// task (`run`) so no state is ever shared.
pub struct SessionOrchestrator {
    config: SessionConfig,
    session: RecordingSession,
    overlay: OverlayState,
    settings: Settings,
    acquisition: StreamAcquisition,
    collaborators: Collaborators,
    countdown: Option<Countdown>,
    progress: Option<Interval>,
    artifact: Option<Artifact>,
    finalized_tx: mpsc::Sender<Artifact>,
    finalized_rx: mpsc::Receiver<Artifact>,
    events: broadcast::Sender<OverlayEvent>,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl SessionOrchestrator {
    /// Create the orchestrator, loading settings from the store
    pub async fn new(config: SessionConfig, collaborators: Collaborators) -> Self {
        let settings = match collaborators.settings.get().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to load settings, using defaults: {:#}", e);
                Settings::default()
            }
        };

        let (finalized_tx, finalized_rx) = mpsc::channel(4);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (snapshot, _) = watch::channel(SessionSnapshot::default());

        Self {
            config,
            session: RecordingSession::new(),
            overlay: OverlayState::default(),
            settings,
            acquisition: StreamAcquisition::new(Arc::clone(&collaborators.media)),
            collaborators,
            countdown: None,
            progress: None,
            artifact: None,
            finalized_tx,
            finalized_rx,
            events,
            snapshot,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Recording waiting to be saved or discarded
    pub fn pending_artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Lifecycle events, including the mount event emitted by `run`
    pub fn subscribe(&self) -> broadcast::Receiver<OverlayEvent> {
        self.events.subscribe()
    }

    /// Run the orchestrator on its own task
    pub fn spawn(self) -> OrchestratorHandle {
        let (inbox, inbox_rx) = mpsc::channel(INBOX_CAPACITY);
        let handle = OrchestratorHandle {
            inbox,
            snapshot: self.snapshot.subscribe(),
            events: self.events.clone(),
        };
        tokio::spawn(self.run(inbox_rx));
        handle
    }

    /// Process inputs, countdown ticks and finalized recordings until the
    /// inbox closes (page unload)
    pub async fn run(mut self, mut inbox: mpsc::Receiver<OverlayInput>) {
        info!("Overlay mounted");
        self.emit(OverlayEvent::ContentScriptMounted);
        self.publish();

        loop {
            tokio::select! {
                input = inbox.recv() => match input {
                    Some(input) => self.handle_input(input).await,
                    None => break,
                },
                _ = next_countdown_tick(&mut self.countdown) => self.on_countdown_tick().await,
                Some(artifact) = self.finalized_rx.recv() => self.on_artifact_ready(artifact),
                _ = next_progress_tick(&mut self.progress) => {
                    self.session.update_elapsed();
                    self.publish();
                }
            }
        }

        self.teardown();
    }

    pub async fn handle_input(&mut self, input: OverlayInput) {
        match input {
            OverlayInput::Command(command) => self.handle_command(command).await,
            OverlayInput::Action(action) => self.handle_action(action).await,
        }
    }

    /// Interpret a command relayed from the background
    pub async fn handle_command(&mut self, command: Command) {
        info!("Overlay received {}", command);

        match command {
            Command::ShowOverlay => self.show(OverlayReason::ShowOverlay),
            Command::ShowOverlaySettings => {
                self.overlay.settings_open = true;
                self.show(OverlayReason::ShowOverlaySettings);
            }
            Command::ShowOverlayAndStart { mode } => {
                self.show(OverlayReason::ShowOverlayAndStart);
                self.start(mode).await;
            }
            Command::StartRecording => self.start(None).await,
            Command::StopRecording => self.stop(),
            Command::TakeScreenshot => self.enter_screenshot_mode(),
        }

        self.publish();
    }

    pub async fn handle_action(&mut self, action: OverlayAction) {
        debug!("Overlay action {:?}", action);

        match action {
            OverlayAction::Start => self.start(None).await,
            OverlayAction::Stop => self.stop(),
            OverlayAction::Pause => self.pause(),
            OverlayAction::Resume => self.resume(),
            OverlayAction::Save => self.save().await,
            OverlayAction::Discard => self.discard(),
            OverlayAction::OpenSettings => self.overlay.settings_open = true,
            OverlayAction::CloseSettings => self.overlay.settings_open = false,
            OverlayAction::ApplySettings(settings) => self.apply_settings(settings).await,
            OverlayAction::Hide => self.overlay.visible = false,
            OverlayAction::ScreenshotComplete => self.overlay.screenshot_mode = false,
        }

        self.publish();
    }

    /// Start a recording, through the countdown when one is configured
    pub async fn start(&mut self, mode: Option<RecordingMode>) {
        if self.session.status() != SessionStatus::Ready {
            warn!("Start ignored while {:?}", self.session.status());
            return;
        }

        let seconds = self.settings.countdown_seconds;
        if seconds == 0 {
            self.begin_capture(mode).await;
            return;
        }

        info!("Starting {}s countdown", seconds);
        self.countdown = Some(Countdown {
            remaining: seconds,
            mode,
            ticker: time::interval_at(Instant::now() + COUNTDOWN_TICK, COUNTDOWN_TICK),
        });
        self.session.enter_countdown();
        self.publish();
    }

    async fn on_countdown_tick(&mut self) {
        let Some(countdown) = self.countdown.as_mut() else {
            return;
        };

        countdown.remaining = countdown.remaining.saturating_sub(1);
        if countdown.remaining > 0 {
            debug!("Countdown: {}", countdown.remaining);
            self.publish();
            return;
        }

        let mode = countdown.mode;
        self.countdown = None;
        self.session.cancel_countdown();
        self.begin_capture(mode).await;
    }

    /// Acquire a stream for `mode` (settings mode when `None`) and start the
    /// recorder. Any failure leaves the session ready.
    pub async fn begin_capture(&mut self, mode: Option<RecordingMode>) {
        let mode = mode.unwrap_or(self.settings.mode);

        if mode == RecordingMode::Screenshot {
            self.enter_screenshot_mode();
            self.publish();
            return;
        }

        if mode == RecordingMode::Camera || self.settings.webcam_enabled {
            self.overlay.camera_visible = true;
        }

        let acquired = match mode.capture_kind() {
            Some(kind) => self.acquisition.acquire_display(kind).await,
            None => {
                let device_id = self.settings.camera_device_id.clone();
                self.acquisition.acquire_camera(device_id.as_deref()).await
            }
        };

        let stream = match acquired {
            Ok(stream) => stream,
            Err(Error::AcquisitionDenied(reason)) => {
                info!("Capture cancelled by user: {}", reason);
                self.publish();
                return;
            }
            Err(e) => {
                warn!("Capture failed: {}", e);
                self.notify("Could not start recording").await;
                self.publish();
                return;
            }
        };

        let mut engine = RecorderEngine::new(
            self.collaborators.encoders.create(),
            self.config.recorder.clone(),
            self.finalized_tx.clone(),
        );

        if let Err(e) = engine.start(&stream).await {
            error!("Failed to start recording: {}", e);
            self.acquisition.release(&stream);
            self.publish();
            return;
        }

        self.session.begin(stream, engine);
        self.progress = Some(time::interval_at(
            Instant::now() + PROGRESS_TICK,
            PROGRESS_TICK,
        ));
        info!("Recording started ({:?})", mode);

        self.notify("Recording started").await;
        self.publish();
    }

    pub fn pause(&mut self) {
        if let Some(engine) = self.session.engine_mut() {
            engine.pause();
        }
        self.session.sync_with_engine();
        self.publish();
    }

    pub fn resume(&mut self) {
        if let Some(engine) = self.session.engine_mut() {
            engine.resume();
        }
        self.session.sync_with_engine();
        self.publish();
    }

    /// Cancel a pending countdown, or stop the recording and enter
    /// `processing` until the recorder delivers the artifact
    pub fn stop(&mut self) {
        if self.countdown.take().is_some() {
            info!("Countdown cancelled");
            self.session.cancel_countdown();
            self.publish();
            return;
        }

        match self.session.status() {
            SessionStatus::Recording | SessionStatus::Paused => {}
            other => {
                debug!("Stop ignored while {:?}", other);
                return;
            }
        }

        if let Some(engine) = self.session.engine_mut() {
            engine.stop();
        }
        if let Some(stream) = self.session.mark_processing() {
            self.acquisition.release(&stream);
        }
        self.progress = None;
        self.publish();
    }

    /// Finalize callback of the recorder engine
    pub fn on_artifact_ready(&mut self, artifact: Artifact) {
        // Still holding a stream means the recorder stopped on its own
        if let Some(stream) = self.session.finish() {
            self.acquisition.release(&stream);
        }
        self.progress = None;

        info!(
            "Recording ready: {} bytes, {}ms ({})",
            artifact.size(),
            artifact.duration_ms(),
            artifact.mime_type()
        );

        self.emit(OverlayEvent::ArtifactReady {
            duration_ms: artifact.duration_ms(),
            mime_type: artifact.mime_type().to_string(),
            size_bytes: artifact.size(),
        });

        if self.artifact.replace(artifact).is_some() {
            warn!("Unsaved recording replaced by a newer one");
        }
        self.publish();
    }

    /// Drop the pending recording without saving it
    pub fn discard(&mut self) {
        if self.artifact.take().is_none() {
            debug!("Nothing to discard");
            return;
        }

        info!("Recording discarded");
        if self.session.status() == SessionStatus::Ready {
            self.session.reset();
        }
        self.publish();
    }

    /// Download the pending recording and add it to the history
    pub async fn save(&mut self) {
        let Some(artifact) = self.artifact.as_ref() else {
            debug!("Nothing to save");
            return;
        };

        let filename = match self
            .collaborators
            .downloads
            .save(artifact, ArtifactKind::Recording)
            .await
        {
            Ok(filename) => filename,
            Err(e) => {
                error!("Failed to save recording: {:#}", e);
                self.notify("Failed to save recording").await;
                return;
            }
        };

        let entry = HistoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            duration_ms: artifact.duration_ms(),
            filename,
            mime_type: artifact.mime_type().to_string(),
        };

        if let Err(e) = self.collaborators.history.record(entry).await {
            warn!("Failed to add recording to history: {:#}", e);
        }

        self.notify("Recording saved").await;

        self.artifact = None;
        if self.session.status() == SessionStatus::Ready {
            self.session.reset();
        }
        self.publish();
    }

    /// Persist new settings; the camera preview follows `webcam_enabled`
    pub async fn apply_settings(&mut self, settings: Settings) {
        if let Err(e) = self.collaborators.settings.set(settings.clone()).await {
            warn!("Failed to persist settings: {:#}", e);
        }
        self.overlay.camera_visible = settings.webcam_enabled;
        self.settings = settings;
    }

    fn show(&mut self, reason: OverlayReason) {
        self.overlay.visible = true;
        self.emit(OverlayEvent::OverlayShown { reason });
    }

    fn enter_screenshot_mode(&mut self) {
        self.overlay.screenshot_mode = true;
        self.emit(OverlayEvent::ScreenshotRequested);
    }

    fn teardown(&mut self) {
        self.countdown = None;
        self.progress = None;
        if let Some(engine) = self.session.engine_mut() {
            engine.stop();
        }
        if let Some(stream) = self.session.finish() {
            self.acquisition.release(&stream);
        }
        info!("Overlay unmounted");
    }

    async fn notify(&self, message: &str) {
        if let Err(e) = self
            .collaborators
            .notifier
            .notify(&self.config.notification_title, message)
            .await
        {
            debug!("Notification failed: {}", e);
        }
    }

    fn emit(&self, event: OverlayEvent) {
        if self.events.send(event).is_err() {
            debug!("No overlay event subscribers");
        }
    }

    fn publish(&self) {
        self.snapshot.send_replace(SessionSnapshot {
            status: self.session.status(),
            countdown_remaining: self.countdown.as_ref().map(|c| c.remaining),
            started_at: self.session.started_at(),
            elapsed_ms: self.session.elapsed_ms(),
            chunk_count: self.session.chunk_count(),
            artifact_pending: self.artifact.is_some(),
            overlay: self.overlay.clone(),
        });
    }
}

async fn next_countdown_tick(countdown: &mut Option<Countdown>) {
    match countdown {
        Some(countdown) => {
            countdown.ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn next_progress_tick(progress: &mut Option<Interval>) {
    match progress {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Cloneable handle to a running orchestrator
///
/// The inbox sender doubles as the page's message listener.
#[derive(Clone)]
pub struct OrchestratorHandle {
    inbox: mpsc::Sender<OverlayInput>,
    snapshot: watch::Receiver<SessionSnapshot>,
    events: broadcast::Sender<OverlayEvent>,
}

impl OrchestratorHandle {
    pub async fn send(&self, input: OverlayInput) -> Result<(), HostError> {
        self.inbox
            .send(input)
            .await
            .map_err(|_| HostError::Platform("overlay has been unmounted".to_string()))
    }

    pub async fn command(&self, command: Command) -> Result<(), HostError> {
        self.send(OverlayInput::Command(command)).await
    }

    pub async fn action(&self, action: OverlayAction) -> Result<(), HostError> {
        self.send(OverlayInput::Action(action)).await
    }

    /// Sender to register as the page's message listener
    pub fn listener(&self) -> mpsc::Sender<OverlayInput> {
        self.inbox.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Wait until a published snapshot satisfies `predicate`
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Option<SessionSnapshot> {
        let mut rx = self.snapshot.clone();
        let result = rx.wait_for(|s| predicate(s)).await;
        result.ok().map(|s| (*s).clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OverlayEvent> {
        self.events.subscribe()
    }
}
