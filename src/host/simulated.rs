//! In-process browser
//!
//! `SimulatedBrowser` implements every host primitive against in-memory
//! tabs. Tabs may or may not have an overlay listener registered, injected
//! programs run a configurable page hook, and every primitive call is logged
//! with its (tokio) timestamp so tests can check ordering and timing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info};

use super::media::{
    CameraConstraints, CameraDevice, DisplayConstraints, EncoderFactory, MediaDevices,
    MediaEncoder,
};
use super::notify::Notifier;
use super::scripting::{PageScript, Scripting};
use super::tabs::{Tab, TabId, Tabs};
use crate::capture::{CaptureStream, MediaTrack, TrackKind};
use crate::command::Command;
use crate::error::HostError;
use crate::session::OverlayInput;

/// A host primitive invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    ActiveTab,
    SendMessage { tab: TabId, command: String },
    InjectFile { tab: TabId, path: String },
    InjectFunction { tab: TabId, script: &'static str },
    InjectLegacy { tab: TabId, path: String },
    Notify { title: String, message: String },
    DisplayMedia,
    UserMedia { device_id: Option<String> },
    EnumerateCameras,
}

/// How the capture picker answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickerResponse {
    #[default]
    Grant,
    /// The user dismissed the prompt
    Deny,
    /// The platform failed
    Fail,
}

/// Program that runs when the overlay is injected into a tab
///
/// Returns the listener to register for the tab, if the program mounts one.
pub type PageProgram = Arc<dyn Fn(TabId) -> Option<mpsc::Sender<OverlayInput>> + Send + Sync>;

#[derive(Default)]
struct TabState {
    url: Option<String>,
    listener: Option<mpsc::Sender<OverlayInput>>,
    elements: HashSet<String>,
}

#[derive(Default)]
struct Inner {
    next_tab: TabId,
    tabs: HashMap<TabId, TabState>,
    active: Option<TabId>,
    calls: Vec<(Instant, HostCall)>,
    notifications: Vec<(String, String)>,
    failing_injections: HashSet<&'static str>,
    send_delay: Option<Duration>,
    page_program: Option<PageProgram>,
    picker: PickerResponse,
    cameras: Vec<CameraDevice>,
    live_tracks: Vec<MediaTrack>,
    next_stream: u32,
    fail_encoder: bool,
}

/// Simulated browser implementing all host primitives
#[derive(Clone)]
pub struct SimulatedBrowser {
    extension_id: String,
    created_at: Instant,
    inner: Arc<Mutex<Inner>>,
}

impl SimulatedBrowser {
    pub fn new(extension_id: impl Into<String>) -> Self {
        Self {
            extension_id: extension_id.into(),
            created_at: Instant::now(),
            inner: Arc::new(Mutex::new(Inner {
                next_tab: 1,
                ..Inner::default()
            })),
        }
    }

    /// Open a tab and make it active
    pub fn open_tab(&self, url: impl Into<String>) -> TabId {
        let mut inner = self.inner.lock();
        let id = inner.next_tab;
        inner.next_tab += 1;
        inner.tabs.insert(
            id,
            TabState {
                url: Some(url.into()),
                ..TabState::default()
            },
        );
        inner.active = Some(id);
        id
    }

    pub fn activate(&self, tab: Option<TabId>) {
        self.inner.lock().active = tab;
    }

    /// Register `listener` as the overlay listener of `tab`
    pub fn register_listener(&self, tab: TabId, listener: mpsc::Sender<OverlayInput>) {
        if let Some(state) = self.inner.lock().tabs.get_mut(&tab) {
            state.listener = Some(listener);
        }
    }

    pub fn has_listener(&self, tab: TabId) -> bool {
        self.inner
            .lock()
            .tabs
            .get(&tab)
            .and_then(|t| t.listener.as_ref())
            .map_or(false, |l| !l.is_closed())
    }

    /// Whether the page DOM holds an element with `id`
    pub fn has_element(&self, tab: TabId, id: &str) -> bool {
        self.inner
            .lock()
            .tabs
            .get(&tab)
            .map_or(false, |t| t.elements.contains(id))
    }

    pub fn set_page_program(&self, program: PageProgram) {
        self.inner.lock().page_program = Some(program);
    }

    /// Make an injection method fail: `"file"`, `"legacy"` or a
    /// [`PageScript::name`]
    pub fn fail_injection(&self, method: &'static str) {
        self.inner.lock().failing_injections.insert(method);
    }

    /// Delay every message delivery
    pub fn set_send_delay(&self, delay: Option<Duration>) {
        self.inner.lock().send_delay = delay;
    }

    pub fn set_picker(&self, response: PickerResponse) {
        self.inner.lock().picker = response;
    }

    pub fn set_cameras(&self, cameras: Vec<CameraDevice>) {
        self.inner.lock().cameras = cameras;
    }

    /// Make encoders created from now on fail to start
    pub fn fail_encoder(&self, fail: bool) {
        self.inner.lock().fail_encoder = fail;
    }

    /// The user pressed "Stop sharing": every live track ends
    pub fn end_sharing(&self) {
        let tracks = std::mem::take(&mut self.inner.lock().live_tracks);
        info!("Sharing ended by user ({} tracks)", tracks.len());
        for track in tracks {
            track.stop();
        }
    }

    /// Tracks handed out and not yet stopped
    pub fn live_track_count(&self) -> usize {
        self.inner
            .lock()
            .live_tracks
            .iter()
            .filter(|t| !t.is_ended())
            .count()
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.inner.lock().calls.iter().map(|(_, c)| c.clone()).collect()
    }

    /// Calls with their offset from browser creation
    pub fn timeline(&self) -> Vec<(Duration, HostCall)> {
        self.inner
            .lock()
            .calls
            .iter()
            .map(|(at, c)| (at.duration_since(self.created_at), c.clone()))
            .collect()
    }

    pub fn notifications(&self) -> Vec<(String, String)> {
        self.inner.lock().notifications.clone()
    }

    fn record(&self, call: HostCall) {
        debug!("Host call: {:?}", call);
        self.inner.lock().calls.push((Instant::now(), call));
    }

    fn check_injection(&self, tab: TabId, method: &'static str) -> Result<(), HostError> {
        let inner = self.inner.lock();
        if !inner.tabs.contains_key(&tab) {
            return Err(HostError::Platform(format!("no tab with id {}", tab)));
        }
        if inner.failing_injections.contains(method) {
            return Err(HostError::Platform(format!(
                "cannot inject into tab {} ({})",
                tab, method
            )));
        }
        Ok(())
    }

    /// Run the page program in `tab` and register its listener
    fn mount_overlay(&self, tab: TabId) {
        let program = self.inner.lock().page_program.clone();
        let Some(program) = program else {
            debug!("No page program, tab {} stays without listener", tab);
            return;
        };

        if let Some(listener) = program(tab) {
            self.register_listener(tab, listener);
        }
    }

    fn next_stream_id(&self) -> String {
        let mut inner = self.inner.lock();
        inner.next_stream += 1;
        format!("stream-{}", inner.next_stream)
    }
}

#[async_trait]
impl Tabs for SimulatedBrowser {
    async fn active_tab(&self) -> Result<Option<Tab>, HostError> {
        self.record(HostCall::ActiveTab);
        let inner = self.inner.lock();
        Ok(inner.active.and_then(|id| {
            inner.tabs.get(&id).map(|t| Tab {
                id,
                url: t.url.clone(),
            })
        }))
    }

    async fn send_message(&self, tab: TabId, command: &Command) -> Result<(), HostError> {
        self.record(HostCall::SendMessage {
            tab,
            command: command.to_string(),
        });

        let (listener, delay) = {
            let inner = self.inner.lock();
            let state = inner
                .tabs
                .get(&tab)
                .ok_or_else(|| HostError::Platform(format!("no tab with id {}", tab)))?;
            (state.listener.clone(), inner.send_delay)
        };

        if let Some(delay) = delay {
            time::sleep(delay).await;
        }

        let listener = listener.ok_or(HostError::NoReceiver(tab))?;
        listener
            .send(OverlayInput::Command(command.clone()))
            .await
            .map_err(|_| HostError::NoReceiver(tab))
    }
}

#[async_trait]
impl Scripting for SimulatedBrowser {
    async fn inject_file(&self, tab: TabId, path: &str) -> Result<(), HostError> {
        self.record(HostCall::InjectFile {
            tab,
            path: path.to_string(),
        });
        self.check_injection(tab, "file")?;
        self.mount_overlay(tab);
        Ok(())
    }

    async fn inject_function(&self, tab: TabId, script: &PageScript) -> Result<(), HostError> {
        self.record(HostCall::InjectFunction {
            tab,
            script: script.name(),
        });
        self.check_injection(tab, script.name())?;

        match script {
            PageScript::ScriptLoader { marker_id, src } => {
                let inserted = self
                    .inner
                    .lock()
                    .tabs
                    .get_mut(&tab)
                    .map_or(false, |t| t.elements.insert(marker_id.clone()));
                if inserted {
                    debug!("Loading {} in tab {}", src, tab);
                    self.mount_overlay(tab);
                }
            }
            PageScript::FeedbackBanner {
                element_id,
                lifetime,
                ..
            } => {
                let inserted = self
                    .inner
                    .lock()
                    .tabs
                    .get_mut(&tab)
                    .map_or(false, |t| t.elements.insert(element_id.clone()));
                if inserted {
                    let inner = Arc::clone(&self.inner);
                    let element_id = element_id.clone();
                    let lifetime = *lifetime;
                    tokio::spawn(async move {
                        time::sleep(lifetime).await;
                        if let Some(t) = inner.lock().tabs.get_mut(&tab) {
                            t.elements.remove(&element_id);
                        }
                    });
                }
            }
        }

        Ok(())
    }

    async fn inject_legacy(&self, tab: TabId, path: &str) -> Result<(), HostError> {
        self.record(HostCall::InjectLegacy {
            tab,
            path: path.to_string(),
        });
        self.check_injection(tab, "legacy")?;
        self.mount_overlay(tab);
        Ok(())
    }

    fn resource_url(&self, path: &str) -> String {
        format!("chrome-extension://{}/{}", self.extension_id, path)
    }
}

#[async_trait]
impl Notifier for SimulatedBrowser {
    async fn notify(&self, title: &str, message: &str) -> Result<(), HostError> {
        self.record(HostCall::Notify {
            title: title.to_string(),
            message: message.to_string(),
        });
        info!("[{}] {}", title, message);
        self.inner
            .lock()
            .notifications
            .push((title.to_string(), message.to_string()));
        Ok(())
    }
}

#[async_trait]
impl MediaDevices for SimulatedBrowser {
    async fn get_display_media(
        &self,
        constraints: &DisplayConstraints,
    ) -> Result<CaptureStream, HostError> {
        self.record(HostCall::DisplayMedia);

        match self.inner.lock().picker {
            PickerResponse::Grant => {}
            PickerResponse::Deny => {
                return Err(HostError::PermissionDenied(
                    "Permission denied by user".to_string(),
                ))
            }
            PickerResponse::Fail => {
                return Err(HostError::Platform("display capture unavailable".to_string()))
            }
        }

        let mut tracks = Vec::new();
        if constraints.video {
            tracks.push(MediaTrack::new("display-video", TrackKind::Video, "screen:0"));
        }
        if constraints.audio {
            tracks.push(MediaTrack::new("display-audio", TrackKind::Audio, "system audio"));
        }

        let stream = CaptureStream::new(self.next_stream_id(), tracks);
        self.inner
            .lock()
            .live_tracks
            .extend(stream.tracks().iter().cloned());
        Ok(stream)
    }

    async fn get_user_media(
        &self,
        constraints: &CameraConstraints,
    ) -> Result<CaptureStream, HostError> {
        self.record(HostCall::UserMedia {
            device_id: constraints.device_id.clone(),
        });

        let camera = {
            let inner = self.inner.lock();
            if inner.picker == PickerResponse::Deny {
                return Err(HostError::PermissionDenied(
                    "Permission denied by user".to_string(),
                ));
            }
            match &constraints.device_id {
                Some(id) => inner.cameras.iter().find(|c| &c.device_id == id).cloned(),
                None => inner.cameras.first().cloned(),
            }
        };

        let camera = camera.ok_or_else(|| HostError::Platform("no matching camera".to_string()))?;

        let mut tracks = vec![MediaTrack::new(
            camera.device_id.clone(),
            TrackKind::Video,
            camera.label.clone(),
        )];
        if constraints.audio {
            tracks.push(MediaTrack::new("microphone", TrackKind::Audio, "microphone"));
        }

        let stream = CaptureStream::new(self.next_stream_id(), tracks);
        self.inner
            .lock()
            .live_tracks
            .extend(stream.tracks().iter().cloned());
        Ok(stream)
    }

    async fn enumerate_cameras(&self) -> Result<Vec<CameraDevice>, HostError> {
        self.record(HostCall::EnumerateCameras);
        Ok(self.inner.lock().cameras.clone())
    }
}

impl EncoderFactory for SimulatedBrowser {
    fn create(&self) -> Box<dyn MediaEncoder> {
        let fail_start = self.inner.lock().fail_encoder;
        Box::new(SimulatedEncoder { fail_start, ..SimulatedEncoder::new() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    Paused,
    Stopping,
}

/// Encoder emitting one `chunk-NNNN;` fragment per timeslice while running
///
/// On stop it emits a final fragment and closes the fragment channel.
pub struct SimulatedEncoder {
    fail_start: bool,
    phase: Option<watch::Sender<Phase>>,
    task: Option<JoinHandle<()>>,
}

impl SimulatedEncoder {
    pub fn new() -> Self {
        Self {
            fail_start: false,
            phase: None,
            task: None,
        }
    }

    /// Encoder whose `start` always fails
    pub fn failing() -> Self {
        Self {
            fail_start: true,
            ..Self::new()
        }
    }

    /// Fragment payload for sequence number `seq`
    pub fn chunk(seq: u32) -> Vec<u8> {
        format!("chunk-{:04};", seq).into_bytes()
    }

    fn set_phase(&self, next: Phase) {
        if let Some(phase) = &self.phase {
            phase.send_if_modified(|current| {
                if *current == Phase::Stopping || *current == next {
                    return false;
                }
                *current = next;
                true
            });
        }
    }
}

impl Default for SimulatedEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaEncoder for SimulatedEncoder {
    async fn start(
        &mut self,
        stream: &CaptureStream,
        mime_type: &str,
        timeslice: Duration,
    ) -> Result<mpsc::Receiver<Vec<u8>>, HostError> {
        if self.fail_start {
            return Err(HostError::Unsupported(format!(
                "cannot encode {} as {}",
                stream.id(),
                mime_type
            )));
        }
        if self.task.is_some() {
            return Err(HostError::Platform("encoder already started".to_string()));
        }

        let (chunks_tx, chunks_rx) = mpsc::channel(64);
        let (phase_tx, mut phase_rx) = watch::channel(Phase::Running);

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + timeslice, timeslice);
            let mut phase = Phase::Running;
            let mut seq = 0u32;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if phase == Phase::Running {
                            seq += 1;
                            if chunks_tx.send(SimulatedEncoder::chunk(seq)).await.is_err() {
                                return;
                            }
                        }
                    }
                    changed = phase_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        phase = *phase_rx.borrow_and_update();
                        if phase == Phase::Stopping {
                            break;
                        }
                    }
                }
            }

            seq += 1;
            let _ = chunks_tx.send(SimulatedEncoder::chunk(seq)).await;
        });

        self.phase = Some(phase_tx);
        self.task = Some(task);
        Ok(chunks_rx)
    }

    fn pause(&mut self) {
        self.set_phase(Phase::Paused);
    }

    fn resume(&mut self) {
        self.set_phase(Phase::Running);
    }

    async fn stop(&mut self) -> Result<(), HostError> {
        if self.phase.is_none() {
            return Err(HostError::Platform("encoder not started".to_string()));
        }
        self.set_phase(Phase::Stopping);
        Ok(())
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
