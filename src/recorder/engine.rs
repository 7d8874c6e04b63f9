use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

use super::artifact::Artifact;
use super::config::RecorderOptions;
use crate::capture::{CaptureStream, MediaTrack};
use crate::error::{Error, Result};
use crate::host::MediaEncoder;

/// Recorder engine state
///
/// `Idle → Recording → (Paused ⇄ Recording)* → Stopped`. `Stopped` is
/// terminal; the next recording uses a new engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    Idle,
    Recording,
    Paused,
    Stopped,
}

#[derive(Debug)]
enum EncoderControl {
    Pause,
    Resume,
    Stop,
}

struct Shared {
    state: RecorderState,
    chunks: Vec<Vec<u8>>,
}

/// Chunked recorder
///
/// Turns a live capture stream into an [`Artifact`]. Fragments from the
/// encoder are collected by a background task; when the recording ends
/// (explicit `stop` or the video track ending) the task builds the artifact
/// and sends it on the finalize channel.
pub struct RecorderEngine {
    options: RecorderOptions,
    encoder: Option<Box<dyn MediaEncoder>>,
    shared: Arc<Mutex<Shared>>,
    control_tx: Option<mpsc::UnboundedSender<EncoderControl>>,
    finalized_tx: mpsc::Sender<Artifact>,
    collector: Option<JoinHandle<()>>,
}

impl RecorderEngine {
    pub fn new(
        encoder: Box<dyn MediaEncoder>,
        options: RecorderOptions,
        finalized_tx: mpsc::Sender<Artifact>,
    ) -> Self {
        Self {
            options,
            encoder: Some(encoder),
            shared: Arc::new(Mutex::new(Shared {
                state: RecorderState::Idle,
                chunks: Vec::new(),
            })),
            control_tx: None,
            finalized_tx,
            collector: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.shared.lock().state
    }

    /// Number of fragments collected so far
    pub fn chunk_count(&self) -> usize {
        self.shared.lock().chunks.len()
    }

    pub fn options(&self) -> &RecorderOptions {
        &self.options
    }

    /// Start recording `stream`
    ///
    /// Rejected unless the engine is idle. On failure the engine stays idle
    /// and holds no fragments.
    pub async fn start(&mut self, stream: &CaptureStream) -> Result<()> {
        match self.state() {
            RecorderState::Idle => {}
            RecorderState::Recording | RecorderState::Paused => {
                return Err(Error::Engine("recorder is already running".to_string()));
            }
            RecorderState::Stopped => {
                return Err(Error::Engine("recorder has already stopped".to_string()));
            }
        }

        if stream.tracks().is_empty() {
            return Err(Error::Engine(format!("stream {} has no tracks", stream.id())));
        }

        let mut encoder = self
            .encoder
            .take()
            .ok_or_else(|| Error::Engine("encoder unavailable".to_string()))?;

        self.shared.lock().chunks.clear();

        let chunks_rx = match encoder
            .start(stream, &self.options.mime_type, self.options.chunk_interval())
            .await
        {
            Ok(rx) => rx,
            Err(e) => {
                error!("Failed to start encoder {}: {}", encoder.name(), e);
                self.encoder = Some(encoder);
                let mut shared = self.shared.lock();
                shared.state = RecorderState::Idle;
                shared.chunks.clear();
                return Err(Error::Engine(e.to_string()));
            }
        };

        info!(
            "Recorder started: {} ({}, {}ms chunks)",
            encoder.name(),
            self.options.mime_type,
            self.options.chunk_interval_ms
        );

        self.shared.lock().state = RecorderState::Recording;

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let collector = Collector {
            encoder,
            chunks_rx,
            control_rx,
            video: stream.video_tracks().next().cloned(),
            shared: Arc::clone(&self.shared),
            finalized_tx: self.finalized_tx.clone(),
            mime_type: self.options.mime_type.clone(),
            flush_timeout: self.options.flush_timeout(),
            started_at: Instant::now(),
        };

        self.collector = Some(tokio::spawn(collector.run()));
        self.control_tx = Some(control_tx);

        Ok(())
    }

    /// Pause; ignored unless recording
    pub fn pause(&mut self) {
        {
            let mut shared = self.shared.lock();
            if shared.state != RecorderState::Recording {
                debug!("Pause ignored while {:?}", shared.state);
                return;
            }
            shared.state = RecorderState::Paused;
        }
        self.send_control(EncoderControl::Pause);
    }

    /// Resume; ignored unless paused
    pub fn resume(&mut self) {
        {
            let mut shared = self.shared.lock();
            if shared.state != RecorderState::Paused {
                debug!("Resume ignored while {:?}", shared.state);
                return;
            }
            shared.state = RecorderState::Recording;
        }
        self.send_control(EncoderControl::Resume);
    }

    /// Stop and finalize; ignored unless recording or paused
    ///
    /// Returns immediately. The artifact arrives on the finalize channel once
    /// the encoder has flushed.
    pub fn stop(&mut self) {
        {
            let mut shared = self.shared.lock();
            match shared.state {
                RecorderState::Recording | RecorderState::Paused => {
                    shared.state = RecorderState::Stopped;
                }
                other => {
                    debug!("Stop ignored while {:?}", other);
                    return;
                }
            }
        }
        info!("Stopping recorder");
        self.send_control(EncoderControl::Stop);
    }

    fn send_control(&self, control: EncoderControl) {
        if let Some(tx) = &self.control_tx {
            if let Err(e) = tx.send(control) {
                debug!("Recorder collector already finished, dropped {:?}", e.0);
            }
        }
    }
}

impl Drop for RecorderEngine {
    fn drop(&mut self) {
        if let Some(collector) = self.collector.take() {
            collector.abort();
        }
    }
}

/// Background task owning the encoder while recording
struct Collector {
    encoder: Box<dyn MediaEncoder>,
    chunks_rx: mpsc::Receiver<Vec<u8>>,
    control_rx: mpsc::UnboundedReceiver<EncoderControl>,
    video: Option<MediaTrack>,
    shared: Arc<Mutex<Shared>>,
    finalized_tx: mpsc::Sender<Artifact>,
    mime_type: String,
    flush_timeout: Duration,
    started_at: Instant,
}

impl Collector {
    async fn run(mut self) {
        let video = self.video.take();
        let track_ended = async move {
            match video {
                Some(track) => track.ended().await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(track_ended);

        let mut stopped_at: Option<Instant> = None;
        let mut flush_deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                chunk = self.chunks_rx.recv() => match chunk {
                    Some(bytes) if bytes.is_empty() => {}
                    Some(bytes) => {
                        self.shared.lock().chunks.push(bytes);
                    }
                    None => break,
                },
                Some(control) = self.control_rx.recv(), if stopped_at.is_none() => match control {
                    EncoderControl::Pause => self.encoder.pause(),
                    EncoderControl::Resume => self.encoder.resume(),
                    EncoderControl::Stop => {
                        stopped_at = Some(Instant::now());
                        if !self.request_flush().await {
                            break;
                        }
                        flush_deadline = Some(Instant::now() + self.flush_timeout);
                    }
                },
                _ = &mut track_ended, if stopped_at.is_none() => {
                    info!("Video track ended, stopping recorder");
                    self.shared.lock().state = RecorderState::Stopped;
                    stopped_at = Some(Instant::now());
                    if !self.request_flush().await {
                        break;
                    }
                    flush_deadline = Some(Instant::now() + self.flush_timeout);
                }
                _ = time::sleep_until(flush_deadline.unwrap_or_else(Instant::now)), if flush_deadline.is_some() => {
                    warn!(
                        "Encoder {} did not finish flushing within {}ms, finalizing with collected chunks",
                        self.encoder.name(),
                        self.flush_timeout.as_millis()
                    );
                    break;
                }
            }
        }

        // Duration spans start to stop, paused intervals included
        let duration = stopped_at
            .unwrap_or_else(Instant::now)
            .duration_since(self.started_at);

        let artifact = {
            let mut shared = self.shared.lock();
            shared.state = RecorderState::Stopped;
            Artifact::from_chunks(&shared.chunks, &self.mime_type, duration)
        };

        info!(
            "Recording finalized: {} chunks, {} bytes, {:.1}s",
            artifact.chunk_count(),
            artifact.size(),
            artifact.duration().as_secs_f64()
        );

        if self.finalized_tx.send(artifact).await.is_err() {
            warn!("Finalized recording dropped: no receiver");
        }
    }

    async fn request_flush(&mut self) -> bool {
        match self.encoder.stop().await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to stop encoder {}: {}", self.encoder.name(), e);
                false
            }
        }
    }
}
