use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use prorecorder::host::{PageProgram, SimulatedBrowser, TabId};
use prorecorder::router::Background;
use prorecorder::session::{
    Collaborators, FileDownloadSink, JsonHistoryStore, MemorySettingsStore,
    OverlayAction, SessionOrchestrator, SessionStatus,
};
use prorecorder::{
    Config, ControlPlaneRouter, PopupRequest, RecordingMode, RuntimeMessage, Shortcut,
    StreamAcquisition,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "prorecorder")]
#[command(about = "Browser recording control plane, driven against a simulated browser")]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(short, long, default_value = "config/prorecorder")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Relay a popup request or shortcut into a tab
    Relay {
        /// Popup request to send
        #[arg(short, long, value_enum, default_value = "start")]
        request: RequestArg,

        /// Recording mode for start requests
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,

        /// Send a keyboard shortcut instead (start-recording, stop-recording, take-screenshot)
        #[arg(long)]
        shortcut: Option<Shortcut>,

        /// The tab already runs the overlay
        #[arg(long)]
        mounted: bool,

        /// Injection methods that fail in the tab (file, script-loader, legacy)
        #[arg(long = "block")]
        blocked: Vec<String>,
    },

    /// Record the simulated screen and save the artifact
    Record {
        /// Seconds to record
        #[arg(short, long, default_value = "3")]
        duration: u64,

        /// Countdown before capture starts, overrides the configured default
        #[arg(long)]
        countdown: Option<u32>,

        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,

        /// Output directory, overrides the configured downloads path
        #[arg(short, long)]
        output_dir: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RequestArg {
    Start,
    Settings,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Screen,
    Window,
    Tab,
    Camera,
}

impl From<ModeArg> for RecordingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Screen => RecordingMode::Screen,
            ModeArg::Window => RecordingMode::Window,
            ModeArg::Tab => RecordingMode::Tab,
            ModeArg::Camera => RecordingMode::Camera,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("prorecorder=info")),
        )
        .init();

    let cli = Cli::parse();

    let cfg = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Could not load {}, using defaults: {:#}", cli.config, e);
            Config::default()
        }
    };

    info!("{} v{}", cfg.extension.name, env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Relay {
            request,
            mode,
            shortcut,
            mounted,
            blocked,
        } => run_relay(cfg, request, mode, shortcut, mounted, blocked).await,
        Commands::Record {
            duration,
            countdown,
            mode,
            output_dir,
        } => run_record(cfg, duration, countdown, mode, output_dir).await,
    }
}

fn collaborators(cfg: &Config, browser: &SimulatedBrowser, output_dir: &str) -> Collaborators {
    Collaborators {
        media: Arc::new(browser.clone()),
        encoders: Arc::new(browser.clone()),
        settings: Arc::new(MemorySettingsStore::new(cfg.defaults.clone())),
        downloads: Arc::new(FileDownloadSink::new(output_dir)),
        history: Arc::new(JsonHistoryStore::new(&cfg.output.history_path)),
        notifier: Arc::new(browser.clone()),
    }
}

fn background(cfg: &Config, browser: &SimulatedBrowser) -> Background {
    Background::new(ControlPlaneRouter::new(
        Arc::new(browser.clone()),
        Arc::new(browser.clone()),
        Arc::new(browser.clone()),
        cfg.router_config(),
    ))
}

async fn run_relay(
    cfg: Config,
    request: RequestArg,
    mode: Option<ModeArg>,
    shortcut: Option<Shortcut>,
    mounted: bool,
    blocked: Vec<String>,
) -> Result<()> {
    let browser = SimulatedBrowser::new(&cfg.extension.id);
    let tab = browser.open_tab("https://example.com/");

    for method in blocked {
        let method = match method.as_str() {
            "file" => "file",
            "script-loader" => "script-loader",
            "legacy" => "legacy",
            other => bail!("unknown injection method: {}", other),
        };
        browser.fail_injection(method);
    }

    // Injected overlays mount a full orchestrator
    let session_config = cfg.session_config();
    let collab = collaborators(&cfg, &browser, &cfg.output.downloads_path);
    let program: PageProgram = Arc::new(move |tab: TabId| {
        let (inbox, inbox_rx) = mpsc::channel(32);
        let session_config = session_config.clone();
        let collab = collab.clone();
        tokio::spawn(async move {
            info!("Overlay program running in tab {}", tab);
            SessionOrchestrator::new(session_config, collab)
                .await
                .run(inbox_rx)
                .await;
        });
        Some(inbox)
    });
    browser.set_page_program(Arc::clone(&program));

    if mounted {
        if let Some(listener) = program(tab) {
            browser.register_listener(tab, listener);
        }
    }

    let background = background(&cfg, &browser);

    let report = match shortcut {
        Some(shortcut) => background.handle_shortcut(shortcut).await,
        None => {
            let request = match request {
                RequestArg::Start => PopupRequest::OpenOverlayAndStart {
                    mode: mode.map(RecordingMode::from),
                },
                RequestArg::Settings => PopupRequest::OpenSettingsPanel,
            };
            background
                .handle_runtime_message(RuntimeMessage::Popup(request), None)
                .await
                .context("popup request produced no relay")?
        }
    };

    for (at, call) in browser.timeline() {
        info!("{:>6}ms  {:?}", at.as_millis(), call);
    }

    for attempt in &report.attempts {
        info!(
            "Attempt {} to tab {}: {:?}",
            attempt.retry, attempt.tab, attempt.outcome
        );
    }
    if let Some(injection) = &report.injection {
        info!(
            "Injection: {:?} after {} failed steps",
            injection.succeeded,
            injection.failures.len()
        );
    }

    match &report.error {
        None => info!("Delivered (banner shown: {})", report.banner_shown),
        Some(e) => warn!("Relay failed: {}", e),
    }

    Ok(())
}

async fn run_record(
    cfg: Config,
    duration: u64,
    countdown: Option<u32>,
    mode: Option<ModeArg>,
    output_dir: Option<String>,
) -> Result<()> {
    let browser = SimulatedBrowser::new(&cfg.extension.id);
    let tab = browser.open_tab("https://example.com/");

    let mut cfg = cfg;
    if let Some(seconds) = countdown {
        cfg.defaults.countdown_seconds = seconds;
    }
    let output_dir = output_dir.unwrap_or_else(|| cfg.output.downloads_path.clone());
    tokio::fs::create_dir_all(&output_dir)
        .await
        .with_context(|| format!("Failed to create {}", output_dir))?;

    let collab = collaborators(&cfg, &browser, &output_dir);
    let cameras = StreamAcquisition::new(Arc::clone(&collab.media))
        .list_cameras()
        .await;
    info!("{} cameras available", cameras.len());
    let history = Arc::clone(&collab.history);

    let orchestrator = SessionOrchestrator::new(cfg.session_config(), collab).await;
    let handle = orchestrator.spawn();
    browser.register_listener(tab, handle.listener());

    let background = background(&cfg, &browser);
    let report = background
        .handle_runtime_message(
            RuntimeMessage::Popup(PopupRequest::OpenOverlayAndStart {
                mode: mode.map(RecordingMode::from),
            }),
            None,
        )
        .await
        .context("popup request produced no relay")?;
    if let Some(e) = report.error {
        bail!("Could not reach the overlay: {}", e);
    }

    let countdown = u64::from(cfg.defaults.countdown_seconds);
    let recording = handle.wait_for(|s| s.status == SessionStatus::Recording);
    if tokio::time::timeout(Duration::from_secs(countdown + 10), recording)
        .await
        .ok()
        .flatten()
        .is_none()
    {
        bail!("Recording did not start");
    }

    info!("Recording for {} seconds", duration);
    tokio::time::sleep(Duration::from_secs(duration)).await;

    handle.action(OverlayAction::Stop).await?;
    let ready = handle.wait_for(|s| s.artifact_pending);
    let snapshot = tokio::time::timeout(Duration::from_secs(10), ready)
        .await
        .ok()
        .flatten()
        .context("Recording was not finalized")?;
    info!("Recording finalized after {}ms", snapshot.elapsed_ms);

    handle.action(OverlayAction::Save).await?;
    let saved = handle.wait_for(|s| !s.artifact_pending);
    if tokio::time::timeout(Duration::from_secs(10), saved)
        .await
        .ok()
        .flatten()
        .is_none()
    {
        bail!("Recording was not saved");
    }

    for entry in history.entries().await? {
        info!(
            "{}  {}  {}ms  {}",
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.filename,
            entry.duration_ms,
            entry.mime_type
        );
    }

    for (title, message) in browser.notifications() {
        info!("Notification [{}]: {}", title, message);
    }

    Ok(())
}
