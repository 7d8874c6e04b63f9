use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use super::config::RouterConfig;
use crate::error::{Error, HostError, Result};
use crate::host::{PageScript, Scripting, TabId};

/// One way of getting the overlay program into a page
#[async_trait]
pub trait FallbackStep: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, tab: TabId) -> Result<()>;
}

fn injection_failure(step: &'static str, err: HostError) -> Error {
    Error::InjectionFailure {
        step,
        reason: err.to_string(),
    }
}

/// Execute the packaged program file
pub struct FileInjection {
    scripting: Arc<dyn Scripting>,
    path: String,
}

impl FileInjection {
    pub fn new(scripting: Arc<dyn Scripting>, path: impl Into<String>) -> Self {
        Self {
            scripting,
            path: path.into(),
        }
    }
}

#[async_trait]
impl FallbackStep for FileInjection {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn run(&self, tab: TabId) -> Result<()> {
        self.scripting
            .inject_file(tab, &self.path)
            .await
            .map_err(|e| injection_failure(self.name(), e))
    }
}

/// Add a `<script>` tag that loads the program by URL, once per page
pub struct ScriptTagInjection {
    scripting: Arc<dyn Scripting>,
    path: String,
    marker_id: String,
}

impl ScriptTagInjection {
    pub fn new(
        scripting: Arc<dyn Scripting>,
        path: impl Into<String>,
        marker_id: impl Into<String>,
    ) -> Self {
        Self {
            scripting,
            path: path.into(),
            marker_id: marker_id.into(),
        }
    }
}

#[async_trait]
impl FallbackStep for ScriptTagInjection {
    fn name(&self) -> &'static str {
        "script-tag"
    }

    async fn run(&self, tab: TabId) -> Result<()> {
        let script = PageScript::ScriptLoader {
            marker_id: self.marker_id.clone(),
            src: self.scripting.resource_url(&self.path),
        };
        self.scripting
            .inject_function(tab, &script)
            .await
            .map_err(|e| injection_failure(self.name(), e))
    }
}

/// Legacy `tabs.executeScript` file injection
pub struct LegacyInjection {
    scripting: Arc<dyn Scripting>,
    path: String,
}

impl LegacyInjection {
    pub fn new(scripting: Arc<dyn Scripting>, path: impl Into<String>) -> Self {
        Self {
            scripting,
            path: path.into(),
        }
    }
}

#[async_trait]
impl FallbackStep for LegacyInjection {
    fn name(&self) -> &'static str {
        "legacy"
    }

    async fn run(&self, tab: TabId) -> Result<()> {
        self.scripting
            .inject_legacy(tab, &self.path)
            .await
            .map_err(|e| injection_failure(self.name(), e))
    }
}

/// Outcome of a fallback run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackReport {
    /// Name of the step that succeeded, if any
    pub succeeded: Option<&'static str>,
    /// Failures of the steps tried before it
    pub failures: Vec<Error>,
}

impl FallbackReport {
    pub fn is_success(&self) -> bool {
        self.succeeded.is_some()
    }

    pub fn attempted(&self) -> usize {
        self.failures.len() + usize::from(self.succeeded.is_some())
    }
}

/// Tries steps in order until one succeeds
#[derive(Default)]
pub struct FallbackRunner {
    steps: Vec<Box<dyn FallbackStep>>,
}

impl FallbackRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: impl FallbackStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub async fn run(&self, tab: TabId) -> FallbackReport {
        let mut report = FallbackReport::default();

        for step in &self.steps {
            match step.run(tab).await {
                Ok(()) => {
                    info!("Injected overlay into tab {} ({})", tab, step.name());
                    report.succeeded = Some(step.name());
                    break;
                }
                Err(e) => {
                    warn!("{}", e);
                    report.failures.push(e);
                }
            }
        }

        if !report.is_success() {
            warn!("All injection steps failed for tab {}", tab);
        }

        report
    }
}

/// File injection, then script tag, then the legacy API
pub fn injection_pipeline(scripting: Arc<dyn Scripting>, config: &RouterConfig) -> FallbackRunner {
    FallbackRunner::new()
        .step(FileInjection::new(
            Arc::clone(&scripting),
            config.content_script.clone(),
        ))
        .step(ScriptTagInjection::new(
            Arc::clone(&scripting),
            config.content_script.clone(),
            config.loader_marker_id.clone(),
        ))
        .step(LegacyInjection::new(scripting, config.content_script.clone()))
}
