use async_trait::async_trait;
use std::time::Duration;

use super::tabs::TabId;
use crate::error::HostError;

/// Self-contained program executed inside a page by function injection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageScript {
    /// Append a `<script src>` tag unless an element with `marker_id` exists
    ScriptLoader { marker_id: String, src: String },

    /// Show a transient banner unless an element with `element_id` exists
    FeedbackBanner {
        element_id: String,
        text: String,
        lifetime: Duration,
    },
}

impl PageScript {
    pub fn name(&self) -> &'static str {
        match self {
            PageScript::ScriptLoader { .. } => "script-loader",
            PageScript::FeedbackBanner { .. } => "feedback-banner",
        }
    }
}

/// Code injection primitive
#[async_trait]
pub trait Scripting: Send + Sync {
    /// Execute a packaged script file in the page (`scripting.executeScript` with files)
    async fn inject_file(&self, tab: TabId, path: &str) -> Result<(), HostError>;

    /// Execute a page function (`scripting.executeScript` with func)
    async fn inject_function(&self, tab: TabId, script: &PageScript) -> Result<(), HostError>;

    /// Execute a script file through the legacy `tabs.executeScript` API
    async fn inject_legacy(&self, _tab: TabId, _path: &str) -> Result<(), HostError> {
        Err(HostError::Unsupported("tabs.executeScript".to_string()))
    }

    /// Absolute URL of a packaged resource
    fn resource_url(&self, path: &str) -> String;
}
