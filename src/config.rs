use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::recorder::RecorderOptions;
use crate::router::RouterConfig;
use crate::session::{SessionConfig, Settings};

/// Top-level configuration
///
/// Every section is optional; missing keys keep their defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub extension: ExtensionConfig,
    pub router: RouterConfig,
    pub recorder: RecorderOptions,
    /// Settings used until the user saves their own
    pub defaults: Settings,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtensionConfig {
    pub id: String,
    pub name: String,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            id: "prorecorder".to_string(),
            name: "ProRecorder".to_string(),
        }
    }
}

/// Where saved recordings and the history end up
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub downloads_path: String,
    pub history_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            downloads_path: "recordings".to_string(),
            history_path: "recordings/history.json".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Router configuration with notifications titled after the extension
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            notification_title: self.extension.name.clone(),
            ..self.router.clone()
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            recorder: self.recorder.clone(),
            notification_title: self.extension.name.clone(),
        }
    }
}
