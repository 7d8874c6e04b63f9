use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Direct delivery attempts before injecting the overlay program
pub const RETRY_ATTEMPTS: u32 = 3;

/// Pause after each failed direct delivery attempt
pub const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Time given to an injected program to register its listener
pub const INJECTION_SETTLE: Duration = Duration::from_millis(1000);

/// How long the acknowledgement banner stays on the page
pub const BANNER_LIFETIME: Duration = Duration::from_millis(2200);

/// Upper bound for a single send
pub const SEND_TIMEOUT: Duration = Duration::from_millis(5000);

pub const CONTENT_SCRIPT_PATH: &str = "content-scripts/content.js";
pub const LOADER_MARKER_ID: &str = "prorecorder-content-loader";
pub const BANNER_ELEMENT_ID: &str = "prorecorder-feedback-banner";

/// Configuration for the control-plane router
///
/// The timing values are empirical and default to the constants above.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
    pub settle_delay_ms: u64,
    pub banner_lifetime_ms: u64,
    pub send_timeout_ms: u64,

    /// Packaged overlay program injected into pages
    pub content_script: String,

    /// DOM id guarding the script-tag fallback against double injection
    pub loader_marker_id: String,

    pub banner_element_id: String,
    pub banner_text: String,

    /// Title of control-plane notifications
    pub notification_title: String,
}

impl RouterConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn banner_lifetime(&self) -> Duration {
        Duration::from_millis(self.banner_lifetime_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            retry_attempts: RETRY_ATTEMPTS,
            retry_backoff_ms: RETRY_BACKOFF.as_millis() as u64,
            settle_delay_ms: INJECTION_SETTLE.as_millis() as u64,
            banner_lifetime_ms: BANNER_LIFETIME.as_millis() as u64,
            send_timeout_ms: SEND_TIMEOUT.as_millis() as u64,
            content_script: CONTENT_SCRIPT_PATH.to_string(),
            loader_marker_id: LOADER_MARKER_ID.to_string(),
            banner_element_id: BANNER_ELEMENT_ID.to_string(),
            banner_text: "Opening ProRecorder…".to_string(),
            notification_title: "ProRecorder".to_string(),
        }
    }
}
