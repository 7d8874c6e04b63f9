use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::recorder::RecorderOptions;

/// Interval between countdown ticks
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// Interval between elapsed-time updates while recording
pub const PROGRESS_TICK: Duration = Duration::from_secs(1);

/// Configuration for the page's session orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Recorder engine options used for every new recording
    pub recorder: RecorderOptions,

    /// Title of recording notifications
    pub notification_title: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            recorder: RecorderOptions::default(),
            notification_title: "ProRecorder".to_string(),
        }
    }
}
