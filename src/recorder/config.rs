use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Container and codecs requested from the encoder
pub const DEFAULT_MIME_TYPE: &str = "video/webm;codecs=vp9,opus";

/// How often the encoder emits a fragment
pub const CHUNK_INTERVAL: Duration = Duration::from_millis(250);

/// How long to wait for the encoder to flush after stop
pub const FLUSH_TIMEOUT: Duration = Duration::from_millis(2000);

/// Configuration for the recorder engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderOptions {
    /// MIME type of every fragment and of the final artifact
    pub mime_type: String,

    /// Fragment interval in milliseconds
    /// Default: 250
    pub chunk_interval_ms: u64,

    /// Upper bound on the final flush; the artifact is built from whatever
    /// arrived when it expires
    /// Default: 2000
    pub flush_timeout_ms: u64,
}

impl RecorderOptions {
    pub fn chunk_interval(&self) -> Duration {
        Duration::from_millis(self.chunk_interval_ms)
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self {
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            chunk_interval_ms: CHUNK_INTERVAL.as_millis() as u64,
            flush_timeout_ms: FLUSH_TIMEOUT.as_millis() as u64,
        }
    }
}
