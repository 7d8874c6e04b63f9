//! Recorder engine
//!
//! Wraps a capture stream into a chunked recording and produces the final
//! artifact.

pub mod artifact;
pub mod config;
pub mod engine;

pub use artifact::Artifact;
pub use config::{RecorderOptions, CHUNK_INTERVAL, DEFAULT_MIME_TYPE, FLUSH_TIMEOUT};
pub use engine::{RecorderEngine, RecorderState};
