pub mod acquisition;
pub mod stream;

pub use acquisition::{CaptureKind, StreamAcquisition};
pub use stream::{CaptureStream, MediaTrack, TrackKind};
