use std::sync::Arc;
use tokio::sync::watch;

/// Kind of media carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Video,
    Audio,
}

/// Handle to one live media track
///
/// Clones share the same underlying track: stopping any clone ends it for
/// all of them.
#[derive(Debug, Clone)]
pub struct MediaTrack {
    id: String,
    kind: TrackKind,
    label: String,
    ended: Arc<watch::Sender<bool>>,
}

impl MediaTrack {
    pub fn new(id: impl Into<String>, kind: TrackKind, label: impl Into<String>) -> Self {
        let (ended, _) = watch::channel(false);
        Self {
            id: id.into(),
            kind,
            label: label.into(),
            ended: Arc::new(ended),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_ended(&self) -> bool {
        *self.ended.borrow()
    }

    /// Stop the track. Safe to call more than once.
    pub fn stop(&self) {
        self.ended.send_replace(true);
    }

    /// Resolves once the track has ended, either by `stop` or by the platform
    /// (for instance the user pressing "Stop sharing").
    pub async fn ended(&self) {
        let mut rx = self.ended.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = rx.wait_for(|ended| *ended).await;
    }
}

/// A live capture stream with a fixed set of tracks
///
/// Not `Clone`: the owner is responsible for stopping every track.
#[derive(Debug)]
pub struct CaptureStream {
    id: String,
    tracks: Vec<MediaTrack>,
}

impl CaptureStream {
    pub fn new(id: impl Into<String>, tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: id.into(),
            tracks,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn video_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind == TrackKind::Video)
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind == TrackKind::Audio)
    }

    /// True while at least one track is live
    pub fn is_active(&self) -> bool {
        self.tracks.iter().any(|t| !t.is_ended())
    }

    /// Stop every track
    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_all_is_idempotent() {
        let stream = CaptureStream::new(
            "s1",
            vec![
                MediaTrack::new("v", TrackKind::Video, "screen"),
                MediaTrack::new("a", TrackKind::Audio, "system"),
            ],
        );
        assert!(stream.is_active());

        stream.stop_all();
        stream.stop_all();

        assert!(!stream.is_active());
        assert!(stream.tracks().iter().all(|t| t.is_ended()));
    }

    #[tokio::test]
    async fn test_ended_resolves_for_clones() {
        let track = MediaTrack::new("v", TrackKind::Video, "screen");
        let clone = track.clone();

        let waiter = tokio::spawn(async move { clone.ended().await });
        track.stop();

        waiter.await.expect("waiter task panicked");
        assert!(track.is_ended());
    }
}
