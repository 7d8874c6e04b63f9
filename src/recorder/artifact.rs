use chrono::{DateTime, Utc};
use std::time::Duration;

/// Finalized recording: one blob, its MIME type and duration
#[derive(Debug, Clone)]
pub struct Artifact {
    data: Vec<u8>,
    mime_type: String,
    duration: Duration,
    chunk_count: usize,
    created_at: DateTime<Utc>,
}

impl Artifact {
    /// Concatenate `chunks` in arrival order
    pub fn from_chunks(chunks: &[Vec<u8>], mime_type: &str, duration: Duration) -> Self {
        let size: usize = chunks.iter().map(Vec::len).sum();
        let mut data = Vec::with_capacity(size);
        for chunk in chunks {
            data.extend_from_slice(chunk);
        }

        Self {
            data,
            mime_type: mime_type.to_string(),
            duration,
            chunk_count: chunks.len(),
            created_at: Utc::now(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// File extension for the container, e.g. "webm" for `video/webm;codecs=vp9`
    pub fn file_extension(&self) -> &str {
        let essence = self.mime_type.split(';').next().unwrap_or_default().trim();
        match essence.split('/').nth(1) {
            Some("x-matroska") => "mkv",
            Some("mpeg") if essence.starts_with("audio/") => "mp3",
            Some(subtype) if !subtype.is_empty() => subtype,
            _ => "bin",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_concatenate_in_order() {
        let chunks = vec![b"ab".to_vec(), b"cd".to_vec(), b"e".to_vec()];
        let artifact = Artifact::from_chunks(&chunks, "video/webm", Duration::from_millis(750));

        assert_eq!(artifact.data(), b"abcde");
        assert_eq!(artifact.chunk_count(), 3);
        assert_eq!(artifact.duration_ms(), 750);
    }

    #[test]
    fn test_file_extension_from_mime() {
        let ext = |mime: &str| {
            Artifact::from_chunks(&[], mime, Duration::ZERO)
                .file_extension()
                .to_string()
        };

        assert_eq!(ext("video/webm;codecs=vp9,opus"), "webm");
        assert_eq!(ext("video/mp4"), "mp4");
        assert_eq!(ext("video/x-matroska;codecs=avc1"), "mkv");
        assert_eq!(ext("audio/mpeg"), "mp3");
        assert_eq!(ext(""), "bin");
    }
}
