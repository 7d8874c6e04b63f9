use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::info;

use crate::recorder::Artifact;

/// What an artifact is, used for file naming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Recording,
    Screenshot,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Recording => "recording",
            ArtifactKind::Screenshot => "screenshot",
        }
    }
}

/// Saves artifacts for the user (the browser downloads API)
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Save `artifact`, returning the file name it was stored under
    async fn save(&self, artifact: &Artifact, kind: ArtifactKind) -> Result<String>;
}

/// A saved recording, as shown in the history list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub filename: String,
    pub mime_type: String,
}

/// Recording history bookkeeping
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn record(&self, entry: HistoryEntry) -> Result<()>;

    async fn entries(&self) -> Result<Vec<HistoryEntry>>;
}

/// Writes artifacts into a directory
pub struct FileDownloadSink {
    output_dir: PathBuf,
}

impl FileDownloadSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn file_name(artifact: &Artifact, kind: ArtifactKind) -> String {
        format!(
            "prorecorder-{}-{}.{}",
            kind.as_str(),
            artifact.created_at().format("%Y%m%d-%H%M%S%3f"),
            artifact.file_extension()
        )
    }
}

#[async_trait]
impl DownloadSink for FileDownloadSink {
    async fn save(&self, artifact: &Artifact, kind: ArtifactKind) -> Result<String> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .context("Failed to create download directory")?;

        let file_name = Self::file_name(artifact, kind);
        let path = self.output_dir.join(&file_name);

        tokio::fs::write(&path, artifact.data())
            .await
            .with_context(|| format!("Failed to write {:?}", path))?;

        info!("Saved {} ({} bytes) to {:?}", kind.as_str(), artifact.size(), path);

        Ok(file_name)
    }
}

/// History kept in memory
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn record(&self, entry: HistoryEntry) -> Result<()> {
        self.entries.lock().await.push(entry);
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.entries.lock().await.clone())
    }
}

/// History persisted as a JSON array, newest last
pub struct JsonHistoryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<HistoryEntry>> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let json = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read history file: {}", self.path.display()))?;

        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse history file: {}", self.path.display()))
    }
}

#[async_trait]
impl HistoryStore for JsonHistoryStore {
    async fn record(&self, entry: HistoryEntry) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut entries = self.load().await?;
        entries.push(entry);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write beside the file and rename over it so a partial write never
        // replaces the previous history
        let json = serde_json::to_string_pretty(&entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write history file: {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace history file: {}", self.path.display()))?;

        Ok(())
    }

    async fn entries(&self) -> Result<Vec<HistoryEntry>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(id: &str) -> HistoryEntry {
        HistoryEntry {
            id: id.to_string(),
            created_at: Utc::now(),
            duration_ms: 1500,
            filename: format!("prorecorder-recording-{}.webm", id),
            mime_type: "video/webm".to_string(),
        }
    }

    #[tokio::test]
    async fn test_history_replaces_file_without_leftovers() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("history.json");
        let store = JsonHistoryStore::new(&path);

        // Leftover from an interrupted write
        std::fs::write(dir.path().join("history.json.tmp"), "[{\"id\":")?;

        store.record(entry("a")).await?;
        store.record(entry("b")).await?;

        let on_disk: Vec<HistoryEntry> = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        let ids: Vec<&str> = on_disk.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(store.entries().await?, on_disk);

        let files: Vec<String> = std::fs::read_dir(dir.path())?
            .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<std::io::Result<_>>()?;
        assert_eq!(files, vec!["history.json"], "Temp file is renamed away");

        Ok(())
    }

    #[tokio::test]
    async fn test_history_starts_empty() -> Result<()> {
        let dir = TempDir::new()?;
        let store = JsonHistoryStore::new(dir.path().join("nested").join("history.json"));

        assert!(store.entries().await?.is_empty());
        store.record(entry("a")).await?;
        assert_eq!(store.entries().await?.len(), 1);

        Ok(())
    }
}
