//! Local filesystem archive.
//!
//! Used when no bucket is configured. Keys map to paths under the root
//! directory; writes go through a temp file and a rename.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::{ArchiveBackend, fingerprint};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalArchive {
    root_dir: PathBuf,
}

impl LocalArchive {
    /// Create a new LocalArchive rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> std::io::Result<()> {
        let path = self.path(key);
        Self::ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> std::io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl ArchiveBackend for LocalArchive {
    async fn latest_fingerprint(&self, key: &str) -> Result<Option<String>> {
        let bytes = self
            .read_bytes(key)
            .await
            .map_err(|e| AppError::archive(key, e))?;
        Ok(bytes.map(|b| fingerprint(&b)))
    }

    async fn write_latest(&self, key: &str, payload: &[u8], _fingerprint: &str) -> Result<()> {
        self.write_bytes(key, payload)
            .await
            .map_err(|e| AppError::archive(key, e))
    }

    async fn copy_to_history(&self, from: &str, to: &str) -> Result<()> {
        let bytes = self
            .read_bytes(from)
            .await
            .map_err(|e| AppError::archive(from, e))?
            .ok_or_else(|| AppError::archive(from, "latest snapshot missing"))?;
        self.write_bytes(to, &bytes)
            .await
            .map_err(|e| AppError::archive(to, e))
    }

    fn location(&self, key: &str) -> String {
        self.path(key).display().to_string()
    }
}
