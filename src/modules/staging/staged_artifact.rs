//! Request-scoped temporary files
//!
//! A `StagedArtifact` owns exactly one file on disk. The file is removed either
//! by an explicit `release()` or, if the owning request bails out early, panics,
//! times out or is dropped because the client went away, by `Drop`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Errors that can occur while staging an upload
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("Failed to create staging directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write staged file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Directory where uploads are staged while a request is in flight
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the staging directory if it does not exist yet
    pub async fn ensure_dir(&self) -> Result<(), StagingError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StagingError::CreateDir {
                path: self.dir.clone(),
                source,
            })
    }

    /// Write the full payload to a fresh, uniquely named file
    ///
    /// The returned handle already owns the path before the first byte is
    /// written, so a failed write never leaves a partial file behind.
    pub async fn stage(&self, bytes: &[u8]) -> Result<StagedArtifact, StagingError> {
        let path = self.dir.join(format!("upload-{}.pdf", Uuid::now_v7()));

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|source| StagingError::Write {
                path: path.clone(),
                source,
            })?;

        let artifact = StagedArtifact {
            path,
            released: false,
        };

        let write_result = match file.write_all(bytes).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };

        if let Err(source) = write_result {
            return Err(StagingError::Write {
                path: artifact.path.clone(),
                source,
            });
        }

        debug!(
            "Staged {} bytes at {}",
            bytes.len(),
            artifact.path.display()
        );

        Ok(artifact)
    }
}

/// A temporary copy of an uploaded document, owned by one request
#[derive(Debug)]
pub struct StagedArtifact {
    path: PathBuf,
    released: bool,
}

impl StagedArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file. Failures are logged, never returned.
    pub async fn release(mut self) {
        self.released = true;

        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!("Removed staged file {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Staged file {} was already gone", self.path.display())
            }
            Err(e) => warn!(
                "Failed to remove staged file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

impl Drop for StagedArtifact {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(
                "Removed staged file {} on early exit",
                self.path.display()
            ),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove staged file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_stage_writes_full_payload() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path());

        let artifact = staging.stage(b"%PDF-1.4 hello").await.unwrap();

        assert!(artifact.path().starts_with(dir.path()));
        assert_eq!(std::fs::read(artifact.path()).unwrap(), b"%PDF-1.4 hello");

        artifact.release().await;
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_paths_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path());

        let first = staging.stage(b"a").await.unwrap();
        let second = staging.stage(b"b").await.unwrap();

        assert_ne!(first.path(), second.path());
        assert_eq!(staged_files(dir.path()), 2);
    }

    #[tokio::test]
    async fn test_drop_removes_unreleased_file() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path());

        let artifact = staging.stage(b"data").await.unwrap();
        let path = artifact.path().to_path_buf();
        drop(artifact);

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_release_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path());

        let artifact = staging.stage(b"data").await.unwrap();
        std::fs::remove_file(artifact.path()).unwrap();

        // Must not panic or error
        artifact.release().await;
    }

    #[tokio::test]
    async fn test_stage_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path().join("missing"));

        let result = staging.stage(b"data").await;
        assert!(matches!(result, Err(StagingError::Write { .. })));
    }

    #[tokio::test]
    async fn test_ensure_dir_creates_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path().join("nested/uploads"));

        staging.ensure_dir().await.unwrap();
        assert!(staging.dir().is_dir());
    }
}
