//! Temporary artifact lifecycle
//!
//! A [`TempArtifact`] is the on-disk copy of one request's upload. It is created
//! under a fresh UUID name (so concurrent requests never share a path) and is
//! deleted exactly once: explicitly via [`TempArtifact::release`], or by `Drop`
//! when the owning request exits early, fails, or its future is dropped on
//! client disconnect. Deletion failures are logged and never propagated.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// RAII guard owning a request-scoped temporary file
#[derive(Debug)]
pub struct TempArtifact {
    id: Uuid,
    path: PathBuf,
    released: bool,
}

impl TempArtifact {
    /// Create a new empty artifact in `dir`
    ///
    /// `dir` must be absolute. The file is opened with `create_new`, so an
    /// existing file is never reused or truncated.
    pub async fn create(dir: &Path, extension: &str) -> io::Result<(Self, File)> {
        if !dir.is_absolute() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Artifact directory must be absolute: {}", dir.display()),
            ));
        }

        let id = Uuid::new_v4();
        let file_name = if extension.is_empty() {
            id.to_string()
        } else {
            format!("{}.{}", id, extension)
        };
        let path = dir.join(file_name);

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        debug!(artifact_id = %id, path = %path.display(), "Temporary artifact created");

        Ok((
            Self {
                id,
                path,
                released: false,
            },
            file,
        ))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Absolute path of the artifact
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the artifact now
    ///
    /// Never fails: a missing file counts as released, other errors are logged.
    pub async fn release(mut self) {
        self.released = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => info!(artifact_id = %self.id, path = %self.path.display(), "Cleaned up artifact"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                artifact_id = %self.id,
                path = %self.path.display(),
                error = %e,
                "Failed to remove temporary artifact"
            ),
        }
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!(
                artifact_id = %self.id,
                path = %self.path.display(),
                "Cleaned up artifact on early exit"
            ),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                artifact_id = %self.id,
                path = %self.path.display(),
                error = %e,
                "Failed to remove temporary artifact"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_release_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let (artifact, mut file) = TempArtifact::create(dir.path(), "pdf").await.unwrap();
        file.write_all(b"%PDF-1.4").await.unwrap();
        drop(file);

        let path = artifact.path().to_path_buf();
        assert!(path.is_absolute());
        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "pdf");

        artifact.release().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let (artifact, _file) = TempArtifact::create(dir.path(), "pdf").await.unwrap();
            artifact.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_release_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let (artifact, file) = TempArtifact::create(dir.path(), "pdf").await.unwrap();
        drop(file);
        std::fs::remove_file(artifact.path()).unwrap();

        artifact.release().await;
    }

    #[tokio::test]
    async fn test_unique_paths() {
        let dir = tempfile::tempdir().unwrap();
        let (a, _fa) = TempArtifact::create(dir.path(), "pdf").await.unwrap();
        let (b, _fb) = TempArtifact::create(dir.path(), "pdf").await.unwrap();
        assert_ne!(a.path(), b.path());
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_relative_dir_rejected() {
        let result = TempArtifact::create(Path::new("data"), "pdf").await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidInput);
    }
}
