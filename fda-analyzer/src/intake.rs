//! Size-bounded upload intake
//!
//! Streams an upload into a [`TempArtifact`] in fixed-size increments without
//! holding the payload in memory. The byte ceiling is enforced against bytes
//! actually received while streaming; declared content lengths are ignored.

use crate::artifact::TempArtifact;
use crate::models::UploadSession;
use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use fda_common::format_bytes;
use futures::{Stream, StreamExt};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Default upload ceiling (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Default write increment (1 MiB)
pub const DEFAULT_CHUNK_BYTES: usize = 1024 * 1024;

/// Intake limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeLimits {
    /// Hard ceiling on cumulative bytes
    pub max_bytes: u64,
    /// Size of each write to the artifact
    pub chunk_bytes: usize,
}

impl IntakeLimits {
    pub fn new(max_bytes: u64, chunk_bytes: usize) -> Self {
        Self {
            max_bytes,
            chunk_bytes: chunk_bytes.max(1),
        }
    }
}

impl Default for IntakeLimits {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_CHUNK_BYTES)
    }
}

/// Intake failure
#[derive(Debug, Error)]
pub enum IntakeError {
    /// Cumulative bytes exceeded the ceiling
    #[error("Uploaded file too large (max {})", format_bytes(*.limit))]
    PayloadTooLarge { limit: u64 },

    /// The inbound body could not be read (malformed multipart, dropped connection)
    #[error("Upload stream failed: {0}")]
    Transport(String),

    /// Writing the artifact failed
    #[error("Artifact IO error: {0}")]
    Io(#[from] io::Error),
}

impl IntakeError {
    /// Map a multipart error, recognizing body-limit breaches
    pub fn from_multipart(err: MultipartError, limit: u64) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            IntakeError::PayloadTooLarge { limit }
        } else {
            IntakeError::Transport(err.body_text())
        }
    }
}

/// A finalized upload: COMPLETE session plus the artifact guard
#[derive(Debug)]
pub struct IntakeOutcome {
    pub session: UploadSession,
    pub artifact: TempArtifact,
}

/// Streams uploads into request-scoped artifacts under `upload_dir`
#[derive(Debug, Clone)]
pub struct Intake {
    upload_dir: PathBuf,
    limits: IntakeLimits,
}

impl Intake {
    /// `upload_dir` must be absolute and exist
    pub fn new(upload_dir: PathBuf, limits: IntakeLimits) -> Self {
        Self { upload_dir, limits }
    }

    pub fn limits(&self) -> IntakeLimits {
        self.limits
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Stream `chunks` into a fresh artifact
    ///
    /// On any failure the partial artifact is deleted before returning.
    pub async fn accept<S>(&self, filename: &str, chunks: S) -> Result<IntakeOutcome, IntakeError>
    where
        S: Stream<Item = Result<Bytes, IntakeError>>,
    {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let (artifact, file) = TempArtifact::create(&self.upload_dir, &extension).await?;
        let mut session = UploadSession::new(artifact.id(), filename, artifact.path());

        match self.write_bounded(&mut session, file, chunks).await {
            Ok(()) => {
                session.complete();
                info!(
                    session_id = %session.session_id,
                    filename = %session.filename,
                    bytes = session.bytes_received,
                    "File saved: {} ({})",
                    session.artifact_path.display(),
                    format_bytes(session.bytes_received)
                );
                Ok(IntakeOutcome { session, artifact })
            }
            Err(e) => {
                session.reject();
                warn!(
                    session_id = %session.session_id,
                    filename = %session.filename,
                    bytes = session.bytes_received,
                    error = %e,
                    "Upload rejected"
                );
                artifact.release().await;
                Err(e)
            }
        }
    }

    async fn write_bounded<S>(
        &self,
        session: &mut UploadSession,
        mut file: File,
        chunks: S,
    ) -> Result<(), IntakeError>
    where
        S: Stream<Item = Result<Bytes, IntakeError>>,
    {
        futures::pin_mut!(chunks);

        let chunk_bytes = self.limits.chunk_bytes;
        let mut buffer: Vec<u8> = Vec::with_capacity(chunk_bytes);

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;

            if session.record_chunk(chunk.len()) > self.limits.max_bytes {
                return Err(IntakeError::PayloadTooLarge {
                    limit: self.limits.max_bytes,
                });
            }

            let mut remaining: &[u8] = &chunk;
            while !remaining.is_empty() {
                let take = (chunk_bytes - buffer.len()).min(remaining.len());
                buffer.extend_from_slice(&remaining[..take]);
                remaining = &remaining[take..];

                if buffer.len() == chunk_bytes {
                    file.write_all(&buffer).await?;
                    buffer.clear();
                }
            }
        }

        if !buffer.is_empty() {
            file.write_all(&buffer).await?;
        }
        file.flush().await?;

        Ok(())
    }
}
