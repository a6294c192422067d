//! Upload session state
//!
//! One session exists per in-flight request: RECEIVING → COMPLETE | REJECTED.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Upload session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UploadStatus {
    /// Chunks are being written to the artifact
    Receiving,
    /// All chunks written within the ceiling
    Complete,
    /// Intake aborted (ceiling exceeded or transport/IO failure)
    Rejected,
}

/// Per-request upload tracking
#[derive(Debug, Clone, Serialize)]
pub struct UploadSession {
    /// Unique per request; also names the temporary artifact
    pub session_id: Uuid,

    /// Filename supplied by the caller
    pub filename: String,

    /// Bytes actually received so far (declared lengths are never trusted)
    pub bytes_received: u64,

    /// Absolute path of the temporary artifact
    pub artifact_path: PathBuf,

    pub status: UploadStatus,

    pub started_at: DateTime<Utc>,

    /// Set when the session leaves RECEIVING
    pub finalized_at: Option<DateTime<Utc>>,
}

impl UploadSession {
    pub fn new(session_id: Uuid, filename: impl Into<String>, artifact_path: &Path) -> Self {
        Self {
            session_id,
            filename: filename.into(),
            bytes_received: 0,
            artifact_path: artifact_path.to_path_buf(),
            status: UploadStatus::Receiving,
            started_at: Utc::now(),
            finalized_at: None,
        }
    }

    /// Account for a received chunk, returning the new cumulative count
    pub fn record_chunk(&mut self, len: usize) -> u64 {
        self.bytes_received = self.bytes_received.saturating_add(len as u64);
        self.bytes_received
    }

    pub fn complete(&mut self) {
        self.finalize(UploadStatus::Complete);
    }

    pub fn reject(&mut self) {
        self.finalize(UploadStatus::Rejected);
    }

    fn finalize(&mut self, status: UploadStatus) {
        self.status = status;
        self.finalized_at = Some(Utc::now());
    }

    pub fn is_finalized(&self) -> bool {
        self.status != UploadStatus::Receiving
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let mut session = UploadSession::new(Uuid::new_v4(), "report.pdf", Path::new("/tmp/x.pdf"));
        assert_eq!(session.status, UploadStatus::Receiving);
        assert!(!session.is_finalized());

        assert_eq!(session.record_chunk(10), 10);
        assert_eq!(session.record_chunk(5), 15);

        session.complete();
        assert_eq!(session.status, UploadStatus::Complete);
        assert!(session.finalized_at.is_some());
    }
}
