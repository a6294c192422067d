//! Stage contract

use super::execution::StageCall;
use crate::document::DocumentCache;
use crate::model::ModelError;
use crate::models::{AnalysisRequest, StageKind, StageResult};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Input handed to each stage
#[derive(Debug, Clone)]
pub struct StageInput {
    pub request: Arc<AnalysisRequest>,
    /// Result of the immediately preceding stage (`None` for the first stage)
    pub previous: Option<StageResult>,
    /// Document text shared across the stages of one run
    pub document: Arc<DocumentCache>,
}

impl StageInput {
    /// Input for the first stage of a run
    pub fn first(request: Arc<AnalysisRequest>) -> Self {
        Self {
            request,
            previous: None,
            document: Arc::new(DocumentCache::new()),
        }
    }
}

/// Stage failure
#[derive(Debug, Error)]
pub enum StageError {
    /// External model call failed or returned garbage
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Deferred result did not resolve within the bound
    #[error("Stage did not complete within {}s", .0.as_secs())]
    Timeout(Duration),

    /// Request cancelled (caller disconnected)
    #[error("Stage cancelled")]
    Cancelled,

    /// Artifact could not be read as a document
    #[error("Document could not be read: {0}")]
    Document(String),

    /// Stage determined the document is unsuitable for analysis
    #[error("Document rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// One pipeline stage
///
/// `invoke` may produce its result immediately or hand back a deferred
/// computation; the runner never distinguishes the two. Stages read the
/// artifact and must never modify it.
pub trait AnalysisStage: Send + Sync {
    fn kind(&self) -> StageKind;

    fn invoke(&self, input: StageInput) -> StageCall<serde_json::Value>;
}
