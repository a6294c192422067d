//! Error classification for fda-analyzer
//!
//! Every failure raised while handling a request is wrapped in an
//! [`AnalysisFailure`] and converted by [`classify`] into a [`ClassifiedError`]
//! from a closed taxonomy before it reaches the caller. [`record`] additionally
//! logs the full diagnostic chain server-side.
//!
//! | Kind                 | HTTP |
//! |----------------------|------|
//! | `ValidationError`    | 400  |
//! | `PayloadTooLarge`    | 413  |
//! | `UpstreamModelError` | 422  |
//! | `UpstreamTimeout`    | 504  |
//! | `InternalError`      | 500  |

use crate::intake::IntakeError;
use crate::model::ModelError;
use crate::models::StageKind;
use crate::pipeline::{PipelineFailure, StageError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use thiserror::Error;
use tracing::error;

/// Message returned for unclassified faults
const INTERNAL_ERROR_MESSAGE: &str = "Unexpected error processing document.";

/// Closed error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    ValidationError,
    PayloadTooLarge,
    UpstreamModelError,
    UpstreamTimeout,
    InternalError,
}

impl ErrorKind {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
            ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::UpstreamModelError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ErrorKind::UpstreamModelError => "UPSTREAM_MODEL_ERROR",
            ErrorKind::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            ErrorKind::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Any failure raised while handling an analysis request
#[derive(Debug, Error)]
pub enum AnalysisFailure {
    /// Missing or invalid request fields
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error(transparent)]
    Pipeline(Box<PipelineFailure>),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<PipelineFailure> for AnalysisFailure {
    fn from(failure: PipelineFailure) -> Self {
        AnalysisFailure::Pipeline(Box::new(failure))
    }
}

/// Caller-safe, taxonomy-tagged error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    /// Human-readable detail safe to return to the caller
    pub detail: String,
    /// Originating stage, when the failure came from the pipeline
    pub stage: Option<StageKind>,
    /// Original detail for unclassified faults; logged, never serialized
    #[serde(skip)]
    pub diagnostic: Option<String>,
}

impl ClassifiedError {
    fn new(kind: ErrorKind, detail: impl Into<String>, stage: Option<StageKind>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            stage,
            diagnostic: None,
        }
    }

    fn internal(diagnostic: String, stage: Option<StageKind>) -> Self {
        Self {
            kind: ErrorKind::InternalError,
            detail: INTERNAL_ERROR_MESSAGE.to_string(),
            stage,
            diagnostic: Some(diagnostic),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage {
            Some(stage) => write!(f, "{} in stage '{}': {}", self.kind, stage, self.detail),
            None => write!(f, "{}: {}", self.kind, self.detail),
        }
    }
}

impl IntoResponse for ClassifiedError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "status": "error",
            "error": {
                "code": self.kind.code(),
                "kind": self.kind,
                "message": self.detail,
                "stage": self.stage,
            }
        }));

        (self.kind.status(), body).into_response()
    }
}

/// Map a failure to the taxonomy
///
/// Pure and infallible; unrecognized failures become `InternalError` with the
/// original detail kept in `diagnostic`.
pub fn classify(failure: &AnalysisFailure) -> ClassifiedError {
    match failure {
        AnalysisFailure::Validation(detail) => {
            ClassifiedError::new(ErrorKind::ValidationError, detail.clone(), None)
        }
        AnalysisFailure::Intake(intake) => classify_intake(intake),
        AnalysisFailure::Pipeline(pipeline) => classify_stage(&pipeline.error, Some(pipeline.stage)),
        AnalysisFailure::Internal(err) => classify_opaque(format!("{:#}", err), None),
    }
}

fn classify_intake(error: &IntakeError) -> ClassifiedError {
    match error {
        IntakeError::PayloadTooLarge { .. } => {
            ClassifiedError::new(ErrorKind::PayloadTooLarge, error.to_string(), None)
        }
        IntakeError::Transport(detail) => ClassifiedError::new(
            ErrorKind::ValidationError,
            format!("Malformed upload: {}", detail),
            None,
        ),
        IntakeError::Io(_) => ClassifiedError::internal(error.to_string(), None),
    }
}

fn classify_stage(error: &StageError, stage: Option<StageKind>) -> ClassifiedError {
    match error {
        StageError::Model(ModelError::Timeout(_)) => {
            ClassifiedError::new(ErrorKind::UpstreamTimeout, error.to_string(), stage)
        }
        StageError::Model(model) => {
            ClassifiedError::new(ErrorKind::UpstreamModelError, model.to_string(), stage)
        }
        StageError::Timeout(_) => {
            ClassifiedError::new(ErrorKind::UpstreamTimeout, error.to_string(), stage)
        }
        StageError::Document(_) | StageError::Rejected(_) => {
            ClassifiedError::new(ErrorKind::ValidationError, error.to_string(), stage)
        }
        StageError::Cancelled => ClassifiedError::internal(error.to_string(), stage),
        StageError::Other(err) => classify_opaque(format!("{:#}", err), stage),
    }
}

/// Inspect an opaque failure's text for an upstream provider signature
fn classify_opaque(detail: String, stage: Option<StageKind>) -> ClassifiedError {
    let lowered = detail.to_lowercase();
    if detail.contains("BadRequestError") || lowered.contains("huggingface") {
        ClassifiedError::new(
            ErrorKind::UpstreamModelError,
            format!("Model provider request failed: {}", detail),
            stage,
        )
    } else {
        ClassifiedError::internal(detail, stage)
    }
}

/// Classify and log a failure with full diagnostic detail
pub fn record(failure: &AnalysisFailure) -> ClassifiedError {
    let classified = classify(failure);

    let stage = classified.stage.map(|s| s.as_str()).unwrap_or("none");
    match failure {
        AnalysisFailure::Pipeline(pipeline) => error!(
            kind = %classified.kind,
            stage,
            run_id = %pipeline.run.run_id,
            completed = ?pipeline.completed,
            failed = ?pipeline.failed,
            "Analysis failed: {:?}",
            pipeline.error
        ),
        AnalysisFailure::Internal(err) => error!(
            kind = %classified.kind,
            stage,
            "Analysis failed: {:?}",
            err
        ),
        other => error!(kind = %classified.kind, stage, "Analysis failed: {:?}", other),
    }

    classified
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ClassifiedError>;
