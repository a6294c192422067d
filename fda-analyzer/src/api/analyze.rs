//! POST /analyze
//!
//! Request lifecycle: multipart fields are read in order, the `file` field is
//! streamed through [`Intake`](crate::intake::Intake) into a temporary artifact,
//! the pipeline runs against the artifact's absolute path, and the artifact is
//! released before the response is produced.
//!
//! The pipeline runs in its own task, which owns the artifact. If the client
//! disconnects, the handler future is dropped and its drop guard cancels the
//! run token: the task fails the run, records the cancellation and releases the
//! artifact. A disconnect during intake leaves the artifact to its `Drop`.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::artifact::TempArtifact;
use crate::error::{self, AnalysisFailure, ClassifiedError};
use crate::intake::{IntakeError, IntakeOutcome};
use crate::models::{AnalysisRequest, AnalysisResult};
use crate::pipeline::{aggregate, PipelineOutcome};
use crate::AppState;

const FILE_FIELD: &str = "file";
const QUERY_FIELD: &str = "query";

/// POST /analyze
pub async fn analyze_document(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let result = match multipart {
        Ok(multipart) => analyze(&state, multipart, &cancel).await,
        Err(rejection) => Err(AnalysisFailure::Validation(format!(
            "Expected a multipart/form-data upload: {}",
            rejection.body_text()
        ))),
    };

    match result {
        Ok(result) => Json(result).into_response(),
        Err(failure) => report_failure(&state, &failure).await.into_response(),
    }
}

/// Classify, log, and remember a failure for `/health`
async fn report_failure(state: &AppState, failure: &AnalysisFailure) -> ClassifiedError {
    let classified = error::record(failure);
    *state.last_error.write().await = Some(classified.to_string());
    classified
}

async fn analyze(
    state: &AppState,
    mut multipart: Multipart,
    cancel: &CancellationToken,
) -> Result<AnalysisResult, AnalysisFailure> {
    let limit = state.intake.limits().max_bytes;
    let mut query: Option<String> = None;
    let mut upload: Option<IntakeOutcome> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| IntakeError::from_multipart(e, limit))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                if upload.is_some() {
                    return Err(AnalysisFailure::Validation(
                        "Only one file may be uploaded per request.".to_string(),
                    ));
                }

                let filename = field.file_name().unwrap_or_default().to_string();
                validate_filename(&filename)?;

                let chunks =
                    field.map(|chunk| chunk.map_err(|e| IntakeError::from_multipart(e, limit)));
                upload = Some(state.intake.accept(&filename, chunks).await?);
            }
            Some(QUERY_FIELD) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| IntakeError::from_multipart(e, limit))?;
                query = Some(text);
            }
            other => {
                info!(field = other.unwrap_or(""), "Ignoring unknown form field");
            }
        }
    }

    let IntakeOutcome { session, artifact } =
        upload.ok_or_else(|| AnalysisFailure::Validation("No file provided.".to_string()))?;

    let request = AnalysisRequest::new(artifact.path(), query.as_deref(), &state.default_query)
        .map_err(|e| AnalysisFailure::Internal(e.into()))?;
    let query = request.query().to_string();

    let task = tokio::spawn(run_pipeline(
        state.clone(),
        request,
        artifact,
        cancel.clone(),
    ));
    let outcome = task
        .await
        .map_err(|e| AnalysisFailure::Internal(anyhow::anyhow!("Pipeline task failed: {}", e)))??;
    info!(
        session_id = %session.session_id,
        run_id = %outcome.run.run_id,
        "Analysis complete for {}",
        session.filename
    );

    Ok(aggregate(&query, &session.filename, &outcome.results))
}

/// Run the pipeline and release the artifact
///
/// Once `cancel` fires the handler is gone, so the failure is recorded here.
async fn run_pipeline(
    state: AppState,
    request: AnalysisRequest,
    artifact: TempArtifact,
    cancel: CancellationToken,
) -> Result<PipelineOutcome, AnalysisFailure> {
    let outcome = state.pipeline.run(request, &cancel).await;

    // Released on every path before the response
    artifact.release().await;

    match outcome {
        Ok(outcome) => Ok(outcome),
        Err(failure) => {
            let failure = AnalysisFailure::from(failure);
            if cancel.is_cancelled() {
                info!("Client disconnected, analysis abandoned");
                report_failure(&state, &failure).await;
            }
            Err(failure)
        }
    }
}

/// Only `.pdf` uploads are analyzed
fn validate_filename(filename: &str) -> Result<(), AnalysisFailure> {
    if filename.trim().is_empty() {
        return Err(AnalysisFailure::Validation(
            "Uploaded file has no filename.".to_string(),
        ));
    }

    if !filename.to_ascii_lowercase().ends_with(".pdf") {
        warn!(filename, "Rejected non-PDF upload");
        return Err(AnalysisFailure::Validation(
            "Only PDF uploads are supported.".to_string(),
        ));
    }

    Ok(())
}

pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/analyze", post(analyze_document))
}
