//! Pipeline runner
//!
//! State machine:
//! PENDING → READING → VERIFYING → ADVISING → ASSESSING_RISK → DONE,
//! with FAILED reachable from any non-terminal state. Stage n+1 runs only if
//! stage n returned a result; the first failure ends the run and discards the
//! results gathered so far.

use super::execution::ExecutionNormalizer;
use super::stage::{AnalysisStage, StageError, StageInput};
use crate::document::DocumentCache;
use crate::models::{AnalysisRequest, StageKind, StageResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Pending,
    Reading,
    Verifying,
    Advising,
    AssessingRisk,
    Done,
    Failed,
}

impl PipelineState {
    /// State entered while `stage` executes
    pub fn for_stage(stage: StageKind) -> Self {
        match stage {
            StageKind::Reading => PipelineState::Reading,
            StageKind::Verification => PipelineState::Verifying,
            StageKind::Advisory => PipelineState::Advising,
            StageKind::RiskAssessment => PipelineState::AssessingRisk,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            PipelineState::Pending => 0,
            PipelineState::Reading => 1,
            PipelineState::Verifying => 2,
            PipelineState::Advising => 3,
            PipelineState::AssessingRisk => 4,
            PipelineState::Done => 5,
            PipelineState::Failed => 6,
        }
    }

    /// Forward-only, one step at a time; FAILED from any non-terminal state
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == PipelineState::Failed || next.rank() == self.rank() + 1
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize)]
pub struct StateTransition {
    pub old_state: PipelineState,
    pub new_state: PipelineState,
    pub transitioned_at: DateTime<Utc>,
}

/// One execution of the pipeline
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub state: PipelineState,
    pub transitions: Vec<StateTransition>,
    pub started_at: DateTime<Utc>,
}

impl PipelineRun {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: PipelineState::Pending,
            transitions: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, new_state: PipelineState) -> StateTransition {
        debug_assert!(
            self.state.can_transition_to(new_state),
            "invalid pipeline transition {:?} -> {:?}",
            self.state,
            new_state
        );

        let transition = StateTransition {
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;
        self.transitions.push(transition.clone());

        debug!(run_id = %self.run_id, from = ?transition.old_state, to = ?new_state, "Pipeline state transition");
        transition
    }
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new()
    }
}

/// Successful run
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Ordered `ok` results, one per stage
    pub results: Vec<StageResult>,
    pub run: PipelineRun,
}

/// Failed run
#[derive(Debug)]
pub struct PipelineFailure {
    pub stage: StageKind,
    pub error: StageError,
    /// FAILED record of the stage that broke the run
    pub failed: StageResult,
    /// Stages that had completed before the failure (their results are discarded)
    pub completed: Vec<StageKind>,
    pub run: PipelineRun,
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stage '{}' failed: {}", self.stage, self.error)
    }
}

impl std::error::Error for PipelineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Pipeline construction error
#[derive(Debug, thiserror::Error)]
#[error("Pipeline stages must be {expected:?}, got {actual:?}")]
pub struct StageOrderError {
    pub expected: Vec<StageKind>,
    pub actual: Vec<StageKind>,
}

/// Runs the four stages in order
pub struct PipelineRunner {
    stages: Vec<Arc<dyn AnalysisStage>>,
    normalizer: ExecutionNormalizer,
}

impl PipelineRunner {
    /// Stages must be supplied in [`StageKind::ORDER`]
    pub fn new(
        stages: Vec<Arc<dyn AnalysisStage>>,
        normalizer: ExecutionNormalizer,
    ) -> Result<Self, StageOrderError> {
        let actual: Vec<StageKind> = stages.iter().map(|s| s.kind()).collect();
        if actual.as_slice() != StageKind::ORDER.as_slice() {
            return Err(StageOrderError {
                expected: StageKind::ORDER.to_vec(),
                actual,
            });
        }

        Ok(Self { stages, normalizer })
    }

    pub fn normalizer(&self) -> ExecutionNormalizer {
        self.normalizer
    }

    /// Execute all stages for `request`
    ///
    /// Cancelling `cancel` abandons the pending stage and fails the run with
    /// [`StageError::Cancelled`].
    pub async fn run(
        &self,
        request: AnalysisRequest,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome, PipelineFailure> {
        let request = Arc::new(request);
        let document = Arc::new(DocumentCache::new());
        let mut run = PipelineRun::new();
        let mut results: Vec<StageResult> = Vec::with_capacity(self.stages.len());

        info!(
            run_id = %run.run_id,
            query = %request.query(),
            path = %request.artifact_path().display(),
            "Running analysis pipeline"
        );

        for stage in &self.stages {
            let kind = stage.kind();
            run.transition_to(PipelineState::for_stage(kind));

            let input = StageInput {
                request: Arc::clone(&request),
                previous: results.last().cloned(),
                document: Arc::clone(&document),
            };

            let started = Instant::now();
            let outcome = if cancel.is_cancelled() {
                Err(StageError::Cancelled)
            } else {
                let call = stage.invoke(input);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(StageError::Cancelled),
                    result = self.normalizer.resolve(call) => result,
                }
            };
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(output) => {
                    info!(run_id = %run.run_id, stage = %kind, elapsed_ms, "Stage completed");
                    results.push(StageResult::ok(kind, output, elapsed_ms));
                }
                Err(error) => {
                    run.transition_to(PipelineState::Failed);
                    warn!(
                        run_id = %run.run_id,
                        stage = %kind,
                        elapsed_ms,
                        error = %error,
                        "Stage failed, skipping remaining stages"
                    );
                    return Err(PipelineFailure {
                        stage: kind,
                        failed: StageResult::failed(kind, &error, elapsed_ms),
                        error,
                        completed: results.iter().map(|r| r.stage).collect(),
                        run,
                    });
                }
            }
        }

        run.transition_to(PipelineState::Done);
        info!(run_id = %run.run_id, stages = results.len(), "Analysis pipeline completed");

        Ok(PipelineOutcome { results, run })
    }
}
