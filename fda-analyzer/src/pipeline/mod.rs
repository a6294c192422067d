//! Analysis pipeline
//!
//! Reading → Verification → Advisory → Risk assessment, executed strictly in
//! order. Every stage call goes through the [`ExecutionNormalizer`], which
//! collapses immediate and deferred stage results into one awaited result with
//! a bounded wait.

pub mod aggregator;
pub mod execution;
pub mod runner;
pub mod stage;

pub use aggregator::aggregate;
pub use execution::{ExecutionNormalizer, StageCall};
pub use runner::{PipelineFailure, PipelineOutcome, PipelineRun, PipelineRunner, PipelineState};
pub use stage::{AnalysisStage, StageError, StageInput};
