//! Data models for fda-analyzer
//!
//! - Upload session tracking for size-bounded intake
//! - Analysis request, per-stage results, and the aggregated result

pub mod analysis;
pub mod upload_session;

pub use analysis::{AnalysisRequest, AnalysisResult, StageKind, StageResult, StageStatus};
pub use upload_session::{UploadSession, UploadStatus};
