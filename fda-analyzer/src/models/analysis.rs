//! Analysis request, stage results, and the aggregated analysis result

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Query applied when the caller omits one (or sends only whitespace)
pub const DEFAULT_QUERY: &str = "Analyze this financial document for investment insights";

/// Immutable input threaded through every pipeline stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    artifact_path: PathBuf,
    query: String,
}

impl AnalysisRequest {
    /// Build a request for an intake artifact
    ///
    /// Fails if `artifact_path` is not absolute.
    pub fn new(
        artifact_path: &Path,
        query: Option<&str>,
        default_query: &str,
    ) -> fda_common::Result<Self> {
        if !artifact_path.is_absolute() {
            return Err(fda_common::Error::InvalidInput(format!(
                "Artifact path must be absolute: {}",
                artifact_path.display()
            )));
        }

        Ok(Self {
            artifact_path: artifact_path.to_path_buf(),
            query: normalize_query(query, default_query),
        })
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

/// Trim the caller's query; omitted, empty, and whitespace-only all map to the default
pub fn normalize_query(query: Option<&str>, default_query: &str) -> String {
    match query.map(str::trim) {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => default_query.to_string(),
    }
}

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Document reading and metric extraction
    Reading,
    /// Financial document verification
    Verification,
    /// Investment advisory synthesis
    Advisory,
    /// Risk assessment
    RiskAssessment,
}

impl StageKind {
    /// Fixed execution order
    pub const ORDER: [StageKind; 4] = [
        StageKind::Reading,
        StageKind::Verification,
        StageKind::Advisory,
        StageKind::RiskAssessment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Reading => "reading",
            StageKind::Verification => "verification",
            StageKind::Advisory => "advisory",
            StageKind::RiskAssessment => "risk_assessment",
        }
    }

    /// Section heading used in the aggregated report
    pub fn title(&self) -> &'static str {
        match self {
            StageKind::Reading => "Document Analysis",
            StageKind::Verification => "Document Verification",
            StageKind::Advisory => "Investment Insights",
            StageKind::RiskAssessment => "Risk Assessment",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Ok,
    Failed,
}

/// Output of one stage invocation
#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    pub stage: StageKind,
    pub status: StageStatus,
    /// Structured stage payload; agents put their narrative under `"text"`
    pub output: serde_json::Value,
    pub elapsed_ms: u64,
}

impl StageResult {
    pub fn ok(stage: StageKind, output: serde_json::Value, elapsed_ms: u64) -> Self {
        Self {
            stage,
            status: StageStatus::Ok,
            output,
            elapsed_ms,
        }
    }

    /// Record of a failed invocation; the payload carries only the error text
    pub fn failed(stage: StageKind, detail: impl fmt::Display, elapsed_ms: u64) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            output: serde_json::json!({ "error": detail.to_string() }),
            elapsed_ms,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == StageStatus::Ok
    }

    /// Narrative text contributed by the stage, if any
    pub fn text(&self) -> Option<&str> {
        self.output.get("text").and_then(|t| t.as_str())
    }
}

/// The only entity returned to the caller on success
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub status: String,
    pub query: String,
    pub analysis: serde_json::Value,
    pub file_processed: String,
}
