//! Result aggregation
//!
//! Structural assembly only: stage payloads are copied under their stage name
//! and each stage's narrative is concatenated into one report, in stage order.

use crate::models::{AnalysisResult, StageResult};
use serde_json::{json, Map, Value};

/// Build the caller-facing result from a completed run's `ok` results
pub fn aggregate(query: &str, filename: &str, results: &[StageResult]) -> AnalysisResult {
    let mut sections: Vec<String> = Vec::new();
    let mut stages = Map::new();

    for result in results.iter().filter(|r| r.is_ok()) {
        if let Some(text) = result.text() {
            sections.push(format!("## {}\n\n{}", result.stage.title(), text.trim()));
        }
        stages.insert(result.stage.as_str().to_string(), result.output.clone());
    }

    AnalysisResult {
        status: "success".to_string(),
        query: query.to_string(),
        analysis: json!({
            "report": sections.join("\n\n"),
            "stages": Value::Object(stages),
        }),
        file_processed: filename.to_string(),
    }
}
