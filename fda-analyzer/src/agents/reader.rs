//! Reading stage: text extraction and first-pass analysis

use super::{prompts, AgentContext};
use crate::model::ModelPrompt;
use crate::models::StageKind;
use crate::pipeline::{AnalysisStage, StageCall, StageError, StageInput};
use serde_json::{json, Value};
use tracing::debug;

pub struct DocumentReader {
    ctx: AgentContext,
}

impl DocumentReader {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }
}

impl AnalysisStage for DocumentReader {
    fn kind(&self) -> StageKind {
        StageKind::Reading
    }

    fn invoke(&self, input: StageInput) -> StageCall<Value> {
        let path = input.request.artifact_path().to_path_buf();
        if !path.is_absolute() {
            return StageCall::fail(StageError::Document(format!(
                "Artifact path must be absolute: {}",
                path.display()
            )));
        }

        let ctx = self.ctx.clone();
        StageCall::deferred(async move {
            let document = ctx.document(&input).await?;
            debug!(
                pages = document.page_count(),
                characters = document.char_count(),
                model = ctx.model.model_id(),
                "Document loaded for reading"
            );

            let user = ctx.user_prompt(input.request.query(), None, None, &document.full_text);
            let text = ctx
                .model
                .complete(&ModelPrompt::new(prompts::FINANCIAL_ANALYST, user))
                .await?;

            Ok(json!({
                "page_count": document.page_count(),
                "characters": document.char_count(),
                "text": text,
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::models::AnalysisRequest;
    use crate::pipeline::ExecutionNormalizer;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    fn input(query: &str) -> StageInput {
        StageInput::first(Arc::new(
            AnalysisRequest::new(Path::new("/tmp/report.pdf"), Some(query), "default").unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_reader_output() {
        let model = EchoModel::new("Revenue grew.");
        let reader = DocumentReader::new(context(model.clone(), "Revenue 1,000", 100));

        let call = reader.invoke(input("What changed?"));
        assert!(call.is_deferred());

        let output = ExecutionNormalizer::new(Duration::from_secs(5))
            .resolve(call)
            .await
            .unwrap();
        assert_eq!(output["page_count"], 1);
        assert_eq!(output["characters"], 13);
        assert_eq!(output["text"], "Revenue grew.");

        let prompt = model.last_prompt();
        assert_eq!(prompt.system, prompts::FINANCIAL_ANALYST);
        assert!(prompt.user.contains("What changed?"));
        assert!(prompt.user.contains("Revenue 1,000"));
    }
}
