//! Verification stage: confirms the upload is a financial document

use super::{prompts, AgentContext};
use crate::model::ModelPrompt;
use crate::models::StageKind;
use crate::pipeline::{AnalysisStage, StageCall, StageError, StageInput};
use crate::signals::FinancialEvidence;
use serde_json::{json, Value};
use tracing::info;

pub struct DocumentVerifier {
    ctx: AgentContext,
}

impl DocumentVerifier {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }
}

impl AnalysisStage for DocumentVerifier {
    fn kind(&self) -> StageKind {
        StageKind::Verification
    }

    fn invoke(&self, input: StageInput) -> StageCall<Value> {
        let ctx = self.ctx.clone();
        StageCall::deferred(async move {
            let document = ctx.document(&input).await?;

            let evidence = FinancialEvidence::scan(&document.full_text);
            if !evidence.is_financial() {
                info!(figures = evidence.figure_count, "Document shows no financial content");
                return Err(StageError::Rejected(
                    "no financial statements, terminology, or figures found".to_string(),
                ));
            }

            let signals = format!(
                "Statement headers: {}\nFinancial terms: {}\nNumeric figures: {}",
                list_or_none(&evidence.statement_headers),
                list_or_none(&evidence.terminology),
                evidence.figure_count
            );
            let previous = input.previous.as_ref().and_then(|p| p.text());
            let user = ctx.user_prompt(
                input.request.query(),
                previous,
                Some(&signals),
                &document.full_text,
            );
            let text = ctx
                .model
                .complete(&ModelPrompt::new(prompts::DOCUMENT_VERIFIER, user))
                .await?;

            Ok(json!({
                "is_financial_document": true,
                "evidence": evidence,
                "text": text,
            }))
        })
    }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
