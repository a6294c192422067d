//! Advisory stage: informational investment insights

use super::{prompts, AgentContext};
use crate::model::ModelPrompt;
use crate::models::StageKind;
use crate::pipeline::{AnalysisStage, StageCall, StageInput};
use crate::signals::InvestmentSignals;
use serde_json::{json, Value};

pub struct InvestmentAdvisor {
    ctx: AgentContext,
}

impl InvestmentAdvisor {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }
}

impl AnalysisStage for InvestmentAdvisor {
    fn kind(&self) -> StageKind {
        StageKind::Advisory
    }

    fn invoke(&self, input: StageInput) -> StageCall<Value> {
        let ctx = self.ctx.clone();
        StageCall::deferred(async move {
            let document = ctx.document(&input).await?;
            let signals = InvestmentSignals::scan(&document.full_text);

            let previous = input.previous.as_ref().and_then(|p| p.text());
            let user = ctx.user_prompt(
                input.request.query(),
                previous,
                Some(&signals.summary()),
                &document.full_text,
            );
            let text = ctx
                .model
                .complete(&ModelPrompt::new(prompts::INVESTMENT_ADVISOR, user))
                .await?;

            Ok(json!({
                "signals": signals,
                "recommendation": signals.recommendation,
                "text": text,
            }))
        })
    }
}
