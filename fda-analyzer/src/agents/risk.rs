//! Risk assessment stage

use super::{prompts, AgentContext};
use crate::model::ModelPrompt;
use crate::models::StageKind;
use crate::pipeline::{AnalysisStage, StageCall, StageInput};
use crate::signals::RiskSignals;
use serde_json::{json, Value};

pub struct RiskAssessor {
    ctx: AgentContext,
}

impl RiskAssessor {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }
}

impl AnalysisStage for RiskAssessor {
    fn kind(&self) -> StageKind {
        StageKind::RiskAssessment
    }

    fn invoke(&self, input: StageInput) -> StageCall<Value> {
        let ctx = self.ctx.clone();
        StageCall::deferred(async move {
            let document = ctx.document(&input).await?;
            let signals = RiskSignals::scan(&document.full_text);

            let previous = input.previous.as_ref().and_then(|p| p.text());
            let user = ctx.user_prompt(
                input.request.query(),
                previous,
                Some(&signals.summary()),
                &document.full_text,
            );
            let text = ctx
                .model
                .complete(&ModelPrompt::new(prompts::RISK_ASSESSOR, user))
                .await?;

            Ok(json!({
                "signals": signals,
                "overall_rating": signals.overall_rating,
                "text": text,
            }))
        })
    }
}
