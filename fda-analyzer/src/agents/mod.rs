//! Analysis agents
//!
//! One agent per pipeline stage. Each agent reads the run's document text
//! (extracted once through a [`DocumentSource`]), computes its heuristics, and
//! makes a single model call with a role-specific system prompt.

pub mod advisor;
pub mod prompts;
pub mod reader;
pub mod risk;
pub mod verifier;

pub use advisor::InvestmentAdvisor;
pub use reader::DocumentReader;
pub use risk::RiskAssessor;
pub use verifier::DocumentVerifier;

use crate::document::{DocumentSource, DocumentText};
use crate::model::ModelClient;
use crate::pipeline::{AnalysisStage, StageError, StageInput};
use std::sync::Arc;

/// Dependencies shared by all agents
#[derive(Clone)]
pub struct AgentContext {
    pub model: Arc<dyn ModelClient>,
    pub documents: Arc<dyn DocumentSource>,
    /// Upper bound on document characters included in a prompt
    pub max_prompt_chars: usize,
}

impl AgentContext {
    pub fn new(
        model: Arc<dyn ModelClient>,
        documents: Arc<dyn DocumentSource>,
        max_prompt_chars: usize,
    ) -> Self {
        Self {
            model,
            documents,
            max_prompt_chars,
        }
    }

    /// Document text for this run, extracted on first use
    pub(crate) async fn document(&self, input: &StageInput) -> Result<Arc<DocumentText>, StageError> {
        input
            .document
            .get_or_load(self.documents.as_ref(), input.request.artifact_path())
            .await
    }

    /// Assemble the user message for a model call
    pub(crate) fn user_prompt(
        &self,
        query: &str,
        previous: Option<&str>,
        signals: Option<&str>,
        document: &str,
    ) -> String {
        let mut prompt = format!("User query: {}\n", query);

        if let Some(previous) = previous {
            prompt.push_str("\nFindings from the previous step:\n");
            prompt.push_str(previous.trim());
            prompt.push('\n');
        }

        if let Some(signals) = signals {
            prompt.push_str("\nComputed signals:\n");
            prompt.push_str(signals);
            prompt.push('\n');
        }

        let excerpt = truncate_chars(document, self.max_prompt_chars);
        prompt.push_str("\nDocument text:\n");
        prompt.push_str(excerpt);
        if excerpt.len() < document.len() {
            prompt.push_str("\n[document truncated]");
        }

        prompt
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// The four stages in pipeline order
pub fn build_stages(ctx: AgentContext) -> Vec<Arc<dyn AnalysisStage>> {
    vec![
        Arc::new(DocumentReader::new(ctx.clone())),
        Arc::new(DocumentVerifier::new(ctx.clone())),
        Arc::new(InvestmentAdvisor::new(ctx.clone())),
        Arc::new(RiskAssessor::new(ctx)),
    ]
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::model::{ModelError, ModelPrompt};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    /// Model that replies with a fixed answer and records prompts
    pub struct EchoModel {
        pub reply: String,
        pub prompts: Mutex<Vec<ModelPrompt>>,
    }

    impl EchoModel {
        pub fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub fn last_prompt(&self) -> ModelPrompt {
            self.prompts.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl ModelClient for EchoModel {
        fn model_id(&self) -> &str {
            "echo"
        }

        async fn complete(&self, prompt: &ModelPrompt) -> Result<String, ModelError> {
            self.prompts.lock().unwrap().push(prompt.clone());
            Ok(self.reply.clone())
        }
    }

    /// Source returning the same text for every path
    pub struct FixedSource(pub String);

    #[async_trait]
    impl DocumentSource for FixedSource {
        async fn load(&self, _path: &Path) -> Result<DocumentText, StageError> {
            Ok(DocumentText::from_pages(vec![self.0.clone()]))
        }
    }

    pub fn context(model: Arc<EchoModel>, text: &str, max_prompt_chars: usize) -> AgentContext {
        AgentContext::new(model, Arc::new(FixedSource(text.to_string())), max_prompt_chars)
    }
}
