//! External model provider interface
//!
//! Agents talk to the provider through [`ModelClient`] so the pipeline can be
//! exercised with scripted clients in tests.

pub mod huggingface;

pub use huggingface::HuggingFaceClient;

use async_trait::async_trait;
use thiserror::Error;

/// A single system + user exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPrompt {
    pub system: String,
    pub user: String,
}

impl ModelPrompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Provider call failure
#[derive(Debug, Error)]
pub enum ModelError {
    /// Request never produced an HTTP response
    #[error("Model provider request failed: {0}")]
    Transport(String),

    /// No response within the client's request timeout
    #[error("Model provider did not respond in time: {0}")]
    Timeout(String),

    /// Provider answered with a non-success status
    #[error("Model provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response could not be interpreted as a completion
    #[error("Malformed model provider response: {0}")]
    Malformed(String),
}

/// Completion client for the external model provider
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Model identifier for provenance logging
    fn model_id(&self) -> &str;

    /// Run one completion and return the assistant text
    async fn complete(&self, prompt: &ModelPrompt) -> Result<String, ModelError>;
}
