//! Hugging Face inference router client
//!
//! Uses the OpenAI-compatible chat completions endpoint.

use super::{ModelClient, ModelError, ModelPrompt};
use crate::config::ProviderSettings;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maximum number of error-body characters kept for diagnostics
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Chat completions client
pub struct HuggingFaceClient {
    http_client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl HuggingFaceClient {
    /// Build a client from resolved provider settings
    pub fn new(settings: &ProviderSettings) -> Result<Self, ModelError> {
        let http_client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| ModelError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint: settings.endpoint.clone(),
            model: settings.model_id.clone(),
            api_key: settings.credential.expose().to_string(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        })
    }
}

#[async_trait]
impl ModelClient for HuggingFaceClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &ModelPrompt) -> Result<String, ModelError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!(model = %self.model, prompt_chars = prompt.user.len(), "Sending completion request");

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error(e, "Request failed"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| request_error(e, "Failed to read response body"))?;

        if !status.is_success() {
            return Err(ModelError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        parse_completion(&body)
    }
}

/// Timeouts are kept apart from other transport failures
fn request_error(e: reqwest::Error, context: &str) -> ModelError {
    if e.is_timeout() {
        ModelError::Timeout(format!("{}: {}", context, e))
    } else {
        ModelError::Transport(format!("{}: {}", context, e))
    }
}

/// Extract the first choice's content from a chat completions body
pub(crate) fn parse_completion(body: &str) -> Result<String, ModelError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ModelError::Malformed(format!("Invalid JSON: {}", e)))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or_else(|| ModelError::Malformed("Response has no completion content".to_string()))?;

    if content.trim().is_empty() {
        return Err(ModelError::Malformed("Completion content is empty".to_string()));
    }

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderCredential;
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn settings(endpoint: String, request_timeout: Duration) -> ProviderSettings {
        ProviderSettings {
            credential: ProviderCredential::new("hf_test"),
            model_id: "test/model".to_string(),
            endpoint,
            request_timeout,
            max_tokens: 16,
            temperature: 0.0,
        }
    }

    #[tokio::test]
    async fn test_unresponsive_provider_is_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and hold connections without ever answering
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = HuggingFaceClient::new(&settings(
            format!("http://{}/v1/chat/completions", addr),
            Duration::from_millis(300),
        ))
        .unwrap();

        let err = client
            .complete(&ModelPrompt::new("system", "user"))
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Timeout(_)), "{err:?}");

        server.abort();
    }

    #[tokio::test]
    async fn test_refused_connection_is_transport() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HuggingFaceClient::new(&settings(
            format!("http://{}/v1/chat/completions", addr),
            Duration::from_secs(5),
        ))
        .unwrap();

        let err = client
            .complete(&ModelPrompt::new("system", "user"))
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Transport(_)), "{err:?}");
    }

    #[test]
    fn test_parse_valid_completion() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Revenue grew 12%."}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "Revenue grew 12%.");
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let err = parse_completion("<html>Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, ModelError::Malformed(_)));
    }

    #[test]
    fn test_parse_rejects_missing_choices() {
        let err = parse_completion(r#"{"error":"BadRequestError"}"#).unwrap_err();
        assert!(matches!(err, ModelError::Malformed(_)));
    }

    #[test]
    fn test_parse_rejects_empty_content() {
        let err = parse_completion(r#"{"choices":[{"message":{"content":"  "}}]}"#).unwrap_err();
        assert!(matches!(err, ModelError::Malformed(_)));
    }
}
