use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// A single completion request
///
/// Cache keys are derived from `(model, system, user)`, so two requests with
/// byte-identical prompts always resolve to the same cache entry.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system: Option<String>,
    pub user: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Errors from the completion service, split into retryable and not
#[derive(Debug, Error)]
pub enum ClientError {
    /// Rate limiting or server-side failure; safe to retry
    #[error("transient API error ({status}): {body}")]
    Transient { status: u16, body: String },

    /// Client-side rejection (bad request, auth); retrying will not help
    #[error("permanent API error ({status}): {body}")]
    Permanent { status: u16, body: String },

    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed completion response: {0}")]
    Malformed(String),
}

impl ClientError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Network(_))
    }
}

/// Abstraction over the completion service, so the pipeline can be exercised
/// with a scripted fake in tests
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ClientError>;
}

/// Configuration for the OpenAI-compatible chat completion client
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key (from OPENAI_API_KEY env var)
    pub api_key: String,
    /// URL of the chat-completions endpoint
    pub base_url: String,
    /// Retries for transient failures before giving up
    pub max_retries: u32,
    /// Initial backoff delay; doubles per retry
    pub retry_base_delay: Duration,
}

impl OpenAiConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable not set")?;

        Ok(Self {
            api_key,
            base_url: "https://api.openai.com/v1/chat/completions".to_string(),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
        })
    }
}

/// OpenAI chat-completions client
pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn send_once(&self, request: &CompletionRequest) -> Result<String, ClientError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.user.clone(),
        });

        let body = ChatRequest {
            model: request.model.clone(),
            messages,
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
        };

        let response = self
            .client
            .post(&self.config.base_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 || status.is_server_error() {
                return Err(ClientError::Transient {
                    status: status.as_u16(),
                    body,
                });
            }
            return Err(ClientError::Permanent {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Malformed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ClientError::Malformed("no choices in response".to_string()))
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    /// Send a chat completion, retrying transient failures with exponential
    /// backoff
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ClientError> {
        let mut attempt = 0u32;
        loop {
            match self.send_once(request).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    let delay = self.config.retry_base_delay * 2u32.pow(attempt);
                    warn!(
                        "Transient completion failure (attempt {} of {}): {}",
                        attempt + 1,
                        self.config.max_retries,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!("Completion call abandoned: {}", e);
                    return Err(e);
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let rate_limited = ClientError::Transient {
            status: 429,
            body: String::new(),
        };
        assert!(rate_limited.is_transient());

        let rejected = ClientError::Permanent {
            status: 400,
            body: String::new(),
        };
        assert!(!rejected.is_transient());

        let malformed = ClientError::Malformed("empty".to_string());
        assert!(!malformed.is_transient());
    }
}
