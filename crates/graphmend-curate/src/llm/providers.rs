//! OpenAI-compatible chat completion provider (`/v1/chat/completions`).
//!
//! Covers OpenAI itself and compatible local servers (Ollama, LM Studio,
//! vLLM). All wire types are private to this module; callers only see the
//! [`TextModel`] trait. The client is constructed once and cheaply cloned
//! because `reqwest::Client` is an `Arc` internally.

use crate::llm::{CompletionOptions, LlmError, TextModel};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// Provider configuration, usually read from the environment.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl ModelConfig {
    /// Read `GRAPHMEND_LLM_BASE_URL`, `GRAPHMEND_LLM_MODEL`,
    /// `GRAPHMEND_LLM_API_KEY`, and `GRAPHMEND_LLM_TIMEOUT_SECS`. Returns
    /// `None` when no model is configured at all.
    pub fn from_env() -> Option<Self> {
        let model = std::env::var("GRAPHMEND_LLM_MODEL").ok()?;
        let base_url = std::env::var("GRAPHMEND_LLM_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string());
        let api_key = std::env::var("GRAPHMEND_LLM_API_KEY").ok();
        let timeout_secs = std::env::var("GRAPHMEND_LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);
        Some(Self {
            base_url,
            model,
            api_key,
            timeout_secs,
        })
    }
}

/// Adapter for any HTTP endpoint implementing `/v1/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleModel {
    client: Client,
    config: ModelConfig,
}

impl OpenAiCompatibleModel {
    pub fn new(config: ModelConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    async fn send(&self, messages: Vec<Message>, opts: &CompletionOptions) -> Result<String, LlmError> {
        let payload = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            temperature: opts.temperature,
            max_tokens: opts.max_tokens,
        };

        debug!(model = %payload.model, "sending completion request");

        let mut req = self.client.post(&self.config.base_url).json(&payload);
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            error!(url = %self.config.base_url, error = %e, "completion request failed (transport)");
            LlmError::Network(e.to_string())
        })?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(1000);
            return Err(LlmError::RateLimited { retry_after_ms });
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read error body>".to_string());
            let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(env) => format!("HTTP {status}: {}", env.error.message),
                Err(_) => format!("HTTP {status}: {body}"),
            };
            error!(%status, "completion request returned HTTP error");
            return Err(LlmError::Api(message));
        }

        let parsed = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| LlmError::Api(format!("failed to parse response body: {e}")))?;

        debug!(choices = parsed.choices.len(), "received completion response");

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(LlmError::Empty)
    }
}

#[async_trait]
impl TextModel for OpenAiCompatibleModel {
    async fn complete(&self, prompt: &str, opts: &CompletionOptions) -> Result<String, LlmError> {
        let messages = vec![Message {
            role: "user".to_string(),
            content: MessageContent::Text(prompt.to_string()),
        }];
        self.send(messages, opts).await
    }

    async fn complete_multimodal(
        &self,
        bytes: &[u8],
        mime: &str,
        prompt: &str,
        opts: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        let messages = vec![Message {
            role: "user".to_string(),
            content: MessageContent::Parts(vec![
                ContentPart::Text {
                    text: prompt.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!("data:{mime};base64,{encoded}"),
                    },
                },
            ]),
        }];
        self.send(messages, opts).await
    }
}

// ── Private wire types ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// Error envelope used by OpenAI and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
