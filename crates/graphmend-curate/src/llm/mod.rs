//! Model provider boundary.
//!
//! The pipeline treats the language model as an opaque completion function.
//! [`TextModel`] is the only surface the extractor, analyzer, and fix
//! applier see; [`providers`] carries the HTTP-backed implementation and
//! [`MockModel`] the scripted test double.

pub mod providers;

pub use providers::{ModelConfig, OpenAiCompatibleModel};

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Per-request knobs. `None` leaves the provider default in place.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
}

impl CompletionOptions {
    /// Low-temperature options used for extraction and analysis, where we
    /// want the most literal reading of the input.
    pub fn factual() -> Self {
        Self {
            max_tokens: Some(4096),
            temperature: Some(0.2),
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("network error: {0}")]
    Network(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("empty or missing content in response")]
    Empty,
    #[error("provider does not support {0}")]
    Unsupported(&'static str),
}

impl LlmError {
    /// Transport-level failures the caller may retry; API rejections and
    /// unsupported operations are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Network(_) | LlmError::RateLimited { .. })
    }
}

/// Opaque completion provider: `prompt -> text`, no determinism guaranteed.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn complete(&self, prompt: &str, opts: &CompletionOptions) -> Result<String, LlmError>;

    /// Completion over a binary document (PDF, image) plus instructions.
    /// Providers without multimodal support return `Unsupported`.
    async fn complete_multimodal(
        &self,
        _bytes: &[u8],
        _mime: &str,
        _prompt: &str,
        _opts: &CompletionOptions,
    ) -> Result<String, LlmError> {
        Err(LlmError::Unsupported("multimodal completion"))
    }
}

/// Scripted model for tests. Cycles through its responses; an empty script
/// fails every call with a network error.
pub struct MockModel {
    responses: Vec<String>,
    cursor: AtomicUsize,
}

impl MockModel {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn always(response: &str) -> Self {
        Self::new(vec![response.to_string()])
    }

    /// A model whose every call fails at the transport level.
    pub fn failing() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl TextModel for MockModel {
    async fn complete(&self, _prompt: &str, _opts: &CompletionOptions) -> Result<String, LlmError> {
        if self.responses.is_empty() {
            return Err(LlmError::Network("mock model configured to fail".into()));
        }
        let idx = self.cursor.fetch_add(1, Ordering::SeqCst);
        Ok(self.responses[idx % self.responses.len()].clone())
    }

    async fn complete_multimodal(
        &self,
        _bytes: &[u8],
        _mime: &str,
        prompt: &str,
        opts: &CompletionOptions,
    ) -> Result<String, LlmError> {
        self.complete(prompt, opts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_cycles_responses() {
        let model = MockModel::new(vec!["one".into(), "two".into()]);
        let opts = CompletionOptions::default();
        assert_eq!(model.complete("p", &opts).await.unwrap(), "one");
        assert_eq!(model.complete("p", &opts).await.unwrap(), "two");
        assert_eq!(model.complete("p", &opts).await.unwrap(), "one");
    }

    #[tokio::test]
    async fn failing_mock_is_retryable_transport_error() {
        let model = MockModel::failing();
        let err = model
            .complete("p", &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
