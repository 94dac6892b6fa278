//! LLM provider trait definition.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Options for a completion request.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative).
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Request timeout. Applied to one-shot requests only; streaming
    /// requests run until the stream ends or the request is cancelled.
    pub timeout: Duration,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: Some(600),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Errors that can occur when interacting with an LLM provider.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,
}

/// Trait for LLM providers.
///
/// Implementations of this trait can connect to different backends (OpenAI,
/// Groq, Ollama, etc.) while providing a unified interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider's name (e.g. "openai", "ollama").
    fn name(&self) -> &str;

    /// Get the model being used.
    fn model(&self) -> &str;

    /// Complete a prompt in one shot.
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, LlmError>;

    /// Complete a prompt incrementally, sending raw text fragments as they
    /// arrive. The sender is dropped on return, which closes the channel; a
    /// closed receiver ends the stream early without error.
    async fn complete_streaming(
        &self,
        prompt: &str,
        options: &CompletionOptions,
        fragments: mpsc::Sender<String>,
    ) -> Result<(), LlmError>;

    /// Embed text for vector search.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError>;
}
