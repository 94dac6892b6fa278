//! Ollama LLM provider implementation.
//!
//! Connects to an Ollama server and uses its `/api/chat` endpoint for
//! completions. Streaming responses arrive as newline-delimited JSON
//! objects rather than SSE frames.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use super::provider::{CompletionOptions, LlmError, LlmProvider};

/// Ollama LLM provider.
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    embedding_model: String,
}

impl OllamaProvider {
    /// Create a new Ollama provider.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the Ollama server (e.g. "http://localhost:11434").
    /// * `model` - Model to use (e.g. "llama3.1:8b").
    /// * `embedding_model` - Model for the embeddings endpoint.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            embedding_model: embedding_model.into(),
        }
    }

    fn chat_request(&self, prompt: &str, options: &CompletionOptions, stream: bool) -> OllamaChatRequest {
        OllamaChatRequest {
            model: self.model.clone(),
            messages: vec![OllamaMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream,
            options: OllamaOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens.map(|n| n as i32),
            },
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let request = self.chat_request(prompt, options, false);

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Connection(e.to_string())
                }
            })?;
        let response = Self::check_status(response).await?;

        let parsed: OllamaChatResponse = response.json().await.map_err(|e| {
            LlmError::InvalidResponse(format!("Failed to parse Ollama response: {}", e))
        })?;

        Ok(parsed.message.content)
    }

    async fn complete_streaming(
        &self,
        prompt: &str,
        options: &CompletionOptions,
        fragments: mpsc::Sender<String>,
    ) -> Result<(), LlmError> {
        let request = self.chat_request(prompt, options, true);

        debug!(model = %self.model, "starting streaming completion");

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let mut body = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| LlmError::Connection(e.to_string()))?;
            buffer.extend_from_slice(&chunk);

            while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=newline).collect();
                let line = String::from_utf8_lossy(&line);
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let parsed: OllamaChatResponse = serde_json::from_str(line).map_err(|e| {
                    LlmError::InvalidResponse(format!("Failed to parse stream chunk: {}", e))
                })?;

                if !parsed.message.content.is_empty()
                    && fragments.send(parsed.message.content).await.is_err()
                {
                    // Receiver gone; the request was cancelled downstream.
                    return Ok(());
                }
                if parsed.done {
                    return Ok(());
                }
            }
        }

        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let request = OllamaEmbeddingRequest {
            model: self.embedding_model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let parsed: OllamaEmbeddingResponse = response.json().await.map_err(|e| {
            LlmError::InvalidResponse(format!("Failed to parse embeddings response: {}", e))
        })?;

        Ok(parsed.embedding)
    }
}

// Ollama API types

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(default)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: OllamaMessage,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_chunk_parsing() {
        let line = r#"{"message":{"role":"assistant","content":"hi"},"done":false}"#;
        let parsed: OllamaChatResponse = serde_json::from_str(line).unwrap();
        assert_eq!(parsed.message.content, "hi");
        assert!(!parsed.done);

        let line = r#"{"message":{"role":"assistant","content":""},"done":true}"#;
        let parsed: OllamaChatResponse = serde_json::from_str(line).unwrap();
        assert!(parsed.done);
    }

    #[test]
    fn test_chat_request_omits_num_predict_when_unset() {
        let provider = OllamaProvider::new("http://localhost:11434", "llama3.1:8b", "nomic-embed-text");
        let options = CompletionOptions {
            max_tokens: None,
            ..Default::default()
        };

        let request = provider.chat_request("hello", &options, true);
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("num_predict"));
        assert!(json.contains("\"stream\":true"));
    }
}
