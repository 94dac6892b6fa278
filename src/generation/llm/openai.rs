//! OpenAI-compatible LLM provider implementation.
//!
//! Talks to any chat-completions endpoint that speaks the OpenAI API,
//! which also covers Groq via a base-url override.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use super::provider::{CompletionOptions, LlmError, LlmProvider};

/// OpenAI-compatible LLM provider.
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    embedding_model: String,
}

impl OpenAiProvider {
    /// Create a new provider.
    ///
    /// # Arguments
    /// * `base_url` - API base (e.g. "https://api.openai.com/v1", or
    ///   "https://api.groq.com/openai/v1" for Groq).
    /// * `model` - Chat model to use.
    /// * `embedding_model` - Model for the embeddings endpoint.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            embedding_model: embedding_model.into(),
        }
    }

    fn chat_request(&self, prompt: &str, options: &CompletionOptions, stream: bool) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stream,
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
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
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
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
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

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            LlmError::InvalidResponse(format!("Failed to parse chat response: {}", e))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response contained no choices".to_string()))
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
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
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

                let Some(delta) = parse_stream_line(line.trim())? else {
                    continue;
                };
                match delta {
                    StreamDelta::Content(content) => {
                        if fragments.send(content).await.is_err() {
                            // Receiver gone; the request was cancelled downstream.
                            return Ok(());
                        }
                    }
                    StreamDelta::Done => return Ok(()),
                }
            }
        }

        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let request = EmbeddingRequest {
            model: self.embedding_model.clone(),
            input: vec![text.to_string()],
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            LlmError::InvalidResponse(format!("Failed to parse embeddings response: {}", e))
        })?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| LlmError::InvalidResponse("response contained no embeddings".to_string()))
    }
}

enum StreamDelta {
    Content(String),
    Done,
}

/// Parse one SSE line from a streaming chat response. Returns `None` for
/// comments, event fields, empty keep-alive lines and empty deltas.
fn parse_stream_line(line: &str) -> Result<Option<StreamDelta>, LlmError> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim_start();

    if data == "[DONE]" {
        return Ok(Some(StreamDelta::Done));
    }

    let parsed: ChatChunk = serde_json::from_str(data)
        .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse stream chunk: {}", e)))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty());

    Ok(content.map(StreamDelta::Content))
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
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

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stream_line_with_content() {
        let line = r#"data: {"choices":[{"delta":{"content":"hello"}}]}"#;
        match parse_stream_line(line).unwrap() {
            Some(StreamDelta::Content(content)) => assert_eq!(content, "hello"),
            _ => panic!("expected a content delta"),
        }
    }

    #[test]
    fn test_parse_stream_line_done_sentinel() {
        assert!(matches!(
            parse_stream_line("data: [DONE]").unwrap(),
            Some(StreamDelta::Done)
        ));
    }

    #[test]
    fn test_parse_stream_line_skips_non_data_lines() {
        assert!(parse_stream_line("").unwrap().is_none());
        assert!(parse_stream_line(": keep-alive").unwrap().is_none());
        assert!(parse_stream_line("event: message").unwrap().is_none());
    }

    #[test]
    fn test_parse_stream_line_skips_empty_delta() {
        let line = r#"data: {"choices":[{"delta":{}}]}"#;
        assert!(parse_stream_line(line).unwrap().is_none());
    }

    #[test]
    fn test_parse_stream_line_rejects_malformed_json() {
        assert!(parse_stream_line("data: {not json").is_err());
    }
}
