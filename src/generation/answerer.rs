//! The document-grounded answer generator.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::llm::{CompletionOptions, LlmProvider};
use super::{GenerationError, Generator, PromptTemplate};
use crate::document::Document;

/// Generates an answer to a query grounded in the given documents, via the
/// configured model provider.
pub struct Answerer {
    provider: Arc<dyn LlmProvider>,
    prompt: PromptTemplate,
    options: CompletionOptions,
}

impl Answerer {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        prompt: PromptTemplate,
        options: CompletionOptions,
    ) -> Self {
        Self {
            provider,
            prompt,
            options,
        }
    }
}

#[async_trait]
impl Generator for Answerer {
    async fn generate(
        &self,
        cancel: CancellationToken,
        query: &str,
        documents: &[Document],
        fragments: mpsc::Sender<String>,
        should_stream: bool,
    ) -> Result<(), GenerationError> {
        let prompt = self.prompt.render(query, documents);

        if !should_stream {
            let text = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
                result = self.provider.complete(&prompt, &self.options) => result?,
            };
            // A closed receiver means the request already unwound.
            let _ = fragments.send(text).await;
            return Ok(());
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GenerationError::Cancelled),
            result = self.provider.complete_streaming(&prompt, &self.options, fragments) => {
                result.map_err(GenerationError::from)
            }
        }
    }
}
