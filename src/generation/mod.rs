//! Answer generation.

pub mod llm;

mod answerer;
mod prompt;

pub use answerer::Answerer;
pub use prompt::PromptTemplate;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::document::Document;

/// Errors a generation run can produce.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("provider error: {0}")]
    Provider(#[from] llm::LlmError),

    #[error("generation cancelled")]
    Cancelled,
}

/// A source of generated answer text.
///
/// Implementations emit raw text fragments on `fragments` and must close
/// the channel on every exit path, whether due to success, upstream
/// completion or error. The sender is moved in, so dropping it on return
/// satisfies the contract.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        cancel: CancellationToken,
        query: &str,
        documents: &[Document],
        fragments: mpsc::Sender<String>,
        should_stream: bool,
    ) -> Result<(), GenerationError>;
}
