//! Model provider backends.

mod ollama;
mod openai;
mod provider;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use provider::{CompletionOptions, LlmError, LlmProvider};
