//! Document retrieval across corpora.
//!
//! Each backend implements the [`Retriever`] capability; the
//! [`RetrievalCoordinator`] fans a query out across every registered
//! retriever concurrently and merges the results.

mod coordinator;
mod exa;
mod serp;
pub mod urls;
mod vector;

pub use coordinator::{CombinePolicy, RetrievalCoordinator, RetrievalError};
pub use exa::{ExaClient, ExaRetriever};
pub use serp::{SerpClient, SerpRetriever};
pub use vector::{VectorRetriever, VectorStoreClient};

use async_trait::async_trait;
use thiserror::Error;

use crate::document::Document;

/// Errors a retriever backend can produce.
#[derive(Debug, Error)]
pub enum RetrieverError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Embedding error: {0}")]
    Embedding(String),
}

/// A single document source.
///
/// Implementations must respect cancellation promptly; the coordinator drops
/// in-flight query futures when another retriever fails.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Stable name of the backing source (e.g. "serp", "exa"), used to key
    /// merged results and to attribute errors.
    fn name(&self) -> &str;

    /// Retrieve up to `top_k` documents relevant to `query`.
    async fn query(&self, query: &str, top_k: usize) -> Result<Vec<Document>, RetrieverError>;
}
