//! Concurrent retrieval fan-out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::{Retriever, RetrieverError};
use crate::document::Document;

/// Errors produced by a whole retrieval operation.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("error while retrieving documents from '{source}': {error}")]
    Source {
        source: String,
        #[source]
        error: RetrieverError,
    },

    #[error("retrieval cancelled")]
    Cancelled,

    #[error("retrieval task failed: {0}")]
    Task(String),
}

/// How results from multiple sources are merged into one ordered list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CombinePolicy {
    /// Concatenate results in retriever-registration order.
    #[default]
    Concatenate,

    /// Re-order the `content` source's documents by the order of matching
    /// links in the `ranking` source. Ranked results with no matching
    /// content document are dropped with a warning.
    RankedBy { content: String, ranking: String },
}

/// Runs every registered retriever concurrently and merges the results.
///
/// Policy is fail-fast: the first retriever error cancels the remaining
/// in-flight queries and fails the whole operation. An empty result from a
/// single retriever is not an error.
pub struct RetrievalCoordinator {
    retrievers: Vec<Arc<dyn Retriever>>,
    top_k: usize,
    policy: CombinePolicy,
}

impl RetrievalCoordinator {
    pub fn new(retrievers: Vec<Arc<dyn Retriever>>, top_k: usize, policy: CombinePolicy) -> Self {
        Self {
            retrievers,
            top_k,
            policy,
        }
    }

    /// Retrieve from all sources, returning the merged document list or the
    /// first fatal error.
    ///
    /// `cancel` scopes the whole operation; it is cancelled internally on the
    /// first retriever failure, so callers should pass a child token.
    pub async fn retrieve(
        &self,
        cancel: CancellationToken,
        query: &str,
    ) -> Result<Vec<Document>, RetrievalError> {
        let docs_by_source: Arc<Mutex<HashMap<String, Vec<Document>>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let mut tasks = JoinSet::new();
        for retriever in &self.retrievers {
            let retriever = retriever.clone();
            let token = cancel.clone();
            let query = query.to_string();
            let top_k = self.top_k;
            let results = docs_by_source.clone();

            tasks.spawn(async move {
                let docs = tokio::select! {
                    _ = token.cancelled() => return Err(RetrievalError::Cancelled),
                    result = retriever.query(&query, top_k) => {
                        result.map_err(|error| RetrievalError::Source {
                            source: retriever.name().to_string(),
                            error,
                        })?
                    }
                };

                if docs.is_empty() {
                    return Ok(());
                }

                results
                    .lock()
                    .expect("retrieval results lock poisoned")
                    .insert(retriever.name().to_string(), docs);
                Ok(())
            });
        }

        let mut first_error: Option<RetrievalError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                // Siblings unwound by our own cancel are not the root cause.
                Ok(Err(RetrievalError::Cancelled)) => {}
                Ok(Err(error)) => {
                    if first_error.is_none() {
                        cancel.cancel();
                        first_error = Some(error);
                    }
                }
                Err(join_error) => {
                    if first_error.is_none() {
                        cancel.cancel();
                        first_error = Some(RetrievalError::Task(join_error.to_string()));
                    }
                }
            }
        }

        if let Some(error) = first_error {
            return Err(error);
        }
        if cancel.is_cancelled() {
            return Err(RetrievalError::Cancelled);
        }

        let docs_by_source = std::mem::take(
            &mut *docs_by_source
                .lock()
                .expect("retrieval results lock poisoned"),
        );
        Ok(self.combine(docs_by_source))
    }

    fn combine(&self, mut docs_by_source: HashMap<String, Vec<Document>>) -> Vec<Document> {
        match &self.policy {
            CombinePolicy::Concatenate => {
                let mut combined = Vec::new();
                for retriever in &self.retrievers {
                    if let Some(docs) = docs_by_source.remove(retriever.name()) {
                        combined.extend(docs);
                    }
                }
                combined
            }
            CombinePolicy::RankedBy { content, ranking } => {
                let content_docs = docs_by_source.remove(content.as_str()).unwrap_or_default();
                let ranking_docs = docs_by_source.remove(ranking.as_str()).unwrap_or_default();

                let mut content_by_link: HashMap<String, Document> = HashMap::new();
                for doc in content_docs {
                    if let Some(link) = doc.web_reference.as_ref().map(|r| r.link.clone()) {
                        content_by_link.insert(link, doc);
                    }
                }

                let mut combined = Vec::new();
                for ranked in &ranking_docs {
                    let Some(reference) = ranked.web_reference.as_ref() else {
                        continue;
                    };
                    match content_by_link.remove(&reference.link) {
                        Some(doc) => combined.push(doc),
                        None => warn!(
                            title = %ranked.title,
                            link = %reference.link,
                            source = %content,
                            "no content document for ranked result"
                        ),
                    }
                }
                combined
            }
        }
    }
}
