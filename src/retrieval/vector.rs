//! Vector-store retriever for the personal corpus.
//!
//! Embeds the query via the model provider, then runs a point search against
//! the configured vector store collection over HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Retriever, RetrieverError};
use crate::document::{Corpus, Document, Passage};
use crate::generation::llm::LlmProvider;

pub const VECTOR_SOURCE: &str = "vector";

/// HTTP client for the vector store's point-search endpoint.
pub struct VectorStoreClient {
    client: Client,
    base_url: String,
    collection: String,
}

impl VectorStoreClient {
    pub fn new(base_url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            collection: collection.into(),
        }
    }

    async fn search(
        &self,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, RetrieverError> {
        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection
        );
        let request = PointSearchRequest {
            vector,
            limit,
            with_payload: true,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RetrieverError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrieverError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: PointSearchResponse = response.json().await.map_err(|e| {
            RetrieverError::InvalidResponse(format!(
                "Failed to parse vector store response: {}",
                e
            ))
        })?;

        Ok(parsed.result)
    }
}

// Vector store API types.

#[derive(Debug, Serialize)]
struct PointSearchRequest {
    vector: Vec<f32>,
    limit: usize,
    with_payload: bool,
}

#[derive(Debug, Deserialize)]
struct PointSearchResponse {
    #[serde(default)]
    result: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    #[serde(default)]
    payload: PointPayload,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PointPayload {
    text: String,
    title: String,
}

/// Personal-corpus retriever over query embeddings.
pub struct VectorRetriever {
    store: VectorStoreClient,
    provider: Arc<dyn LlmProvider>,
}

impl VectorRetriever {
    pub fn new(store: VectorStoreClient, provider: Arc<dyn LlmProvider>) -> Self {
        Self { store, provider }
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    fn name(&self) -> &str {
        VECTOR_SOURCE
    }

    async fn query(&self, query: &str, top_k: usize) -> Result<Vec<Document>, RetrieverError> {
        let embedding = self
            .provider
            .embed(query)
            .await
            .map_err(|e| RetrieverError::Embedding(e.to_string()))?;

        let points = self.store.search(embedding, top_k).await?;

        let docs = points
            .into_iter()
            .map(|point| Document {
                passages: vec![Passage {
                    text: point.payload.text,
                }],
                title: point.payload.title,
                corpus: Corpus::Personal,
                web_reference: None,
            })
            .collect();

        Ok(docs)
    }
}
