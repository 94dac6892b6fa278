//! SERP API retriever.
//!
//! SERP obtains documents and web ranking by scraping the relevant Google
//! Search results page for a given query.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{Retriever, RetrieverError};
use crate::document::{Corpus, Document, Passage, WebReference};

pub const SERP_SOURCE: &str = "serp";

/// HTTP client for the SerpApi Google Search endpoint.
pub struct SerpClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SerpClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn query(&self, query: &str, top_k: usize) -> Result<SerpSearchResult, RetrieverError> {
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("q", query),
                ("api_key", self.api_key.as_str()),
                ("engine", "google"),
                ("num", &top_k.to_string()),
            ])
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

        response.json().await.map_err(|e| {
            RetrieverError::InvalidResponse(format!("Failed to parse SERP API response: {}", e))
        })
    }
}

// SERP API types. Not all response fields are represented, just the ones
// that are interesting to us currently.

#[derive(Debug, Deserialize)]
struct SerpSearchResult {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OrganicResult {
    title: String,
    link: String,
    snippet: String,
    displayed_link: String,
    thumbnail: String,
    date: String,
    author: String,
    favicon: String,
}

/// Web retriever backed by the SERP API.
pub struct SerpRetriever {
    client: SerpClient,
}

impl SerpRetriever {
    pub fn new(client: SerpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Retriever for SerpRetriever {
    fn name(&self) -> &str {
        SERP_SOURCE
    }

    async fn query(&self, query: &str, top_k: usize) -> Result<Vec<Document>, RetrieverError> {
        let result = self.client.query(query, top_k).await?;

        let docs = result
            .organic_results
            .into_iter()
            .map(|r| Document {
                passages: vec![Passage {
                    text: r.snippet.clone(),
                }],
                title: r.title.clone(),
                corpus: Corpus::Web,
                web_reference: Some(WebReference {
                    title: r.title,
                    link: r.link,
                    displayed_link: r.displayed_link,
                    blurb: r.snippet,
                    date: r.date,
                    author: r.author,
                    favicon: r.favicon,
                    thumbnail: r.thumbnail,
                    api_source: SERP_SOURCE.to_string(),
                }),
            })
            .collect();

        Ok(docs)
    }
}
