//! Exa retriever.
//!
//! Retrieves web documents with page full text via the Exa search API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{urls, Retriever, RetrieverError};
use crate::document::{Corpus, Document, Passage, WebReference};

pub const EXA_SOURCE: &str = "exa";

/// How much page text to request per result.
const MAX_TEXT_CHARACTERS: usize = 1000;

/// HTTP client for the Exa search endpoint.
pub struct ExaClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ExaClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn search(&self, request: &ExaSearchRequest) -> Result<ExaSearchResponse, RetrieverError> {
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(request)
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
            RetrieverError::InvalidResponse(format!("Failed to parse Exa API response: {}", e))
        })
    }
}

// Exa API types.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaSearchRequest {
    query: String,
    use_autoprompt: bool,
    #[serde(rename = "type")]
    search_type: String,
    num_results: usize,
    contents: ExaContents,
}

#[derive(Debug, Serialize)]
struct ExaContents {
    text: ExaTextContent,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaTextContent {
    max_characters: usize,
}

#[derive(Debug, Deserialize)]
struct ExaSearchResponse {
    #[serde(default)]
    results: Vec<ExaSearchResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ExaSearchResult {
    title: String,
    url: String,
    published_date: String,
    author: String,
    text: String,
    summary: String,
}

/// Web retriever backed by the Exa search service.
pub struct ExaRetriever {
    client: ExaClient,
}

impl ExaRetriever {
    pub fn new(client: ExaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Retriever for ExaRetriever {
    fn name(&self) -> &str {
        EXA_SOURCE
    }

    async fn query(&self, query: &str, top_k: usize) -> Result<Vec<Document>, RetrieverError> {
        let request = ExaSearchRequest {
            query: query.to_string(),
            use_autoprompt: true,
            search_type: "auto".to_string(),
            num_results: top_k,
            contents: ExaContents {
                text: ExaTextContent {
                    max_characters: MAX_TEXT_CHARACTERS,
                },
            },
        };

        let response = self.client.search(&request).await?;

        let mut docs = Vec::with_capacity(response.results.len());
        for r in response.results {
            let parsed = urls::parse(&r.url).map_err(|e| {
                RetrieverError::InvalidResponse(format!(
                    "error parsing web page url '{}': {}",
                    r.url, e
                ))
            })?;

            docs.push(Document {
                passages: vec![Passage { text: r.text }],
                title: r.title.clone(),
                corpus: Corpus::Web,
                web_reference: Some(WebReference {
                    title: r.title,
                    link: r.url,
                    displayed_link: parsed.full_domain(),
                    blurb: r.summary,
                    date: r.published_date,
                    author: r.author,
                    favicon: String::new(),
                    thumbnail: String::new(),
                    api_source: EXA_SOURCE.to_string(),
                }),
            });
        }

        Ok(docs)
    }
}
