//! Shared end-to-end test fixtures.
//!
//! Spawns the real axum server on an ephemeral port with stub retrieval and
//! generation backends, plus a small client for reading the SSE stream.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use answer_server::document::{Corpus, Document, Passage, WebReference};
use answer_server::generation::llm::LlmError;
use answer_server::generation::{GenerationError, Generator};
use answer_server::retrieval::{CombinePolicy, Retriever, RetrieverError};
use answer_server::server::{make_search_routes, ServerState};

pub fn web_document(title: &str, link: &str) -> Document {
    Document {
        passages: vec![Passage {
            text: format!("passage about {}", title),
        }],
        title: title.to_string(),
        corpus: Corpus::Web,
        web_reference: Some(WebReference {
            title: title.to_string(),
            link: link.to_string(),
            api_source: "stub".to_string(),
            ..Default::default()
        }),
    }
}

pub struct StubRetriever {
    pub docs: Vec<Document>,
    pub fail: bool,
}

#[async_trait]
impl Retriever for StubRetriever {
    fn name(&self) -> &str {
        "stub"
    }

    async fn query(&self, _query: &str, _top_k: usize) -> Result<Vec<Document>, RetrieverError> {
        if self.fail {
            return Err(RetrieverError::Connection("stub retriever down".to_string()));
        }
        Ok(self.docs.clone())
    }
}

pub struct StubGenerator {
    pub fragments: Vec<String>,
    pub fail_after: Option<usize>,
}

#[async_trait]
impl Generator for StubGenerator {
    async fn generate(
        &self,
        cancel: CancellationToken,
        _query: &str,
        _documents: &[Document],
        fragments: mpsc::Sender<String>,
        _should_stream: bool,
    ) -> Result<(), GenerationError> {
        for (i, fragment) in self.fragments.iter().enumerate() {
            if self.fail_after == Some(i) {
                return Err(GenerationError::Provider(LlmError::Connection(
                    "stub provider down".to_string(),
                )));
            }
            tokio::select! {
                _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
                sent = fragments.send(fragment.clone()) => {
                    if sent.is_err() {
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    }
}

pub struct TestServer {
    pub base_url: String,
}

impl TestServer {
    pub async fn spawn(retriever: StubRetriever, generator: StubGenerator) -> Self {
        let mut registry: HashMap<Corpus, Vec<Arc<dyn Retriever>>> = HashMap::new();
        registry.insert(Corpus::Web, vec![Arc::new(retriever)]);

        let state = ServerState {
            retrievers_by_corpus: Arc::new(registry),
            generator: Arc::new(generator),
            top_k: 5,
            combine: CombinePolicy::Concatenate,
        };
        let app = make_search_routes(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestServer {
            base_url: format!("http://{}", addr),
        }
    }
}

pub struct TestClient {
    client: reqwest::Client,
    base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    pub async fn search(&self, query: &str, corpora: &[&str]) -> reqwest::Response {
        let mut params: Vec<(&str, &str)> = Vec::new();
        if !query.is_empty() {
            params.push(("q", query));
        }
        for corpus in corpora {
            params.push(("corpus", corpus));
        }

        self.client
            .get(format!("{}/search", self.base_url))
            .query(&params)
            .send()
            .await
            .unwrap()
    }
}

/// Parse the JSON payloads out of an SSE body.
pub fn parse_sse_frames(body: &str) -> Vec<serde_json::Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .filter(|data| !data.trim().is_empty())
        .map(|data| serde_json::from_str(data).expect("frame payload is not valid JSON"))
        .collect()
}
