//! Search API routes.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use axum::extract::State;
use axum_extra::extract::Query;
use futures::stream;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::state::ServerState;
use crate::answer::AnswerPipeline;
use crate::document::Corpus;
use crate::retrieval::{RetrievalCoordinator, Retriever};

#[derive(Deserialize)]
struct SearchParams {
    /// The query string.
    #[serde(default)]
    q: String,
    /// Corpus selectors; repeatable.
    #[serde(default)]
    corpus: Vec<String>,
}

/// GET /search - stream a cited answer as Server-Sent Events.
///
/// Validation happens before any retrieval: a missing query, zero corpus
/// selectors, or an unregistered corpus rejects the request synchronously.
async fn search(
    State(state): State<ServerState>,
    Query(params): Query<SearchParams>,
) -> Response {
    if params.corpus.is_empty() {
        return bad_request("at least one 'corpus' parameter is required");
    }
    if params.q.is_empty() {
        return bad_request("query parameter, 'q', is required");
    }

    let mut retrievers: Vec<Arc<dyn Retriever>> = Vec::new();
    for selector in &params.corpus {
        let registered = selector
            .parse::<Corpus>()
            .ok()
            .and_then(|corpus| state.retrievers_by_corpus.get(&corpus));
        match registered {
            Some(set) => retrievers.extend(set.iter().cloned()),
            None => return bad_request(&format!("corpus, {}, is invalid", selector)),
        }
    }

    let pipeline = AnswerPipeline::new(
        RetrievalCoordinator::new(retrievers, state.top_k, state.combine.clone()),
        state.generator.clone(),
    );

    let cancel = CancellationToken::new();
    let (event_tx, event_rx) = mpsc::channel(1);

    let run_cancel = cancel.clone();
    let query = params.q.clone();
    tokio::spawn(async move {
        pipeline.run(run_cancel, &query, event_tx).await;
    });

    // Dropping the response stream (client disconnect) drops the guard and
    // cancels the pipeline.
    let guard = cancel.drop_guard();
    let stream = stream::unfold((event_rx, guard), |(mut events, guard)| async move {
        let event = events.recv().await?;
        let json = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Some((
            Ok::<_, Infallible>(Event::default().data(json)),
            (events, guard),
        ))
    });

    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
        .into_response()
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

pub fn make_search_routes(state: ServerState) -> Router {
    Router::new().route("/search", get(search)).with_state(state)
}
