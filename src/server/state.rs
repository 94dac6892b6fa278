//! Shared server state.

use std::collections::HashMap;
use std::sync::Arc;

use crate::document::Corpus;
use crate::generation::Generator;
use crate::retrieval::{CombinePolicy, Retriever};

/// State shared by request handlers.
///
/// The corpus registry is built once at startup; every corpus selector in a
/// request must map through it or the request is rejected before retrieval.
#[derive(Clone)]
pub struct ServerState {
    pub retrievers_by_corpus: Arc<HashMap<Corpus, Vec<Arc<dyn Retriever>>>>,
    pub generator: Arc<dyn Generator>,
    pub top_k: usize,
    pub combine: CombinePolicy,
}
