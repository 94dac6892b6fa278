//! Typed events of the streaming answer response.
//!
//! Each event is written to the client as one JSON object per SSE frame,
//! shaped `{"type": ..., "data": ...}`.

use serde::Serialize;

use crate::document::Document;

/// One event in the streaming answer response.
///
/// `DocumentsReference` always precedes all content events; exactly one of
/// `Done`/`Error` terminates the stream. Content events preserve generation
/// order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum AnswerEvent {
    /// The retrieved documents the answer is grounded in.
    DocumentsReference(Vec<Document>),

    /// A run of plain answer text.
    Text(String),

    /// An inline citation referencing a document by index.
    Citation(u32),

    /// A fenced code block, delimiters included verbatim.
    CodeBlock(String),

    /// Stream complete.
    Done(String),

    /// Stream aborted.
    Error(String),
}

impl AnswerEvent {
    pub fn done() -> Self {
        AnswerEvent::Done("DONE".to_string())
    }
}
