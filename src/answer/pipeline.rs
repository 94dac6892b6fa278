//! Per-request orchestration.
//!
//! Wires retrieval, generation, classification and transport writing into
//! one cancellable unit: retrieval must complete before generation starts;
//! generation and classification then run as concurrent stages joined by a
//! bounded handoff channel; classified events are relayed to the transport
//! sink. Every hop has capacity 1, so a slow client throttles classification,
//! which throttles generation.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use super::classifier::ChunkClassifier;
use super::events::AnswerEvent;
use crate::generation::{GenerationError, Generator};
use crate::retrieval::{RetrievalCoordinator, RetrievalError};

/// Capacity of every channel hop between pipeline stages.
const CHANNEL_CAPACITY: usize = 1;

/// Errors a pipeline run can produce.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("client went away before the stream completed")]
    ClientGone,

    #[error("pipeline cancelled")]
    Cancelled,

    #[error("pipeline task failed: {0}")]
    Task(String),
}

/// One request's answer pipeline.
pub struct AnswerPipeline {
    coordinator: RetrievalCoordinator,
    generator: Arc<dyn Generator>,
}

impl AnswerPipeline {
    pub fn new(coordinator: RetrievalCoordinator, generator: Arc<dyn Generator>) -> Self {
        Self {
            coordinator,
            generator,
        }
    }

    /// Run the request to completion.
    ///
    /// Exactly one terminal event is written to `events`: `done` after the
    /// event stream drains cleanly, otherwise a best-effort `error`. A
    /// failure to write the terminal event is logged, not retried.
    pub async fn run(
        &self,
        cancel: CancellationToken,
        query: &str,
        events: mpsc::Sender<AnswerEvent>,
    ) {
        match self.execute(&cancel, query, &events).await {
            Ok(()) => {
                if events.send(AnswerEvent::done()).await.is_err() {
                    warn!("failed to write final done event");
                }
            }
            Err(err) => {
                error!(error = %err, "answer pipeline failed");
                cancel.cancel();
                let terminal = AnswerEvent::Error("Internal server error occurred.".to_string());
                if events.send(terminal).await.is_err() {
                    warn!("failed to write final error event");
                }
            }
        }
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        query: &str,
        events_out: &mpsc::Sender<AnswerEvent>,
    ) -> Result<(), PipelineError> {
        // Retrieval must complete before generation starts; the retrieved
        // documents are part of the generation input.
        let documents = self
            .coordinator
            .retrieve(cancel.child_token(), query)
            .await?;

        // The documents reference precedes all content events.
        events_out
            .send(AnswerEvent::DocumentsReference(documents.clone()))
            .await
            .map_err(|_| PipelineError::ClientGone)?;

        let (fragment_tx, fragment_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let generator = self.generator.clone();
        let generation_cancel = cancel.child_token();
        let generation_query = query.to_string();
        let generation = tokio::spawn(async move {
            generator
                .generate(
                    generation_cancel,
                    &generation_query,
                    &documents,
                    fragment_tx,
                    true,
                )
                .await
        });

        let classification = tokio::spawn(ChunkClassifier::default().run(
            cancel.child_token(),
            fragment_rx,
            event_tx,
        ));

        let relay_result = relay_events(cancel, event_rx, events_out).await;
        if relay_result.is_err() {
            // Unwind the producing stages; each observes the token at its
            // next suspension point.
            cancel.cancel();
        }

        let generation_result = generation.await;
        let _ = classification.await;

        relay_result?;
        match generation_result {
            Ok(result) => result?,
            Err(join_error) => return Err(PipelineError::Task(join_error.to_string())),
        }
        Ok(())
    }
}

/// Relay classified events into the transport sink until the event channel
/// is exhausted.
async fn relay_events(
    cancel: &CancellationToken,
    mut events: mpsc::Receiver<AnswerEvent>,
    out: &mpsc::Sender<AnswerEvent>,
) -> Result<(), PipelineError> {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    if out.send(event).await.is_err() {
                        return Err(PipelineError::ClientGone);
                    }
                }
                None => return Ok(()),
            },
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
        }
    }
}
