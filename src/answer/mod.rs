//! The streaming answer pipeline: classification of generated text into
//! typed events and the per-request orchestration that produces them.

mod classifier;
mod events;
mod pipeline;

pub use classifier::ChunkClassifier;
pub use events::AnswerEvent;
pub use pipeline::{AnswerPipeline, PipelineError};
