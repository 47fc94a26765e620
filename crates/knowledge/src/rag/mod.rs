//! RAG (Retrieval-Augmented Generation) answering system.
//!
//! Provides natural language answering over the document index using LLM synthesis.

pub mod length;
pub mod pipeline;
pub mod sources;
pub mod types;

pub use length::{truncate, AnswerLengthController};
pub use pipeline::{PipelineOptions, QueryPipeline};
pub use types::{Answer, BoundedAnswer, LengthReduction, RagSourceRef};
