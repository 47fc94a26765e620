//! Document indexing and question answering.
//!
//! Provides local-first RAG: documents are chunked, embedded and kept in an
//! in-memory vector index persisted to SQLite. Questions are answered by the
//! generation provider from the most similar chunks.

pub mod cache;
pub mod chunker;
pub mod documents;
pub mod embeddings;
pub mod index;
pub mod rag;
pub mod service;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use cache::{IndexFailure, IndexManager, IndexPhase};
pub use chunker::Chunker;
pub use documents::DocumentStore;
pub use embeddings::{create_provider, EmbeddingProvider};
pub use rag::{Answer, LengthReduction, RagSourceRef};
pub use service::{ErrorResponse, IndexStatus, OperationResponse, QueryResponse, RagService};
pub use types::{Chunk, Document, DocumentFormat, IndexMetadata};
pub use vector_index::{LoadOutcome, VectorIndex};
