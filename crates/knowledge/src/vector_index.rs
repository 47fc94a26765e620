//! In-memory vector index over chunk embeddings.
//!
//! Search is exact: every stored vector is scored by cosine similarity.

use crate::index;
use crate::types::{Chunk, IndexMetadata};
use chrono::Utc;
use ragent_core::{AppError, AppResult};
use std::collections::HashSet;
use std::path::Path;

/// A chunk paired with its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// Immutable set of embedded chunks for one embedding model.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    metadata: IndexMetadata,
    entries: Vec<IndexEntry>,
}

/// Result of reading a persisted index.
#[derive(Debug)]
pub enum LoadOutcome {
    /// Index read and built for the requested model
    Loaded(VectorIndex),
    /// Nothing persisted at the location
    NotFound,
    /// Persisted index belongs to another embedding model
    Incompatible { stored: String, requested: String },
}

impl VectorIndex {
    /// Pair chunk `i` with embedding `i`.
    ///
    /// All embeddings must share one non-zero length.
    pub fn build(model: &str, chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> AppResult<Self> {
        if chunks.len() != embeddings.len() {
            return Err(AppError::EmbeddingCountMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }

        let dimensions = embeddings.first().map(Vec::len).unwrap_or(0);
        if embeddings.iter().any(|e| e.len() != dimensions) || (dimensions == 0 && !chunks.is_empty()) {
            return Err(AppError::Provider(format!(
                "Embedding dimension mismatch: expected every vector to have {} values",
                dimensions
            )));
        }

        let document_count = chunks
            .iter()
            .map(|c| c.document.as_str())
            .collect::<HashSet<_>>()
            .len();

        let metadata = IndexMetadata {
            model: model.to_string(),
            dimensions,
            built_at: Utc::now(),
            chunk_count: chunks.len(),
            document_count,
            source_fingerprint: String::new(),
        };

        let entries = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexEntry { chunk, embedding })
            .collect();

        tracing::debug!(
            "Built vector index: {} chunks, {} dimensions, model {}",
            metadata.chunk_count,
            metadata.dimensions,
            metadata.model
        );

        Ok(Self { metadata, entries })
    }

    /// Record the fingerprint of the document set this index came from.
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.metadata.source_fingerprint = fingerprint.into();
        self
    }

    /// Reassemble an index read back from storage.
    pub(crate) fn from_parts(metadata: IndexMetadata, entries: Vec<IndexEntry>) -> Self {
        Self { metadata, entries }
    }

    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn model(&self) -> &str {
        &self.metadata.model
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the `k` chunks most similar to `query`, best first.
    ///
    /// Equal scores keep insertion order. `k` larger than the index returns
    /// every chunk; `k == 0` returns nothing.
    pub fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<(Chunk, f32)>> {
        if self.entries.is_empty() {
            return Err(AppError::EmptyIndex);
        }
        if query.len() != self.metadata.dimensions {
            return Err(AppError::Provider(format!(
                "Query embedding has {} dimensions, index has {}",
                query.len(),
                self.metadata.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let score = cosine_similarity(query, &entry.embedding);
                (i, if score.is_nan() { f32::NEG_INFINITY } else { score })
            })
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        tracing::debug!(
            "Retrieved {} chunks (requested top-{})",
            scored.len(),
            k
        );

        Ok(scored
            .into_iter()
            .map(|(i, score)| (self.entries[i].chunk.clone(), score))
            .collect())
    }

    /// Write the index to `destination`, replacing any previous file atomically.
    pub fn persist(&self, destination: &Path) -> AppResult<()> {
        index::write_index(self, destination)
    }

    /// Read an index from `source` if it was built with `expected_model`.
    ///
    /// A damaged or inconsistent file is reported as `AppError::IndexCorrupt`.
    pub fn load(source: &Path, expected_model: &str) -> AppResult<LoadOutcome> {
        index::read_index(source, expected_model)
    }
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
