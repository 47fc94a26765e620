//! Embedding generation for document chunks and questions.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};

use crate::types::Chunk;
use ragent_core::{AppError, AppResult};
use std::time::Duration;

/// Texts sent to the provider per call when embedding chunks.
pub const EMBED_BATCH_SIZE: usize = 8;

/// Embed chunk texts in batches of [`EMBED_BATCH_SIZE`].
///
/// `timeout` bounds each provider call, not the whole corpus. A timeout is
/// reported as the provider being unavailable.
pub async fn embed_chunks(
    provider: &dyn EmbeddingProvider,
    chunks: &[Chunk],
    timeout: Duration,
) -> AppResult<Vec<Vec<f32>>> {
    if chunks.is_empty() {
        return Ok(Vec::new());
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

    tracing::info!(
        "Embedding {} chunks using provider '{}' (model: {})",
        texts.len(),
        provider.provider_name(),
        provider.model_name()
    );

    let mut embeddings = Vec::with_capacity(texts.len());
    for batch in texts.chunks(EMBED_BATCH_SIZE) {
        let batch_embeddings = tokio::time::timeout(timeout, provider.embed_batch(batch))
            .await
            .map_err(|_| timed_out("Embedding", timeout))??;
        embeddings.extend(batch_embeddings);
    }

    tracing::debug!("Generated {} embeddings", embeddings.len());
    Ok(embeddings)
}

/// Embed one question, bounded by `timeout`.
pub async fn embed_query(
    provider: &dyn EmbeddingProvider,
    text: &str,
    timeout: Duration,
) -> AppResult<Vec<f32>> {
    tokio::time::timeout(timeout, provider.embed(text))
        .await
        .map_err(|_| timed_out("Embedding", timeout))?
}

/// Error for a provider call that exceeded its deadline.
pub(crate) fn timed_out(what: &str, timeout: Duration) -> AppError {
    AppError::ProviderUnavailable(format!(
        "{} request timed out after {}s. {}",
        what,
        timeout.as_secs_f64(),
        ragent_llm::providers::ollama::UNAVAILABLE_HINT
    ))
}
