//! Embedding provider trait and factory.

use super::providers::{mock::MockProvider, ollama::OllamaProvider};
use ragent_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;

/// Dimensions of the mock provider when none are configured.
pub const DEFAULT_MOCK_DIMENSIONS: usize = 384;

/// Trait for embedding providers.
///
/// An unreachable or timed-out service is `AppError::ProviderUnavailable`.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier. Indexes are keyed by this name.
    fn model_name(&self) -> &str;

    /// Get embedding dimensions, when known before the first call
    fn dimensions(&self) -> Option<usize>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Provider("No embedding returned".to_string()))
    }
}

/// Create the embedding provider selected by configuration.
pub fn create_provider(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match config.embedding_provider.as_str() {
        "mock" => {
            let dimensions = config.embedding_dimensions.unwrap_or(DEFAULT_MOCK_DIMENSIONS);
            Ok(Arc::new(MockProvider::new(dimensions)))
        }

        "ollama" => {
            let provider = OllamaProvider::new(
                &config.endpoint,
                &config.embedding_model,
                config.embedding_dimensions,
                config.embedding_timeout(),
            )?;
            Ok(Arc::new(provider))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: mock, ollama",
            config.embedding_provider
        ))),
    }
}
