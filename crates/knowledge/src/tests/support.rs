//! Stub providers and service builders shared by the scenario tests.

use crate::embeddings::providers::mock::MockProvider;
use crate::embeddings::EmbeddingProvider;
use crate::service::RagService;
use ragent_core::{AppConfig, AppError, AppResult};
use ragent_llm::{LlmClient, LlmRequest, LlmResponse};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Returns the prompt it was given.
pub struct EchoClient;

#[async_trait::async_trait]
impl LlmClient for EchoClient {
    fn provider_name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        Ok(LlmResponse::text(request.prompt.clone(), request.model.clone()))
    }
}

/// Always reports a refused connection.
pub struct FailingClient;

#[async_trait::async_trait]
impl LlmClient for FailingClient {
    fn provider_name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
        Err(AppError::ProviderUnavailable(
            "Cannot connect to Ollama at http://127.0.0.1:9".to_string(),
        ))
    }
}

/// Returns `answer` for answer prompts and `summary` for summarize prompts.
pub struct FixedClient {
    pub answer: String,
    pub summary: String,
    pub calls: AtomicUsize,
}

impl FixedClient {
    pub fn new(answer: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            summary: summary.into(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for FixedClient {
    fn provider_name(&self) -> &str {
        "fixed"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let content = if request.prompt.starts_with("Summarize") {
            &self.summary
        } else {
            &self.answer
        };
        Ok(LlmResponse::text(content.clone(), request.model.clone()))
    }
}

/// One dimension per known text; a text embeds to its own axis.
#[derive(Debug)]
pub struct ExactMatchEmbedder {
    texts: Vec<String>,
}

impl ExactMatchEmbedder {
    pub fn new(texts: &[&str]) -> Self {
        Self {
            texts: texts.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for ExactMatchEmbedder {
    fn provider_name(&self) -> &str {
        "exact"
    }

    fn model_name(&self) -> &str {
        "exact-match"
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.texts.len() + 1)
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut embedding = vec![0.0; self.texts.len() + 1];
                let axis = self
                    .texts
                    .iter()
                    .position(|known| known == text)
                    .unwrap_or(self.texts.len());
                embedding[axis] = 1.0;
                embedding
            })
            .collect())
    }
}

/// Wraps the mock provider, adding latency and an optional run of failures.
#[derive(Debug)]
pub struct ScriptedEmbedder {
    inner: MockProvider,
    model: String,
    delay: Duration,
    failures_left: AtomicUsize,
    pub batches: AtomicUsize,
}

impl ScriptedEmbedder {
    pub fn new(model: &str) -> Self {
        Self {
            inner: MockProvider::new(64),
            model: model.to_string(),
            delay: Duration::ZERO,
            failures_left: AtomicUsize::new(0),
            batches: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the next `count` batches with `ProviderUnavailable`.
    pub fn failing(self, count: usize) -> Self {
        self.failures_left.store(count, Ordering::SeqCst);
        self
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for ScriptedEmbedder {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> Option<usize> {
        self.inner.dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(AppError::ProviderUnavailable(
                "embedding service refused the connection".to_string(),
            ));
        }

        self.inner.embed_batch(texts).await
    }
}

/// Configuration rooted in `workspace`, without the sample document.
pub fn test_config(workspace: &Path) -> AppConfig {
    AppConfig {
        workspace: workspace.to_path_buf(),
        embedding_provider: "mock".to_string(),
        seed_sample_document: false,
        chunk_size: 200,
        chunk_overlap: 20,
        generation_timeout_secs: 5,
        embedding_timeout_secs: 5,
        ..Default::default()
    }
}

/// Write a document under the workspace's documents directory.
pub fn write_document(workspace: &TempDir, name: &str, content: &str) {
    let dir = workspace.path().join("documents");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(name), content).unwrap();
}

pub fn service_with(
    config: AppConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn LlmClient>,
) -> RagService {
    RagService::new(config, embedder, generator).unwrap()
}

/// Service using the mock embedder.
pub fn mock_service(workspace: &TempDir, generator: Arc<dyn LlmClient>) -> RagService {
    service_with(
        test_config(workspace.path()),
        Arc::new(MockProvider::new(64)),
        generator,
    )
}
