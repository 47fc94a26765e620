//! Caller-facing operations.
//!
//! Every operation here returns a structured result; errors are reported as
//! `{error, kind}` values instead of being propagated.

use crate::cache::{IndexFailure, IndexManager, IndexPhase};
use crate::chunker::Chunker;
use crate::documents::DocumentStore;
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::rag::{Answer, PipelineOptions, QueryPipeline};
use crate::types::Document;
use chrono::{DateTime, Utc};
use ragent_core::{AppConfig, AppError, AppResult, ErrorKind};
use ragent_llm::{create_client_from_config, LlmClient};
use ragent_prompt::PromptSet;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// A failure reported across the service boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: ErrorKind,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        Self {
            error: err.to_string(),
            kind: err.kind(),
        }
    }
}

/// Result of [`RagService::submit_query`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryResponse {
    Answer(Answer),
    Error(ErrorResponse),
}

impl QueryResponse {
    pub fn is_answer(&self) -> bool {
        matches!(self, Self::Answer(_))
    }
}

/// Result of a document mutation or rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperationResponse {
    Success { message: String, chunk_count: usize },
    Failure(ErrorResponse),
}

impl OperationResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Snapshot of the index for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStatus {
    pub phase: IndexPhase,
    pub embedding_provider: String,
    pub embedding_model: String,
    pub generation_model: String,
    pub documents_dir: PathBuf,
    pub index_file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub built_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<IndexFailure>,
}

/// The question-answering service over one documents directory.
pub struct RagService {
    config: AppConfig,
    manager: Arc<IndexManager>,
    pipeline: QueryPipeline,
}

impl RagService {
    /// Build the service from explicit providers.
    ///
    /// Invalid settings or prompt overrides fail here, before any index work.
    pub fn new(
        config: AppConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn LlmClient>,
    ) -> AppResult<Self> {
        config.validate()?;

        let chunker = Chunker::new(config.chunk_size, config.chunk_overlap)?;
        let prompts = PromptSet::load(&config.prompts_dir())?;
        let store = DocumentStore::new(config.documents_path(), config.seed_sample_document);

        let manager = Arc::new(
            IndexManager::new(
                store,
                chunker,
                embedder,
                &config.index_path(),
                config.embedding_timeout(),
            )
            .with_rebuild_when_stale(config.rebuild_when_stale),
        );

        let pipeline = QueryPipeline::new(
            Arc::clone(&manager),
            generator,
            prompts,
            PipelineOptions::from_config(&config),
        );

        Ok(Self {
            config,
            manager,
            pipeline,
        })
    }

    /// Build the service with the providers named in `config`.
    pub fn from_config(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        let embedder = create_provider(&config)?;
        let generator = create_client_from_config(&config)?;
        Self::new(config, embedder, generator)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn manager(&self) -> &IndexManager {
        &self.manager
    }

    /// Load the persisted index or build one.
    pub async fn initialize(&self) -> AppResult<()> {
        let index = self.manager.ensure_ready().await?;
        tracing::info!(
            "Ready: {} chunks from {} documents",
            index.len(),
            index.metadata().document_count
        );
        Ok(())
    }

    /// Answer a question, propagating failures.
    pub async fn query(&self, question: &str) -> AppResult<Answer> {
        self.pipeline.answer(question).await
    }

    /// Answer a question. Failures become an error response.
    pub async fn submit_query(&self, question: &str) -> QueryResponse {
        match self.query(question).await {
            Ok(answer) => QueryResponse::Answer(answer),
            Err(e) => {
                tracing::warn!("Query failed: {}", e);
                QueryResponse::Error(ErrorResponse::from(&e))
            }
        }
    }

    /// Write a document and reindex before returning.
    pub async fn add_document(&self, content: &str, name: Option<&str>) -> OperationResponse {
        match self.manager.add_document(content, name).await {
            Ok((path, index)) => OperationResponse::Success {
                message: format!("Added {} and rebuilt the index", path.display()),
                chunk_count: index.len(),
            },
            Err(e) => {
                tracing::warn!("Adding document failed: {}", e);
                OperationResponse::Failure(ErrorResponse::from(&e))
            }
        }
    }

    /// Discard the index and rebuild it from the documents directory.
    pub async fn rebuild_index(&self) -> OperationResponse {
        match self.manager.rebuild().await {
            Ok(index) => OperationResponse::Success {
                message: format!(
                    "Rebuilt index from {} documents",
                    index.metadata().document_count
                ),
                chunk_count: index.len(),
            },
            Err(e) => {
                tracing::warn!("Rebuild failed: {}", e);
                OperationResponse::Failure(ErrorResponse::from(&e))
            }
        }
    }

    /// Read every supported document in the documents directory.
    pub async fn list_documents(&self) -> AppResult<Vec<Document>> {
        let store = self.manager.store().clone();
        tokio::task::spawn_blocking(move || store.list_documents())
            .await
            .map_err(|e| AppError::Knowledge(format!("Document scan task failed: {}", e)))?
    }

    /// Report the index phase and, when ready, what it holds.
    pub async fn status(&self) -> IndexStatus {
        let embedder = self.manager.embedder();
        let mut status = IndexStatus {
            phase: self.manager.phase(),
            embedding_provider: embedder.provider_name().to_string(),
            embedding_model: embedder.model_name().to_string(),
            generation_model: self.config.llm_model.clone(),
            documents_dir: self.manager.store().root().to_path_buf(),
            index_file: self.manager.index_file().to_path_buf(),
            chunk_count: None,
            document_count: None,
            built_at: None,
            stale: None,
            failure: self.manager.failure(),
        };

        if let Ok(index) = self.manager.snapshot() {
            let metadata = index.metadata();
            status.chunk_count = Some(metadata.chunk_count);
            status.document_count = Some(metadata.document_count);
            status.built_at = Some(metadata.built_at);
        }

        match self.manager.is_stale().await {
            Ok(stale) => status.stale = stale,
            Err(e) => tracing::warn!("Cannot compare documents with the index: {}", e),
        }

        status
    }
}
