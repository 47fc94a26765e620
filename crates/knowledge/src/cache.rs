//! Lifecycle of the current vector index.
//!
//! The manager owns the one index queries run against. It loads the persisted
//! copy on first use, rebuilds from the document store when there is none (or
//! it cannot be used), and swaps in a fresh index whenever documents change.
//!
//! Rebuilds and document mutations are serialized through one async mutex, so
//! a mutation arriving mid-rebuild waits for its turn and then rebuilds again.
//! Readers take an `Arc` snapshot and keep it for the whole operation.

use crate::chunker::Chunker;
use crate::documents::DocumentStore;
use crate::embeddings::{embed_chunks, EmbeddingProvider};
use crate::index;
use crate::types::Chunk;
use crate::vector_index::{LoadOutcome, VectorIndex};
use ragent_core::{AppError, AppResult, ErrorKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

/// Observable phase of the index manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexPhase {
    Unloaded,
    Loading,
    Ready,
    Rebuilding,
    Failed,
}

impl IndexPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Rebuilding => "rebuilding",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for IndexPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cause of the last failed load or rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexFailure {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug)]
enum IndexState {
    Unloaded,
    Loading,
    Ready(Arc<VectorIndex>),
    Rebuilding,
    Failed(IndexFailure),
}

/// Owns the current index and every transition between its states.
#[derive(Debug)]
pub struct IndexManager {
    state: RwLock<IndexState>,
    mutation: Mutex<()>,
    store: DocumentStore,
    chunker: Chunker,
    embedder: Arc<dyn EmbeddingProvider>,
    index_file: PathBuf,
    embedding_timeout: Duration,
    rebuild_when_stale: bool,
}

impl IndexManager {
    /// Create a manager in the `Unloaded` phase.
    ///
    /// The persisted index lives under `index_dir`, keyed by the embedder's
    /// model name.
    pub fn new(
        store: DocumentStore,
        chunker: Chunker,
        embedder: Arc<dyn EmbeddingProvider>,
        index_dir: &Path,
        embedding_timeout: Duration,
    ) -> Self {
        let index_file = index::index_path(index_dir, embedder.model_name());
        Self {
            state: RwLock::new(IndexState::Unloaded),
            mutation: Mutex::new(()),
            store,
            chunker,
            embedder,
            index_file,
            embedding_timeout,
            rebuild_when_stale: false,
        }
    }

    /// Rebuild a loaded index whose source documents changed on disk.
    pub fn with_rebuild_when_stale(mut self, enabled: bool) -> Self {
        self.rebuild_when_stale = enabled;
        self
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Path of the persisted index for the configured model.
    pub fn index_file(&self) -> &Path {
        &self.index_file
    }

    pub fn phase(&self) -> IndexPhase {
        match &*self.read_state() {
            IndexState::Unloaded => IndexPhase::Unloaded,
            IndexState::Loading => IndexPhase::Loading,
            IndexState::Ready(_) => IndexPhase::Ready,
            IndexState::Rebuilding => IndexPhase::Rebuilding,
            IndexState::Failed(_) => IndexPhase::Failed,
        }
    }

    /// The current index, if the manager is `Ready`.
    pub fn snapshot(&self) -> AppResult<Arc<VectorIndex>> {
        match &*self.read_state() {
            IndexState::Ready(index) => Ok(Arc::clone(index)),
            IndexState::Failed(failure) => Err(AppError::PipelineNotReady(format!(
                "index failed to build ({}): {}",
                failure.kind, failure.message
            ))),
            IndexState::Unloaded => Err(AppError::PipelineNotReady(
                "index has not been loaded yet".to_string(),
            )),
            IndexState::Loading => {
                Err(AppError::PipelineNotReady("index is loading".to_string()))
            }
            IndexState::Rebuilding => {
                Err(AppError::PipelineNotReady("index is rebuilding".to_string()))
            }
        }
    }

    /// Cause of the last failure, while the manager is `Failed`.
    pub fn failure(&self) -> Option<IndexFailure> {
        match &*self.read_state() {
            IndexState::Failed(failure) => Some(failure.clone()),
            _ => None,
        }
    }

    /// Load the persisted index, or build one, unless already `Ready`.
    ///
    /// Called again after a failure, this retries from `Loading`.
    pub async fn ensure_ready(&self) -> AppResult<Arc<VectorIndex>> {
        let guard = self.mutation.lock().await;

        if let Ok(index) = self.snapshot() {
            return Ok(index);
        }

        self.set_state(IndexState::Loading);
        tracing::info!("Loading index from {:?}", self.index_file);

        let file = self.index_file.clone();
        let model = self.embedder.model_name().to_string();
        let outcome = tokio::task::spawn_blocking(move || VectorIndex::load(&file, &model))
            .await
            .map_err(|e| AppError::Knowledge(format!("Index load task failed: {}", e)));

        match outcome {
            Ok(Ok(LoadOutcome::Loaded(index))) if self.dimensions_differ(&index) => {
                tracing::warn!(
                    "Persisted index has {}-dimensional vectors, embedder produces {:?}; rebuilding",
                    index.metadata().dimensions,
                    self.embedder.dimensions()
                );
                self.rebuild_locked(&guard).await
            }
            Ok(Ok(LoadOutcome::Loaded(index))) => {
                let stale = self.rebuild_when_stale
                    && self
                        .fingerprint_differs(&index)
                        .await
                        .map_err(|e| self.fail(e))?;
                if stale {
                    tracing::info!("Documents changed since the index was built; rebuilding");
                    return self.rebuild_locked(&guard).await;
                }

                tracing::info!(
                    "Loaded index: {} chunks from {} documents (model {})",
                    index.len(),
                    index.metadata().document_count,
                    index.model()
                );
                let index = Arc::new(index);
                self.set_state(IndexState::Ready(Arc::clone(&index)));
                Ok(index)
            }
            Ok(Ok(LoadOutcome::NotFound)) => {
                tracing::info!("No persisted index found; building one");
                self.rebuild_locked(&guard).await
            }
            Ok(Ok(LoadOutcome::Incompatible { stored, requested })) => {
                tracing::warn!(
                    "Persisted index was built with '{}', configured model is '{}'; rebuilding",
                    stored,
                    requested
                );
                self.rebuild_locked(&guard).await
            }
            Ok(Err(AppError::IndexCorrupt(reason))) => {
                tracing::warn!("Persisted index is unusable ({}); rebuilding", reason);
                self.rebuild_locked(&guard).await
            }
            Ok(Err(e)) | Err(e) => Err(self.fail(e)),
        }
    }

    /// Write a document to the store, then rebuild.
    ///
    /// Waits for any rebuild or mutation already in progress.
    pub async fn add_document(
        &self,
        content: &str,
        name: Option<&str>,
    ) -> AppResult<(PathBuf, Arc<VectorIndex>)> {
        let guard = self.mutation.lock().await;

        let store = self.store.clone();
        let content = content.to_string();
        let name = name.map(str::to_string);
        let path = tokio::task::spawn_blocking(move || store.add_document(&content, name.as_deref()))
            .await
            .map_err(|e| AppError::Knowledge(format!("Document write task failed: {}", e)))??;

        let index = self.rebuild_locked(&guard).await?;
        Ok((path, index))
    }

    /// Discard the current index and its persisted copy, then rebuild.
    pub async fn rebuild(&self) -> AppResult<Arc<VectorIndex>> {
        let guard = self.mutation.lock().await;
        self.rebuild_locked(&guard).await
    }

    /// Whether the documents on disk differ from the ones the current index
    /// was built from. `None` when no index is loaded.
    pub async fn is_stale(&self) -> AppResult<Option<bool>> {
        match self.snapshot() {
            Ok(index) => Ok(Some(self.fingerprint_differs(&index).await?)),
            Err(_) => Ok(None),
        }
    }

    /// Whether a non-empty index disagrees with the embedder's known vector length.
    fn dimensions_differ(&self, index: &VectorIndex) -> bool {
        !index.is_empty()
            && self
                .embedder
                .dimensions()
                .is_some_and(|dims| dims != index.metadata().dimensions)
    }

    async fn fingerprint_differs(&self, index: &VectorIndex) -> AppResult<bool> {
        let store = self.store.clone();
        let current = tokio::task::spawn_blocking(move || store.fingerprint())
            .await
            .map_err(|e| AppError::Knowledge(format!("Fingerprint task failed: {}", e)))??;
        Ok(current != index.metadata().source_fingerprint)
    }

    /// Rebuild while holding the mutation lock.
    async fn rebuild_locked(&self, _guard: &MutexGuard<'_, ()>) -> AppResult<Arc<VectorIndex>> {
        self.set_state(IndexState::Rebuilding);

        match self.build_and_persist().await {
            Ok(index) => {
                let index = Arc::new(index);
                self.set_state(IndexState::Ready(Arc::clone(&index)));
                Ok(index)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn build_and_persist(&self) -> AppResult<VectorIndex> {
        index::remove_index(&self.index_file)?;

        let store = self.store.clone();
        let (documents, fingerprint) = tokio::task::spawn_blocking(move || {
            store.seed_if_empty()?;
            let documents = store.list_documents()?;
            let fingerprint = store.fingerprint()?;
            Ok::<_, AppError>((documents, fingerprint))
        })
        .await
        .map_err(|e| AppError::Knowledge(format!("Document scan task failed: {}", e)))??;

        let chunks: Vec<Chunk> = documents
            .iter()
            .flat_map(|document| self.chunker.split(document))
            .collect();

        tracing::info!(
            "Rebuilding index: {} documents, {} chunks",
            documents.len(),
            chunks.len()
        );

        let embeddings = embed_chunks(self.embedder.as_ref(), &chunks, self.embedding_timeout).await?;
        let index = VectorIndex::build(self.embedder.model_name(), chunks, embeddings)?
            .with_fingerprint(fingerprint);

        if index.is_empty() {
            tracing::warn!("No document content to index under {:?}", self.store.root());
        }

        let file = self.index_file.clone();
        tokio::task::spawn_blocking(move || {
            index.persist(&file)?;
            Ok::<_, AppError>(index)
        })
        .await
        .map_err(|e| AppError::Knowledge(format!("Index persist task failed: {}", e)))?
    }

    /// Record `error` as the failure cause and hand it back.
    fn fail(&self, error: AppError) -> AppError {
        tracing::error!("Index unavailable: {}", error);
        self.set_state(IndexState::Failed(IndexFailure {
            kind: error.kind(),
            message: error.to_string(),
        }));
        error
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: IndexState) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!("Index state: {:?} -> {:?}", phase_of(&state), phase_of(&next));
        *state = next;
    }
}

fn phase_of(state: &IndexState) -> IndexPhase {
    match state {
        IndexState::Unloaded => IndexPhase::Unloaded,
        IndexState::Loading => IndexPhase::Loading,
        IndexState::Ready(_) => IndexPhase::Ready,
        IndexState::Rebuilding => IndexPhase::Rebuilding,
        IndexState::Failed(_) => IndexPhase::Failed,
    }
}
