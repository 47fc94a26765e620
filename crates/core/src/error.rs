//! Error types for ragent.
//!
//! This module defines a unified error enum shared by every crate in the
//! workspace. Each variant maps to a stable [`ErrorKind`] so callers at the
//! service boundary can report failures as structured data.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for ragent.
///
/// All fallible functions return `Result<T, AppError>`.
/// Errors are represented and propagated, never panicked on.
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid or missing settings. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedding or generation service unreachable or timed out
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Provider answered, but the response was unusable
    #[error("Provider error: {0}")]
    Provider(String),

    /// Persisted index was built with a different embedding model
    #[error("Index built with embedding model '{stored}' cannot serve model '{requested}'")]
    IndexIncompatible { stored: String, requested: String },

    /// Persisted index exists but cannot be trusted
    #[error("Index corrupt: {0}")]
    IndexCorrupt(String),

    /// Search against an index holding zero chunks
    #[error("Index is empty: no documents have been indexed")]
    EmptyIndex,

    /// Chunks and embeddings do not pair up
    #[error("Embedding count mismatch: {chunks} chunks but {embeddings} embeddings")]
    EmbeddingCountMismatch { chunks: usize, embeddings: usize },

    /// Query attempted before the index reached the ready state
    #[error("Pipeline not ready: {0}")]
    PipelineNotReady(String),

    /// Caller supplied unusable input
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Knowledge base and indexing errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Stable, serializable classification of an [`AppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConfigurationError,
    ProviderUnavailable,
    ProviderError,
    IndexIncompatible,
    IndexCorrupt,
    EmptyIndex,
    EmbeddingCountMismatch,
    PipelineNotReady,
    InvalidRequest,
    IoError,
    InternalError,
}

impl ErrorKind {
    /// Get the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigurationError => "configuration_error",
            Self::ProviderUnavailable => "provider_unavailable",
            Self::ProviderError => "provider_error",
            Self::IndexIncompatible => "index_incompatible",
            Self::IndexCorrupt => "index_corrupt",
            Self::EmptyIndex => "empty_index",
            Self::EmbeddingCountMismatch => "embedding_count_mismatch",
            Self::PipelineNotReady => "pipeline_not_ready",
            Self::InvalidRequest => "invalid_request",
            Self::IoError => "io_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AppError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::ConfigurationError,
            Self::Io(_) => ErrorKind::IoError,
            Self::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            Self::Provider(_) => ErrorKind::ProviderError,
            Self::IndexIncompatible { .. } => ErrorKind::IndexIncompatible,
            Self::IndexCorrupt(_) => ErrorKind::IndexCorrupt,
            Self::EmptyIndex => ErrorKind::EmptyIndex,
            Self::EmbeddingCountMismatch { .. } => ErrorKind::EmbeddingCountMismatch,
            Self::PipelineNotReady(_) => ErrorKind::PipelineNotReady,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Knowledge(_) | Self::Prompt(_) | Self::Serialization(_) | Self::Other(_) => {
                ErrorKind::InternalError
            }
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            AppError::ProviderUnavailable("refused".into()).kind(),
            ErrorKind::ProviderUnavailable
        );
        assert_eq!(AppError::EmptyIndex.kind(), ErrorKind::EmptyIndex);
        assert_eq!(
            AppError::Prompt("bad".into()).kind(),
            ErrorKind::InternalError
        );
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::PipelineNotReady).unwrap();
        assert_eq!(json, "\"pipeline_not_ready\"");
        assert_eq!(ErrorKind::PipelineNotReady.as_str(), "pipeline_not_ready");
    }

    #[test]
    fn test_count_mismatch_message() {
        let err = AppError::EmbeddingCountMismatch {
            chunks: 3,
            embeddings: 2,
        };
        assert_eq!(
            err.to_string(),
            "Embedding count mismatch: 3 chunks but 2 embeddings"
        );
    }
}
