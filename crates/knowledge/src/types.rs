//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Format a document was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    PlainText,
    Markdown,
    Pdf,
}

impl DocumentFormat {
    /// Detect the format from a file extension. Unsupported files yield `None`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "txt" | "text" => Some(Self::PlainText),
            "md" | "markdown" => Some(Self::Markdown),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "text",
            Self::Markdown => "markdown",
            Self::Pdf => "pdf",
        }
    }
}

/// A source document read from the documents directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Path relative to the documents directory, `/`-separated
    pub name: String,

    /// Format the text was extracted from
    pub format: DocumentFormat,

    /// Full text
    pub content: String,
}

impl Document {
    /// Create a plain-text document.
    pub fn text(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: DocumentFormat::PlainText,
            content: content.into(),
        }
    }
}

/// A bounded span of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier, `<document>#<position>`
    pub id: String,

    /// Name of the source document
    pub document: String,

    /// Ordinal within the document
    pub position: u32,

    /// Character offset where the span starts
    pub start: usize,

    /// Character offset one past the span end
    pub end: usize,

    /// Text content
    pub text: String,
}

/// Descriptive data stored alongside an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Embedding model the vectors came from
    pub model: String,

    /// Vector length (0 for an index with no chunks)
    pub dimensions: usize,

    /// When the index was built
    pub built_at: DateTime<Utc>,

    /// Number of chunks
    pub chunk_count: usize,

    /// Number of distinct documents contributing chunks
    pub document_count: usize,

    /// Fingerprint of the document set the index was built from
    pub source_fingerprint: String,
}
