//! RAG response types.

use serde::{Deserialize, Serialize};

/// A single source reference used to answer a query.
///
/// This is the user-facing representation of where information came from.
/// Scores and chunk IDs are hidden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagSourceRef {
    /// Document name relative to the documents directory (e.g., "notes/rust.md")
    pub source: String,

    /// Human-readable location within the source, e.g. "chars 0-500"
    pub location: String,

    /// Short snippet showing the relevant evidence (truncated if needed)
    pub snippet: String,
}

/// How an answer was shortened to fit the length limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthReduction {
    /// Returned as generated
    Full,
    /// Replaced by a generated summary
    Summarized,
    /// Cut to the limit
    Truncated,
}

impl LengthReduction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Summarized => "summarized",
            Self::Truncated => "truncated",
        }
    }
}

/// Output of the answer length controller.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedAnswer {
    pub text: String,
    pub reduction: LengthReduction,
}

impl BoundedAnswer {
    pub fn new(text: impl Into<String>, reduction: LengthReduction) -> Self {
        Self {
            text: text.into(),
            reduction,
        }
    }
}

/// Answer to one question.
///
/// Contains the generated text, how it was shortened, and where the
/// retrieved context came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Natural language answer, never longer than the configured limit
    pub answer: String,

    /// Length reduction applied to the generated text
    pub reduction: LengthReduction,

    /// Sources of the retrieved chunks (empty when source documents are disabled)
    pub sources: Vec<RagSourceRef>,
}
