//! Mapping retrieved chunks to source references.

use crate::rag::types::RagSourceRef;
use crate::types::Chunk;
use std::collections::HashSet;

/// Maximum snippet length for source references, in characters.
pub const MAX_SNIPPET_LENGTH: usize = 150;

/// Map chunks to human-readable source references, in retrieval order.
///
/// Chunks sharing a document and span are reported once.
pub fn map_chunks_to_sources(chunks: &[Chunk]) -> Vec<RagSourceRef> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for chunk in chunks {
        let location = format!("chars {}-{}", chunk.start, chunk.end);
        if !seen.insert((chunk.document.clone(), location.clone())) {
            continue;
        }

        sources.push(RagSourceRef {
            source: chunk.document.clone(),
            location,
            snippet: truncate_snippet(&chunk.text, MAX_SNIPPET_LENGTH),
        });
    }

    sources
}

/// Shorten `text` to at most `max_len` characters, ending with "..." when cut.
///
/// Prefers to break at a word boundary.
pub fn truncate_snippet(text: &str, max_len: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_len {
        return text.to_string();
    }

    let budget = max_len.saturating_sub(3);
    let truncated: String = text.chars().take(budget).collect();
    let cut = match truncated.rfind(char::is_whitespace) {
        Some(last_space) if last_space > 0 => truncated[..last_space].trim_end(),
        _ => truncated.as_str(),
    };
    format!("{}...", cut)
}
