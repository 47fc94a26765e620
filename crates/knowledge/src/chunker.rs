//! Text chunking with configurable size and overlap.
//!
//! Sizes and offsets are counted in characters, never bytes.

use crate::types::{Chunk, Document};
use ragent_core::{AppError, AppResult};

/// Splits documents into overlapping, bounded-size chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker. `overlap` must be smaller than `chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> AppResult<Self> {
        if chunk_size == 0 {
            return Err(AppError::Config(
                "Chunk size must be a positive integer".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(AppError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split a document into ordered chunks.
    ///
    /// Consecutive chunks share exactly `overlap` characters and together
    /// cover the whole text. Blank documents produce no chunks.
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        let text = &document.content;
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let window_end = (start + self.chunk_size).min(total);
            let end = if window_end == total {
                total
            } else {
                self.boundary(&chars, start, window_end)
            };

            let position = chunks.len() as u32;
            chunks.push(Chunk {
                id: format!("{}#{}", document.name, position),
                document: document.name.clone(),
                position,
                start,
                end,
                text: chars[start..end].iter().collect(),
            });

            if end == total {
                break;
            }
            start = end - self.overlap;
        }

        tracing::debug!(
            "Chunked {} into {} chunks (size: {}, overlap: {})",
            document.name,
            chunks.len(),
            self.chunk_size,
            self.overlap
        );

        chunks
    }

    /// Pick where a chunk starting at `start` ends, given the hard window end.
    ///
    /// Prefers a paragraph break, then a line break, then any whitespace.
    /// Paragraph and line breaks must keep at least half the window; any
    /// boundary must leave the chunk longer than the overlap.
    fn boundary(&self, chars: &[char], start: usize, window_end: usize) -> usize {
        let min_end = start + self.overlap + 1;
        let half_end = (start + self.chunk_size / 2).max(min_end);

        let paragraph = |end: usize| end >= 2 && chars[end - 1] == '\n' && chars[end - 2] == '\n';
        let line = |end: usize| chars[end - 1] == '\n';
        let space = |end: usize| chars[end - 1].is_whitespace();

        last_end(half_end, window_end, paragraph)
            .or_else(|| last_end(half_end, window_end, line))
            .or_else(|| last_end(min_end, window_end, space))
            .unwrap_or(window_end)
    }
}

/// Largest end in `floor..=ceil` accepted by `pred`.
fn last_end(floor: usize, ceil: usize, pred: impl Fn(usize) -> bool) -> Option<usize> {
    (floor..=ceil).rev().find(|&end| pred(end))
}
