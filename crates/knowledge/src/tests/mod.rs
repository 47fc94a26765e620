//! Cross-module scenario tests.

mod index_lifecycle;
mod rag_ranking;
mod support;
