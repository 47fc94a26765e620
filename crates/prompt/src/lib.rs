//! Prompt system for ragent.
//!
//! This crate provides structured prompt management with:
//! - Built-in answer and summarization prompts
//! - YAML-based prompt overrides
//! - Handlebars template rendering with value-only substitution

pub mod builder;
pub mod loader;
pub mod templates;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{list_prompts, load_prompt, resolve_prompt};
pub use templates::PromptSet;
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
