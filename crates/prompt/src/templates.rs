//! Built-in prompts used by the answer pipeline.

use crate::loader;
use crate::types::PromptDefinition;
use ragent_core::AppResult;
use std::path::Path;

/// Prompt that conditions the generator on retrieved context.
pub const ANSWER_PROMPT_ID: &str = "rag.answer";

/// Prompt that asks the generator to shorten an over-long answer.
pub const SUMMARIZE_PROMPT_ID: &str = "rag.summarize";

/// Built-in answer prompt.
pub fn answer_prompt() -> PromptDefinition {
    PromptDefinition::new(
        ANSWER_PROMPT_ID,
        "Answer from retrieved context",
        "Context: {{context}}\n\nQuestion: {{question}}\nAnswer concisely:",
        &["context", "question"],
    )
}

/// Built-in summarization prompt.
pub fn summarize_prompt() -> PromptDefinition {
    PromptDefinition::new(
        SUMMARIZE_PROMPT_ID,
        "Shorten an answer",
        "Summarize the following answer to be at most {{max_length}} characters. \
         Keep key facts and be concise.\n\nAnswer:\n{{answer}}\n\nSummary:",
        &["answer", "max_length"],
    )
}

/// Look up a built-in prompt by ID.
pub fn builtin(id: &str) -> Option<PromptDefinition> {
    match id {
        ANSWER_PROMPT_ID => Some(answer_prompt()),
        SUMMARIZE_PROMPT_ID => Some(summarize_prompt()),
        _ => None,
    }
}

/// The prompts the pipeline renders.
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub answer: PromptDefinition,
    pub summarize: PromptDefinition,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            answer: answer_prompt(),
            summarize: summarize_prompt(),
        }
    }
}

impl PromptSet {
    /// Built-in prompts, with any overrides found in `prompts_dir` applied.
    ///
    /// A malformed override is a configuration error.
    pub fn load(prompts_dir: &Path) -> AppResult<Self> {
        Ok(Self {
            answer: loader::resolve_prompt(prompts_dir, &answer_prompt())?,
            summarize: loader::resolve_prompt(prompts_dir, &summarize_prompt())?,
        })
    }
}
