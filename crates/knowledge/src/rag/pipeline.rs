//! RAG answering orchestration.
//!
//! Retrieves relevant chunks from the current index and generates an answer
//! via the generation provider.

use crate::cache::IndexManager;
use crate::embeddings::{embed_query, timed_out};
use crate::rag::length::AnswerLengthController;
use crate::rag::sources::map_chunks_to_sources;
use crate::rag::types::Answer;
use crate::types::Chunk;
use ragent_core::{AppConfig, AppError, AppResult};
use ragent_llm::{LlmClient, LlmRequest};
use ragent_prompt::{build_prompt, PromptDefinition, PromptSet};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Per-query settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub model: String,
    pub temperature: f32,
    pub search_k: usize,
    pub max_response_length: usize,
    pub use_source_documents: bool,
    pub generation_timeout: Duration,
    pub embedding_timeout: Duration,
    pub summary_retries: u32,
}

impl PipelineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.llm_model.clone(),
            temperature: config.temperature,
            search_k: config.search_k,
            max_response_length: config.max_response_length,
            use_source_documents: config.use_source_documents,
            generation_timeout: config.generation_timeout(),
            embedding_timeout: config.embedding_timeout(),
            summary_retries: config.summary_retries,
        }
    }
}

/// Answers questions against the manager's current index.
pub struct QueryPipeline {
    manager: Arc<IndexManager>,
    generator: Arc<dyn LlmClient>,
    answer_prompt: PromptDefinition,
    length: AnswerLengthController,
    options: PipelineOptions,
}

impl QueryPipeline {
    pub fn new(
        manager: Arc<IndexManager>,
        generator: Arc<dyn LlmClient>,
        prompts: PromptSet,
        options: PipelineOptions,
    ) -> Self {
        let length = AnswerLengthController::new(
            Arc::clone(&generator),
            prompts.summarize,
            options.model.clone(),
            options.temperature,
            options.generation_timeout,
        )
        .with_retries(options.summary_retries);

        Self {
            manager,
            generator,
            answer_prompt: prompts.answer,
            length,
            options,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Answer `question` from the top-k most similar chunks.
    ///
    /// Fails with `PipelineNotReady` unless the index is ready. The index
    /// snapshot taken here is used for the whole query.
    #[tracing::instrument(skip(self, question), fields(question_len = question.len()))]
    pub async fn answer(&self, question: &str) -> AppResult<Answer> {
        let index = self.manager.snapshot()?;

        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::InvalidRequest(
                "Question must not be empty".to_string(),
            ));
        }

        let embedder = self.manager.embedder();
        let query_embedding =
            embed_query(embedder.as_ref(), question, self.options.embedding_timeout).await?;

        let results = index.search(&query_embedding, self.options.search_k)?;
        tracing::info!(
            "Retrieved {} chunks (best score: {:.3})",
            results.len(),
            results.first().map(|(_, score)| *score).unwrap_or(0.0)
        );

        let chunks: Vec<Chunk> = results.into_iter().map(|(chunk, _)| chunk).collect();
        let context = build_context(&chunks);

        let raw = self.generate(question, &context).await?;
        let bounded = self
            .length
            .bound(raw.trim(), self.options.max_response_length)
            .await;

        let sources = if self.options.use_source_documents {
            map_chunks_to_sources(&chunks)
        } else {
            Vec::new()
        };

        Ok(Answer {
            answer: bounded.text,
            reduction: bounded.reduction,
            sources,
        })
    }

    /// Generate an answer by calling the generator with the answer prompt.
    async fn generate(&self, question: &str, context: &str) -> AppResult<String> {
        let mut variables = HashMap::new();
        variables.insert("context".to_string(), context.to_string());
        variables.insert("question".to_string(), question.to_string());
        let built = build_prompt(&self.answer_prompt, &variables)?;

        let mut request = LlmRequest::new(built.user, self.options.model.clone())
            .with_temperature(self.options.temperature);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        tracing::debug!(
            "Generating answer with {} (model: {})",
            self.generator.provider_name(),
            self.options.model
        );

        let timeout = self.options.generation_timeout;
        let response = tokio::time::timeout(timeout, self.generator.complete(&request))
            .await
            .map_err(|_| timed_out("Generation", timeout))??;

        Ok(response.content)
    }
}

/// Join retrieved chunk texts with blank lines.
pub fn build_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_context() {
        let chunk = |text: &str| Chunk {
            id: "d#0".to_string(),
            document: "d".to_string(),
            position: 0,
            start: 0,
            end: text.len(),
            text: text.to_string(),
        };

        let context = build_context(&[chunk("First."), chunk("Second.")]);
        assert_eq!(context, "First.\n\nSecond.");
        assert_eq!(build_context(&[]), "");
    }

    #[test]
    fn test_options_from_config() {
        let config = AppConfig::default();
        let options = PipelineOptions::from_config(&config);

        assert_eq!(options.model, "phi3:mini");
        assert_eq!(options.search_k, 3);
        assert_eq!(options.max_response_length, 700);
        assert_eq!(options.generation_timeout, Duration::from_secs(600));
        assert!(options.use_source_documents);
    }
}
