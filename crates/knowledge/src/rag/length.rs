//! Answer length enforcement.
//!
//! An answer over the limit is first handed back to the generator for a
//! summary. When that fails, or the summary comes back empty, the answer is
//! cut deterministically. Lengths are counted in characters.

use crate::embeddings::timed_out;
use crate::rag::types::{BoundedAnswer, LengthReduction};
use ragent_core::{AppError, AppResult};
use ragent_llm::{LlmClient, LlmRequest};
use ragent_prompt::{build_prompt, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const ELLIPSIS: &str = "...";

/// Keeps answers within a maximum length.
pub struct AnswerLengthController {
    generator: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    model: String,
    temperature: f32,
    timeout: Duration,
    retries: u32,
}

impl AnswerLengthController {
    pub fn new(
        generator: Arc<dyn LlmClient>,
        prompt: PromptDefinition,
        model: impl Into<String>,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        Self {
            generator,
            prompt,
            model: model.into(),
            temperature,
            timeout,
            retries: 0,
        }
    }

    /// Re-attempt summarization this many times while the provider is unavailable.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Fit `text` into `max_length` characters. Never fails.
    pub async fn bound(&self, text: &str, max_length: usize) -> BoundedAnswer {
        if text.is_empty() {
            return BoundedAnswer::new("", LengthReduction::Full);
        }
        if max_length == 0 {
            return BoundedAnswer::new("", LengthReduction::Truncated);
        }

        let length = text.chars().count();
        if length <= max_length {
            return BoundedAnswer::new(text, LengthReduction::Full);
        }

        tracing::info!(
            "Answer is {} chars, limit is {}; summarizing",
            length,
            max_length
        );

        match self.summarize(text, max_length).await {
            Ok(summary) if summary.is_empty() => {
                tracing::warn!("Summary was empty; truncating answer");
                BoundedAnswer::new(truncate(text, max_length), LengthReduction::Truncated)
            }
            Ok(summary) => {
                if summary.chars().count() > max_length {
                    tracing::warn!("Summary still exceeds {} chars; truncating it", max_length);
                    BoundedAnswer::new(truncate(&summary, max_length), LengthReduction::Summarized)
                } else {
                    BoundedAnswer::new(summary, LengthReduction::Summarized)
                }
            }
            Err(e) => {
                tracing::warn!("Summarization failed ({}); truncating answer", e);
                BoundedAnswer::new(truncate(text, max_length), LengthReduction::Truncated)
            }
        }
    }

    async fn summarize(&self, text: &str, max_length: usize) -> AppResult<String> {
        let mut variables = HashMap::new();
        variables.insert("answer".to_string(), text.to_string());
        variables.insert("max_length".to_string(), max_length.to_string());
        let built = build_prompt(&self.prompt, &variables)?;

        let mut request =
            LlmRequest::new(built.user, self.model.clone()).with_temperature(self.temperature);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let mut attempt = 0;
        loop {
            let result = tokio::time::timeout(self.timeout, self.generator.complete(&request))
                .await
                .map_err(|_| timed_out("Summarization", self.timeout))
                .and_then(|r| r);

            match result {
                Ok(response) => return Ok(response.content.trim().to_string()),
                Err(AppError::ProviderUnavailable(msg)) if attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(
                        "Summarization unavailable (retry {}/{}): {}",
                        attempt,
                        self.retries,
                        msg
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Cut `text` to at most `max_length` characters.
///
/// Keeps the first `max_length - 3` characters, trims trailing whitespace and
/// appends "...". For `max_length <= 3` the text is cut without a marker.
pub fn truncate(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    if max_length <= ELLIPSIS.len() {
        return text.chars().take(max_length).collect();
    }

    let kept: String = text.chars().take(max_length - ELLIPSIS.len()).collect();
    format!("{}{}", kept.trim_end(), ELLIPSIS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragent_llm::LlmResponse;
    use ragent_prompt::templates::summarize_prompt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed summary and counts calls.
    struct FixedSummary {
        summary: String,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl LlmClient for FixedSummary {
        fn provider_name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(request.prompt.contains("at most"));
            Ok(LlmResponse::text(self.summary.clone(), request.model.clone()))
        }
    }

    /// Always unreachable; counts calls.
    struct Unreachable {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl LlmClient for Unreachable {
        fn provider_name(&self) -> &str {
            "unreachable"
        }

        async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::ProviderUnavailable("connection refused".to_string()))
        }
    }

    fn controller(generator: Arc<dyn LlmClient>) -> AnswerLengthController {
        AnswerLengthController::new(
            generator,
            summarize_prompt(),
            "phi3:mini",
            0.3,
            Duration::from_secs(5),
        )
    }

    fn fixed(summary: &str) -> Arc<FixedSummary> {
        Arc::new(FixedSummary {
            summary: summary.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("hello world, again", 10), "hello w...");
        assert_eq!(truncate("hello    world", 9), "hello...");
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("abcdef", 0), "");
        assert_eq!(truncate("日本語のテキストです", 6), "日本語...");
    }

    #[tokio::test]
    async fn test_short_answer_unchanged() {
        let generator = fixed("unused");
        let bounded = controller(generator.clone()).bound("Brief.", 100).await;

        assert_eq!(bounded, BoundedAnswer::new("Brief.", LengthReduction::Full));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_limit_and_empty_text() {
        let controller = controller(fixed("unused"));
        assert_eq!(controller.bound("Something", 0).await.text, "");
        assert_eq!(controller.bound("", 50).await.text, "");
    }

    #[tokio::test]
    async fn test_long_answer_summarized() {
        let generator = fixed("  A short summary.  ");
        let text = "x".repeat(200);
        let bounded = controller(generator.clone()).bound(&text, 50).await;

        assert_eq!(bounded.text, "A short summary.");
        assert_eq!(bounded.reduction, LengthReduction::Summarized);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_long_summary_truncated() {
        let summary = "y".repeat(80);
        let text = "x".repeat(200);
        let bounded = controller(fixed(&summary)).bound(&text, 50).await;

        assert_eq!(bounded.text.chars().count(), 50);
        assert!(bounded.text.starts_with('y'));
        assert!(bounded.text.ends_with("..."));
        assert_eq!(bounded.reduction, LengthReduction::Summarized);
    }

    #[tokio::test]
    async fn test_empty_summary_falls_back_to_truncation() {
        let text = "word ".repeat(40);
        let bounded = controller(fixed("   ")).bound(&text, 20).await;

        assert_eq!(bounded.reduction, LengthReduction::Truncated);
        assert!(bounded.text.chars().count() <= 20);
        assert!(bounded.text.starts_with("word"));
    }

    #[tokio::test]
    async fn test_failing_summary_falls_back_to_truncation() {
        let generator = Arc::new(Unreachable {
            calls: AtomicUsize::new(0),
        });
        let text = "z".repeat(100);
        let bounded = controller(generator.clone()).bound(&text, 10).await;

        assert_eq!(bounded.text, "zzzzzzz...");
        assert_eq!(bounded.reduction, LengthReduction::Truncated);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_summary_retries_are_bounded() {
        let generator = Arc::new(Unreachable {
            calls: AtomicUsize::new(0),
        });
        let controller = controller(generator.clone()).with_retries(2);
        let bounded = controller.bound(&"z".repeat(100), 10).await;

        assert_eq!(bounded.reduction, LengthReduction::Truncated);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_bound_is_idempotent() {
        let controller = controller(fixed(&"s".repeat(90)));
        let text = "long answer ".repeat(30);

        for max in [0, 2, 3, 4, 25, 80, 1000] {
            let once = controller.bound(&text, max).await;
            assert!(once.text.chars().count() <= max);

            let twice = controller.bound(&once.text, max).await;
            assert_eq!(twice.text, once.text);
        }
    }
}
