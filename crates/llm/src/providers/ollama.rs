//! Ollama generation provider.
//!
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use ragent_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Ollama endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
    options: OllamaOptions,
}

/// Sampling options; Ollama ignores them at the top level.
#[derive(Debug, Default, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama generation client.
pub struct OllamaClient {
    /// Base URL for Ollama API
    base_url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client with default settings.
    ///
    /// Default URL: http://localhost:11434
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a new Ollama client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            client: reqwest::Client::new(),
        }
    }

    /// Create a client whose HTTP requests give up after `timeout`.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: normalize_base_url(base_url.into()),
            client,
        })
    }

    /// Base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert LlmRequest to Ollama format.
    fn to_ollama_request(&self, request: &LlmRequest) -> OllamaRequest {
        OllamaRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            system: request.system.clone(),
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }

    /// Convert Ollama response to LlmResponse.
    fn convert_response(&self, response: OllamaResponse) -> LlmResponse {
        let usage = LlmUsage::new(
            response.prompt_eval_count.unwrap_or(0),
            response.eval_count.unwrap_or(0),
        );

        LlmResponse {
            content: response.response,
            model: response.model,
            usage,
        }
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    #[tracing::instrument(skip(self, request), fields(model = %request.model, prompt_chars = request.prompt.chars().count()))]
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!("Sending generation request to Ollama");

        let ollama_request = self.to_ollama_request(request);
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| transport_error(&e, &self.base_url))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error(status, &error_text, &request.model));
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to parse Ollama response: {}", e)))?;

        tracing::debug!(
            "Received {} chars from Ollama",
            ollama_response.response.chars().count()
        );

        Ok(self.convert_response(ollama_response))
    }
}

/// Guidance attached to every provider-unavailable report.
pub const UNAVAILABLE_HINT: &str =
    "Is Ollama running? Start it with `ollama serve` or point OLLAMA_BASE_URL at a running server";

/// Classify a failed HTTP exchange with Ollama.
///
/// Connection failures and timeouts mean the service is unavailable; anything
/// else is a provider error.
pub fn transport_error(err: &reqwest::Error, base_url: &str) -> AppError {
    if err.is_connect() || err.is_timeout() {
        AppError::ProviderUnavailable(format!(
            "Cannot reach Ollama at {}: {}. {}",
            base_url, err, UNAVAILABLE_HINT
        ))
    } else {
        AppError::Provider(format!("Request to Ollama failed: {}", err))
    }
}

/// Classify a non-success HTTP status from Ollama.
pub fn status_error(status: reqwest::StatusCode, body: &str, model: &str) -> AppError {
    if status == reqwest::StatusCode::NOT_FOUND {
        AppError::Provider(format!(
            "Model '{}' is not available on the Ollama server. Run `ollama pull {}`",
            model, model
        ))
    } else if status == reqwest::StatusCode::SERVICE_UNAVAILABLE
        || status == reqwest::StatusCode::BAD_GATEWAY
    {
        AppError::ProviderUnavailable(format!(
            "Ollama API unavailable ({}): {}. {}",
            status, body, UNAVAILABLE_HINT
        ))
    } else {
        AppError::Provider(format!("Ollama API error ({}): {}", status, body))
    }
}

fn normalize_base_url(base_url: String) -> String {
    base_url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragent_core::ErrorKind;

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::new();
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = OllamaClient::with_base_url("http://gpu-box:11434/");
        assert_eq!(client.base_url(), "http://gpu-box:11434");
    }

    #[test]
    fn test_ollama_request_conversion() {
        let client = OllamaClient::new();
        let request = LlmRequest::new("Hello", "phi3:mini")
            .with_temperature(0.3)
            .with_max_tokens(100);

        let ollama_req = client.to_ollama_request(&request);
        assert_eq!(ollama_req.model, "phi3:mini");
        assert_eq!(ollama_req.prompt, "Hello");
        assert!(!ollama_req.stream);

        let json = serde_json::to_value(&ollama_req).unwrap();
        assert_eq!(json["stream"], false);
        assert!(json.get("temperature").is_none());
        assert_eq!(json["options"]["num_predict"], 100);
        let temperature = json["options"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_status_classification() {
        let not_found = status_error(reqwest::StatusCode::NOT_FOUND, "", "phi3:mini");
        assert_eq!(not_found.kind(), ErrorKind::ProviderError);
        assert!(not_found.to_string().contains("ollama pull phi3:mini"));

        let busy = status_error(reqwest::StatusCode::SERVICE_UNAVAILABLE, "loading", "m");
        assert_eq!(busy.kind(), ErrorKind::ProviderUnavailable);

        let bad = status_error(reqwest::StatusCode::BAD_REQUEST, "bad", "m");
        assert_eq!(bad.kind(), ErrorKind::ProviderError);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        // Port 9 (discard) is closed on test machines.
        let client =
            OllamaClient::with_timeout("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = client
            .complete(&LlmRequest::new("hi", "phi3:mini"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
        assert!(err.to_string().contains("ollama serve"));
    }
}
