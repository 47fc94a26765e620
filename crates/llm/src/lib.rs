//! Text generation integration for ragent.
//!
//! This crate provides a provider-agnostic abstraction over the generation
//! service the answer pipeline calls. Ollama is the only provider.
//!
//! # Example
//! ```no_run
//! use ragent_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "phi3:mini").with_temperature(0.3);
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::{create_client, create_client_from_config};
pub use providers::OllamaClient;
