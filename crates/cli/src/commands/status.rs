//! Status command handler.
//!
//! Loads (or builds) the index and reports what it holds.

use super::print_json;
use clap::Args;
use ragent_core::AppResult;
use ragent_knowledge::{IndexPhase, RagService};
use std::process::ExitCode;

/// Show index status
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusCommand {
    pub async fn execute(&self, service: &RagService) -> AppResult<ExitCode> {
        tracing::info!("Executing status command");

        // A failed load is part of the report
        if let Err(e) = service.initialize().await {
            tracing::warn!("Index unavailable: {}", e);
        }

        let status = service.status().await;

        if self.json {
            print_json(&status)?;
        } else {
            println!("Index: {}", status.phase);
            println!(
                "  Embedding: {} ({})",
                status.embedding_model, status.embedding_provider
            );
            println!("  Generation: {}", status.generation_model);
            println!("  Documents dir: {}", status.documents_dir.display());
            println!("  Index file: {}", status.index_file.display());
            if let (Some(chunks), Some(documents)) = (status.chunk_count, status.document_count) {
                println!("  Chunks: {} from {} documents", chunks, documents);
            }
            if let Some(built_at) = status.built_at {
                println!("  Built: {}", built_at.to_rfc3339());
            }
            if let Some(stale) = status.stale {
                println!("  Up to date: {}", if stale { "no (run 'ragent rebuild')" } else { "yes" });
            }
            if let Some(failure) = &status.failure {
                println!("  Failure ({}): {}", failure.kind, failure.message);
            }
        }

        Ok(if status.phase == IndexPhase::Ready {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }
}
