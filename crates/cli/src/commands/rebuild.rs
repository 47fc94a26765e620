//! Rebuild command handler.

use super::report_operation;
use clap::Args;
use ragent_core::AppResult;
use ragent_knowledge::RagService;
use std::process::ExitCode;

/// Rebuild the index from the documents directory
#[derive(Args, Debug)]
pub struct RebuildCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RebuildCommand {
    pub async fn execute(&self, service: &RagService) -> AppResult<ExitCode> {
        tracing::info!("Executing rebuild command");

        let response = service.rebuild_index().await;
        report_operation(&response, self.json)
    }
}
