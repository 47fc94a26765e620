//! Ask command handler.
//!
//! Answers a question from the indexed documents.

use super::{print_json, report_error};
use clap::Args;
use ragent_core::AppResult;
use ragent_knowledge::{ErrorResponse, LengthReduction, QueryResponse, RagService};
use std::process::ExitCode;

/// Ask a question about the documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, service: &RagService) -> AppResult<ExitCode> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        if let Err(e) = service.initialize().await {
            return report_error(&ErrorResponse::from(&e), self.json);
        }

        let answer = match service.submit_query(&self.question).await {
            QueryResponse::Answer(answer) => answer,
            QueryResponse::Error(error) => return report_error(&error, self.json),
        };

        if self.json {
            print_json(&answer)?;
            return Ok(ExitCode::SUCCESS);
        }

        println!("{}", answer.answer);
        if answer.reduction != LengthReduction::Full {
            println!("({} to fit the length limit)", answer.reduction.as_str());
        }

        if !answer.sources.is_empty() {
            println!();
            println!("Sources:");
            for source_ref in &answer.sources {
                println!("- {} ({})", source_ref.source, source_ref.location);
            }
        }

        Ok(ExitCode::SUCCESS)
    }
}
