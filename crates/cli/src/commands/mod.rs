//! Command handlers for the ragent CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod add;
pub mod ask;
pub mod rebuild;
pub mod status;

// Re-export command types for convenience
pub use add::AddCommand;
pub use ask::AskCommand;
pub use rebuild::RebuildCommand;
pub use status::StatusCommand;

use ragent_core::AppResult;
use ragent_knowledge::{ErrorResponse, OperationResponse};
use serde::Serialize;
use std::process::ExitCode;

/// Print `value` as pretty JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a failure, as JSON on stdout or as text on stderr.
fn report_error(error: &ErrorResponse, json: bool) -> AppResult<ExitCode> {
    if json {
        print_json(error)?;
    } else {
        eprintln!("Error ({}): {}", error.kind, error.error);
    }
    Ok(ExitCode::FAILURE)
}

/// Print the outcome of a mutation or rebuild.
fn report_operation(response: &OperationResponse, json: bool) -> AppResult<ExitCode> {
    match response {
        OperationResponse::Success {
            message,
            chunk_count,
        } => {
            if json {
                print_json(response)?;
            } else {
                println!("{} ({} chunks indexed)", message, chunk_count);
            }
            Ok(ExitCode::SUCCESS)
        }
        OperationResponse::Failure(error) => report_error(error, json),
    }
}
