//! Add command handler.
//!
//! Writes a new document into the documents directory and reindexes.

use super::report_operation;
use clap::Args;
use ragent_core::{AppError, AppResult};
use ragent_knowledge::RagService;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

/// Add a document and reindex
#[derive(Args, Debug)]
pub struct AddCommand {
    /// Text file to copy into the documents directory (stdin when omitted)
    pub file: Option<PathBuf>,

    /// Document text given inline
    #[arg(long, conflicts_with = "file")]
    pub content: Option<String>,

    /// Document name (default: the file name, or document_<timestamp>.txt)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AddCommand {
    pub async fn execute(&self, service: &RagService) -> AppResult<ExitCode> {
        tracing::info!("Executing add command");

        let (content, default_name) = self.read_content()?;
        let name = self.name.clone().or(default_name);

        let response = service.add_document(&content, name.as_deref()).await;
        report_operation(&response, self.json)
    }

    /// Document text plus a name derived from its file, if any.
    fn read_content(&self) -> AppResult<(String, Option<String>)> {
        if let Some(content) = &self.content {
            return Ok((content.clone(), None));
        }

        if let Some(path) = &self.file {
            let content = std::fs::read_to_string(path).map_err(|e| {
                AppError::InvalidRequest(format!("Cannot read {:?} as text: {}", path, e))
            })?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());
            return Ok((content, name));
        }

        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        Ok((content, None))
    }
}
