//! ragent CLI
//!
//! Main entry point for the ragent command-line tool.
//! Answers questions from a local documents directory with Ollama.

mod commands;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use commands::{AddCommand, AskCommand, RebuildCommand, StatusCommand};
use ragent_core::config::{AppConfig, ConfigOverrides};
use ragent_core::logging::{self, LogFormat};
use ragent_knowledge::RagService;
use std::path::PathBuf;
use std::process::ExitCode;

/// ragent - question answering over local documents
#[derive(Parser, Debug)]
#[command(name = "ragent")]
#[command(about = "Question answering over local documents with Ollama", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "RAGENT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "RAGENT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Ollama endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Generation model
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Embedding model
    #[arg(long, global = true)]
    embedding_model: Option<String>,

    /// Documents directory
    #[arg(short, long, global = true)]
    documents: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question about the documents
    Ask(AskCommand),

    /// Add a document and reindex
    Add(AddCommand),

    /// Rebuild the index from the documents directory
    Rebuild(RebuildCommand),

    /// Show index status
    Status(StatusCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let log_format = match cli.log_format.as_deref() {
        Some(name) => match LogFormat::parse(name) {
            Some(format) => Some(format),
            None => bail!("Unknown log format '{}'. Use text or json", name),
        },
        None => None,
    };

    let config = AppConfig::load_from(cli.workspace.clone(), cli.config.clone())
        .context("Failed to load configuration")?
        .with_overrides(ConfigOverrides {
            endpoint: cli.endpoint.clone(),
            llm_model: cli.model.clone(),
            embedding_model: cli.embedding_model.clone(),
            documents_dir: cli.documents.clone(),
            log_level: cli.log_level.clone(),
            log_format,
            verbose: cli.verbose,
            no_color: cli.no_color,
        });

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_format)?;

    tracing::info!("ragent starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Endpoint: {}", config.endpoint);
    tracing::debug!(
        "Models: generation {}, embedding {} ({})",
        config.llm_model,
        config.embedding_model,
        config.embedding_provider
    );

    config.validate().context("Invalid configuration")?;
    config.ensure_ragent_dir()?;

    let service = RagService::from_config(config).context("Failed to start ragent")?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Add(_) => "add",
        Commands::Rebuild(_) => "rebuild",
        Commands::Status(_) => "status",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&service).await,
        Commands::Add(cmd) => cmd.execute(&service).await,
        Commands::Rebuild(cmd) => cmd.execute(&service).await,
        Commands::Status(cmd) => cmd.execute(&service).await,
    };

    match &result {
        Ok(code) if *code == ExitCode::SUCCESS => tracing::info!("Command completed successfully"),
        Ok(_) => tracing::info!("Command reported a failure"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    Ok(result?)
}
