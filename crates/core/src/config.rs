//! Configuration management for ragent.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config file (.ragent/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric: relative document and index
//! directories resolve against the workspace root.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Default Ollama endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Embedding providers the knowledge crate can construct.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["ollama", "mock"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .ragent/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Base URL of the model server
    pub endpoint: String,

    /// Model used for answer generation and summarization
    pub llm_model: String,

    /// Embedding provider ("ollama" or "mock")
    pub embedding_provider: String,

    /// Embedding model; its name is the index identity
    pub embedding_model: String,

    /// Expected embedding dimensions, checked when set
    pub embedding_dimensions: Option<usize>,

    /// Directory holding source documents
    pub documents_dir: PathBuf,

    /// Directory holding persisted indexes
    pub index_dir: PathBuf,

    /// Maximum chunk length in characters
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per question
    pub search_k: usize,

    /// Maximum answer length in characters (0 yields empty answers)
    pub max_response_length: usize,

    /// Sampling temperature for generation
    pub temperature: f32,

    /// Timeout for one generation call, in seconds
    pub generation_timeout_secs: u64,

    /// Timeout for one embedding call, in seconds
    pub embedding_timeout_secs: u64,

    /// Attach source references to answers
    pub use_source_documents: bool,

    /// Write a sample document when the documents directory is empty
    pub seed_sample_document: bool,

    /// Extra summarization attempts after a provider outage
    pub summary_retries: u32,

    /// Rebuild a loaded index whose documents changed on disk
    pub rebuild_when_stale: bool,

    /// Log level override
    pub log_level: Option<String>,

    /// Log output format
    pub log_format: LogFormat,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    ollama: Option<OllamaSection>,
    documents: Option<DocumentsSection>,
    index: Option<IndexSection>,
    retrieval: Option<RetrievalSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OllamaSection {
    endpoint: Option<String>,
    model: Option<String>,
    embedding_model: Option<String>,
    temperature: Option<f32>,
    timeout: Option<u64>,
    embedding_timeout: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentsSection {
    path: Option<PathBuf>,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    seed_sample: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexSection {
    path: Option<PathBuf>,
    embedding_provider: Option<String>,
    dimensions: Option<usize>,
    rebuild_when_stale: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrievalSection {
    search_k: Option<usize>,
    max_response_length: Option<usize>,
    use_source_documents: Option<bool>,
    summary_retries: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    format: Option<String>,
    color: Option<bool>,
}

/// Command-line overrides, applied last.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub endpoint: Option<String>,
    pub llm_model: Option<String>,
    pub embedding_model: Option<String>,
    pub documents_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub verbose: bool,
    pub no_color: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            llm_model: "phi3:mini".to_string(),
            embedding_provider: "ollama".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            embedding_dimensions: None,
            documents_dir: PathBuf::from("documents"),
            index_dir: PathBuf::from(".ragent/indexes"),
            chunk_size: 500,
            chunk_overlap: 100,
            search_k: 3,
            max_response_length: 700,
            temperature: 0.3,
            generation_timeout_secs: 600,
            embedding_timeout_secs: 60,
            use_source_documents: true,
            seed_sample_document: true,
            summary_retries: 0,
            rebuild_when_stale: false,
            log_level: None,
            log_format: LogFormat::Text,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and environment variables.
    ///
    /// Environment variables:
    /// - `RAGENT_WORKSPACE`: Override workspace path
    /// - `RAGENT_CONFIG`: Path to config file
    /// - `OLLAMA_BASE_URL`: Model server endpoint
    /// - `RAGENT_LLM_MODEL`: Generation model
    /// - `RAGENT_EMBEDDING_MODEL`: Embedding model
    /// - `RAGENT_DOCUMENTS_DIR`: Documents directory
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use ragent_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Documents: {:?}", config.documents_path());
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Load configuration with an explicit workspace and config file.
    ///
    /// Explicit arguments win over `RAGENT_WORKSPACE` and `RAGENT_CONFIG`.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("RAGENT_WORKSPACE")) {
            config.workspace = workspace;
        }
        config.config_file = config_file.or_else(|| env_path("RAGENT_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.ragent_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(endpoint) = std::env::var("OLLAMA_BASE_URL") {
            config.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("RAGENT_LLM_MODEL") {
            config.llm_model = model;
        }
        if let Ok(model) = std::env::var("RAGENT_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Some(dir) = env_path("RAGENT_DOCUMENTS_DIR") {
            config.documents_dir = dir;
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }
        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(ollama) = file.ollama {
            set(&mut result.endpoint, ollama.endpoint);
            set(&mut result.llm_model, ollama.model);
            set(&mut result.embedding_model, ollama.embedding_model);
            set(&mut result.temperature, ollama.temperature);
            set(&mut result.generation_timeout_secs, ollama.timeout);
            set(&mut result.embedding_timeout_secs, ollama.embedding_timeout);
        }

        if let Some(documents) = file.documents {
            set(&mut result.documents_dir, documents.path);
            set(&mut result.chunk_size, documents.chunk_size);
            set(&mut result.chunk_overlap, documents.chunk_overlap);
            set(&mut result.seed_sample_document, documents.seed_sample);
        }

        if let Some(index) = file.index {
            set(&mut result.index_dir, index.path);
            set(&mut result.embedding_provider, index.embedding_provider);
            if index.dimensions.is_some() {
                result.embedding_dimensions = index.dimensions;
            }
            set(&mut result.rebuild_when_stale, index.rebuild_when_stale);
        }

        if let Some(retrieval) = file.retrieval {
            set(&mut result.search_k, retrieval.search_k);
            set(&mut result.max_response_length, retrieval.max_response_length);
            set(&mut result.use_source_documents, retrieval.use_source_documents);
            set(&mut result.summary_retries, retrieval.summary_retries);
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(format) = logging.format {
                result.log_format = LogFormat::parse(&format).ok_or_else(|| {
                    AppError::Config(format!("Unknown log format: {}. Use text or json", format))
                })?;
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over the file and environment.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(endpoint) = overrides.endpoint {
            self.endpoint = endpoint;
        }
        if let Some(model) = overrides.llm_model {
            self.llm_model = model;
        }
        if let Some(model) = overrides.embedding_model {
            self.embedding_model = model;
        }
        if let Some(dir) = overrides.documents_dir {
            self.documents_dir = dir;
        }
        if let Some(level) = overrides.log_level {
            self.log_level = Some(level);
        }
        if let Some(format) = overrides.log_format {
            self.log_format = format;
        }

        if overrides.verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if overrides.no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .ragent directory.
    pub fn ragent_dir(&self) -> PathBuf {
        self.workspace.join(".ragent")
    }

    /// Ensure the .ragent directory exists.
    pub fn ensure_ragent_dir(&self) -> AppResult<()> {
        let dir = self.ragent_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .ragent directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Directory containing prompt overrides.
    pub fn prompts_dir(&self) -> PathBuf {
        self.ragent_dir().join("prompts")
    }

    /// Resolved documents directory.
    pub fn documents_path(&self) -> PathBuf {
        self.resolve(&self.documents_dir)
    }

    /// Resolved directory for persisted indexes.
    pub fn index_path(&self) -> PathBuf {
        self.resolve(&self.index_dir)
    }

    /// Timeout for one generation call.
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    /// Timeout for one embedding call.
    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding_timeout_secs)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Validate configuration. Any failure here is fatal at startup.
    pub fn validate(&self) -> AppResult<()> {
        if self.chunk_size == 0 {
            return Err(AppError::Config(
                "chunkSize must be a positive integer".to_string(),
            ));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::Config(format!(
                "chunkOverlap ({}) must be smaller than chunkSize ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        if self.search_k == 0 {
            return Err(AppError::Config(
                "searchK must be a positive integer".to_string(),
            ));
        }

        if !KNOWN_EMBEDDING_PROVIDERS.contains(&self.embedding_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding_provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.llm_model.trim().is_empty() || self.embedding_model.trim().is_empty() {
            return Err(AppError::Config(
                "Generation and embedding model names are required".to_string(),
            ));
        }

        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "Endpoint must be an http(s) URL, got: {}",
                self.endpoint
            )));
        }

        if self.generation_timeout_secs == 0 || self.embedding_timeout_secs == 0 {
            return Err(AppError::Config(
                "Provider timeouts must be at least one second".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AppError::Config(format!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }

        if self.embedding_dimensions == Some(0) {
            return Err(AppError::Config(
                "Embedding dimensions must be positive when set".to_string(),
            ));
        }

        Ok(())
    }
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key).ok().map(PathBuf::from)
}
