//! Configuration management for the CodeLogic service.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config files (.codelogic/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! The category table and corpus root are static configuration: they are
//! loaded once at startup and never change while the process runs.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Default number of passages retrieved per question.
pub const DEFAULT_TOP_K: usize = 9;

/// Default bound on the combined retrieval + generation step.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .codelogic/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active LLM provider (e.g., "openai", "ollama")
    pub provider: String,

    /// Model identifier used for answer generation
    pub model: String,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub log_json: bool,

    /// HTTP server settings
    pub server: ServerConfig,

    /// Corpus layout and category table
    pub corpus: CorpusConfig,

    /// Retrieval tuning
    pub retrieval: RetrievalConfig,

    /// Vector index backend
    pub index: IndexConfig,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. "127.0.0.1:3000"
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// What an empty category selection means for retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmptySelectionPolicy {
    /// Filter to the empty set: no document can match.
    #[default]
    MatchNothing,

    /// Drop the filter and search the entire corpus.
    MatchAll,
}

/// Corpus layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Prefix prepended to every document identifier to form its source locator
    #[serde(default = "default_corpus_root")]
    pub root: String,

    /// Behavior when the caller selects no categories
    #[serde(rename = "emptySelection", default)]
    pub empty_selection: EmptySelectionPolicy,

    /// Category code -> document identifiers. `None` uses the built-in table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<BTreeMap<String, Vec<String>>>,
}

fn default_corpus_root() -> String {
    "docs/".to_string()
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            root: default_corpus_root(),
            empty_selection: EmptySelectionPolicy::default(),
            categories: None,
        }
    }
}

/// Retrieval tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of passages retrieved per question
    #[serde(rename = "topK", default = "default_top_k")]
    pub top_k: usize,

    /// Bound on retrieval + generation, in seconds
    #[serde(rename = "timeoutSecs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Keep only the most recent N turns of history (unset = keep all)
    #[serde(
        rename = "historyMaxTurns",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub history_max_turns: Option<usize>,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            history_max_turns: None,
        }
    }
}

/// Vector index backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum IndexConfig {
    /// Hosted Pinecone index queried over REST
    Pinecone {
        /// Index host, e.g. "https://codes-abc123.svc.us-east1-gcp.pinecone.io"
        host: String,
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        #[serde(default)]
        namespace: Option<String>,
        /// Metadata key holding the passage text
        #[serde(rename = "textKey", default = "default_text_key")]
        text_key: String,
    },

    /// Local LanceDB table
    LanceDb {
        path: PathBuf,
        #[serde(default = "default_table")]
        table: String,
    },
}

fn default_text_key() -> String {
    "text".to_string()
}

fn default_table() -> String {
    "chunks".to_string()
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig::LanceDb {
            path: PathBuf::from(".codelogic/index"),
            table: default_table(),
        }
    }
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(rename = "activeEmbeddingProvider")]
    pub active_embedding_provider: String,

    #[serde(rename = "embeddingDimensions", default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    pub providers: HashMap<String, ProviderConfig>,
}

fn default_embedding_dimensions() -> usize {
    768
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Completion model for this provider.
    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::OpenAI { model, .. } => model,
            ProviderConfig::Ollama { model, .. } => model,
        }
    }

    /// Embedding model for this provider, if configured.
    pub fn embedding_model(&self) -> Option<&str> {
        match self {
            ProviderConfig::OpenAI {
                embedding_model, ..
            } => embedding_model.as_deref(),
            ProviderConfig::Ollama {
                embedding_model, ..
            } => embedding_model.as_deref(),
        }
    }

    /// Custom endpoint, if configured.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ProviderConfig::OpenAI { endpoint, .. } => endpoint.as_deref(),
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint),
        }
    }
}

/// Resolved embedding settings for the active embedding provider.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingSettings {
    /// Provider name: "mock", "openai", "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Custom endpoint, if any
    pub endpoint: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: default_embedding_dimensions(),
            endpoint: None,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    server: Option<ServerConfig>,
    corpus: Option<CorpusConfig>,
    retrieval: Option<RetrievalConfig>,
    index: Option<IndexConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            log_json: false,
            server: ServerConfig::default(),
            corpus: CorpusConfig::default(),
            retrieval: RetrievalConfig::default(),
            index: IndexConfig::default(),
            llm: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML config file and environment variables.
    ///
    /// Environment variables:
    /// - `CODELOGIC_WORKSPACE`: Override workspace path
    /// - `CODELOGIC_CONFIG`: Path to config file
    /// - `CODELOGIC_PROVIDER`: LLM provider
    /// - `CODELOGIC_MODEL`: Model identifier
    /// - `CODELOGIC_API_KEY`: API key
    /// - `CODELOGIC_BIND`: Server bind address
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use codelogic_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Corpus root: {}", config.corpus.root);
    /// ```
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("CODELOGIC_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("CODELOGIC_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.codelogic_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("CODELOGIC_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("CODELOGIC_MODEL") {
            config.model = model;
        }

        if let Ok(bind) = std::env::var("CODELOGIC_BIND") {
            config.server.bind = bind;
        }

        config.api_key = std::env::var("CODELOGIC_API_KEY").ok();

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(server) = config_file.server {
            result.server = server;
        }

        if let Some(corpus) = config_file.corpus {
            result.corpus = corpus;
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        if let Some(index) = config_file.index {
            result.index = index;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.log_json = json;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            result.llm = Some(llm);
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .codelogic directory.
    pub fn codelogic_dir(&self) -> PathBuf {
        self.workspace.join(".codelogic")
    }

    /// Resolve a workspace-relative path.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Get a provider's configuration.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Resolve API key for a provider from `CODELOGIC_API_KEY` or the provider's key variable.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match self.get_provider_config(provider)? {
            ProviderConfig::OpenAI { api_key_env, .. } => std::env::var(api_key_env).ok(),
            ProviderConfig::Ollama { .. } => None,
        }
    }

    /// Embedding settings for the active embedding provider.
    pub fn embedding_settings(&self) -> EmbeddingSettings {
        let Some(llm) = self.llm.as_ref() else {
            return EmbeddingSettings::default();
        };

        let provider = llm.active_embedding_provider.clone();
        let provider_config = llm.providers.get(&provider);
        let model = provider_config
            .and_then(|pc| pc.embedding_model())
            .map(str::to_string)
            .unwrap_or_else(|| default_embedding_model(&provider).to_string());

        EmbeddingSettings {
            provider,
            model,
            dimensions: llm.embedding_dimensions,
            endpoint: provider_config
                .and_then(|pc| pc.endpoint())
                .map(str::to_string),
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["openai", "ollama"];

        if !known_providers.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                known_providers.join(", ")
            )));
        }

        if let Some(ProviderConfig::OpenAI { api_key_env, .. }) =
            self.get_provider_config(&self.provider)
        {
            if self.api_key.is_none() && std::env::var(api_key_env).is_err() {
                return Err(AppError::Config(format!(
                    "API key not found in environment variable: {}",
                    api_key_env
                )));
            }
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config(
                "retrieval.topK must be greater than zero".to_string(),
            ));
        }

        if self.retrieval.timeout_secs == 0 {
            return Err(AppError::Config(
                "retrieval.timeoutSecs must be greater than zero".to_string(),
            ));
        }

        if let Some(categories) = &self.corpus.categories {
            if let Some((code, _)) = categories.iter().find(|(code, _)| code.trim().is_empty()) {
                return Err(AppError::Config(format!(
                    "Category codes must not be blank (got {:?})",
                    code
                )));
            }
        }

        Ok(())
    }
}

fn default_embedding_model(provider: &str) -> &'static str {
    match provider {
        "openai" => "text-embedding-ada-002",
        "mock" => "trigram-v1",
        _ => "nomic-embed-text",
    }
}
