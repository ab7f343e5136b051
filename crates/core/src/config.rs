//! Configuration management for the flashcards pipeline.
//!
//! This module handles loading and merging configuration from multiple sources,
//! lowest precedence first:
//! - Built-in defaults
//! - `.env` file (loaded into the process environment)
//! - Config file (`.flashcards/config.yaml` in the workspace)
//! - Environment variables
//! - Command-line flags
//!
//! Relative document and index paths are resolved against the workspace.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Language-model providers the pipeline can talk to.
pub const KNOWN_LLM_PROVIDERS: [&str; 2] = ["gemini", "ollama"];

/// Embedding providers the pipeline can talk to.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 3] = ["gemini", "ollama", "mock"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .flashcards/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Log line format
    pub log_format: LogFormat,

    /// Language-model settings
    pub llm: LlmSettings,

    /// Embedding service settings
    pub embedding: EmbeddingSettings,

    /// Ingestion and retrieval settings
    pub knowledge: KnowledgeSettings,

    /// Generation pipeline settings
    pub generation: GenerationSettings,
}

/// Language-model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmSettings {
    /// Provider name ("gemini", "ollama")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Custom endpoint (provider default when absent)
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,

    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.0-flash".to_string(),
            endpoint: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
            temperature: None,
            max_tokens: None,
            timeout_secs: 60,
        }
    }
}

/// Embedding service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingSettings {
    /// Provider name ("gemini", "ollama", "mock")
    pub provider: String,

    /// Embedding model identifier
    pub model: String,

    /// Output dimensionality of the model
    pub dimensions: usize,

    /// Custom endpoint (provider default when absent)
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "models/embedding-001".to_string(),
            dimensions: 768,
            endpoint: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
        }
    }
}

/// Ingestion and retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KnowledgeSettings {
    /// Directory scanned for source documents
    pub documents_dir: PathBuf,

    /// Directory holding the persisted similarity index
    pub index_dir: PathBuf,

    /// Maximum chunk length in characters
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    pub chunk_overlap: usize,

    /// Chunks embedded per request
    pub batch_size: usize,

    /// Pause between batches in milliseconds
    pub batch_delay_ms: u64,

    /// Retries for a batch rejected with an explicit rate-limit signal
    pub rate_limit_retries: u32,

    /// Minimum cosine similarity for a chunk to be returned
    pub score_threshold: f32,

    /// Maximum number of chunks returned per query
    pub top_k: usize,
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        Self {
            documents_dir: PathBuf::from("documents"),
            index_dir: PathBuf::from("flashcard_index"),
            chunk_size: 1000,
            chunk_overlap: 100,
            batch_size: 100,
            batch_delay_ms: 1000,
            rate_limit_retries: 3,
            score_threshold: 0.7,
            top_k: 4,
        }
    }
}

/// Generation pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationSettings {
    /// Prompt definition used for flashcard requests
    pub prompt_id: String,

    /// Return an empty result instead of calling the model when retrieval finds nothing
    pub skip_on_empty_context: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            prompt_id: "flashcards.default".to_string(),
            skip_on_empty_context: true,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSettings>,
    embedding: Option<EmbeddingSettings>,
    knowledge: Option<KnowledgeSettings>,
    generation: Option<GenerationSettings>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<LogFormat>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            log_format: LogFormat::default(),
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            knowledge: KnowledgeSettings::default(),
            generation: GenerationSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment, `.env` and the workspace config file.
    ///
    /// Environment variables:
    /// - `FLASHCARDS_WORKSPACE`: Override workspace path
    /// - `FLASHCARDS_CONFIG`: Path to config file
    /// - `FLASHCARDS_PROVIDER`: Language-model provider
    /// - `FLASHCARDS_MODEL`: Language-model identifier
    /// - `FLASHCARDS_EMBEDDING_PROVIDER`: Embedding provider
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    /// - `FLASHCARDS_LOG_FORMAT`: `text` or `json`
    ///
    /// # Example
    /// ```no_run
    /// use flashcards_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Index: {:?}", config.index_dir());
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Load configuration, letting explicit paths win over the environment.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        // Missing .env is fine; credentials may come from the real environment
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {:?}", path);
        }

        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("FLASHCARDS_WORKSPACE")) {
            config.workspace = workspace;
        }

        config.config_file = config_file.or_else(|| env_path("FLASHCARDS_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.flashcards_dir().join("config.yaml"),
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
        if let Ok(provider) = std::env::var("FLASHCARDS_PROVIDER") {
            config.llm.provider = provider;
        }

        if let Ok(model) = std::env::var("FLASHCARDS_MODEL") {
            config.llm.model = model;
        }

        if let Ok(provider) = std::env::var("FLASHCARDS_EMBEDDING_PROVIDER") {
            config.embedding.provider = provider;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        if let Ok(format) = std::env::var("FLASHCARDS_LOG_FORMAT") {
            config.log_format = format.parse()?;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_format = format;
            }
        }

        if let Some(llm) = config_file.llm {
            result.llm = llm;
        }
        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }
        if let Some(knowledge) = config_file.knowledge {
            result.knowledge = knowledge;
        }
        if let Some(generation) = config_file.generation {
            result.generation = generation;
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(provider) = provider {
            self.llm.provider = provider;
        }

        if let Some(model) = model {
            self.llm.model = model;
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

    /// Get the path to the .flashcards directory.
    pub fn flashcards_dir(&self) -> PathBuf {
        self.workspace.join(".flashcards")
    }

    /// Directory scanned for source documents.
    pub fn documents_dir(&self) -> PathBuf {
        self.resolve(&self.knowledge.documents_dir)
    }

    /// Directory holding the persisted similarity index.
    pub fn index_dir(&self) -> PathBuf {
        self.resolve(&self.knowledge.index_dir)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Resolve the language-model API key from its environment variable.
    pub fn llm_api_key(&self) -> Option<String> {
        non_empty_env(&self.llm.api_key_env)
    }

    /// Resolve the embedding API key from its environment variable.
    pub fn embedding_api_key(&self) -> Option<String> {
        non_empty_env(&self.embedding.api_key_env)
    }

    /// Validate configuration before any external service is contacted.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_LLM_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.llm.provider,
                KNOWN_LLM_PROVIDERS.join(", ")
            )));
        }

        if !KNOWN_EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.llm.provider == "gemini" && self.llm_api_key().is_none() {
            return Err(AppError::Config(format!(
                "API key not found in environment variable: {}",
                self.llm.api_key_env
            )));
        }

        if self.embedding.provider == "gemini" && self.embedding_api_key().is_none() {
            return Err(AppError::Config(format!(
                "API key not found in environment variable: {}",
                self.embedding.api_key_env
            )));
        }

        self.validate_knowledge()
    }

    /// Validate only the ingestion/retrieval numbers.
    pub fn validate_knowledge(&self) -> AppResult<()> {
        let k = &self.knowledge;

        if k.chunk_size == 0 {
            return Err(AppError::Config("chunkSize must be positive".to_string()));
        }

        if k.chunk_overlap >= k.chunk_size {
            return Err(AppError::Config(format!(
                "chunkOverlap ({}) must be smaller than chunkSize ({})",
                k.chunk_overlap, k.chunk_size
            )));
        }

        if k.batch_size == 0 {
            return Err(AppError::Config("batchSize must be positive".to_string()));
        }

        if k.top_k == 0 {
            return Err(AppError::Config("topK must be positive".to_string()));
        }

        if !(-1.0..=1.0).contains(&k.score_threshold) {
            return Err(AppError::Config(format!(
                "scoreThreshold must be within [-1, 1], got {}",
                k.score_threshold
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding dimensions must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name).ok().map(PathBuf::from)
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn offline_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.llm.provider = "ollama".to_string();
        config.embedding.provider = "mock".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.llm.model, "gemini-2.0-flash");
        assert_eq!(config.embedding.model, "models/embedding-001");
        assert_eq!(config.knowledge.chunk_size, 1000);
        assert_eq!(config.knowledge.chunk_overlap, 100);
        assert_eq!(config.knowledge.batch_size, 100);
        assert_eq!(config.knowledge.score_threshold, 0.7);
        assert!(config.generation.skip_on_empty_context);
        assert!(!config.verbose);
    }

    #[test]
    fn test_relative_paths_resolve_against_workspace() {
        let mut config = AppConfig::default();
        config.workspace = PathBuf::from("/srv/biology");
        assert_eq!(config.index_dir(), PathBuf::from("/srv/biology/flashcard_index"));
        assert_eq!(config.documents_dir(), PathBuf::from("/srv/biology/documents"));

        config.knowledge.index_dir = PathBuf::from("/var/index");
        assert_eq!(config.index_dir(), PathBuf::from("/var/index"));
    }

    #[test]
    fn test_with_overrides() {
        let overridden = AppConfig::default().with_overrides(
            Some("ollama".to_string()),
            Some("llama3.2".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.llm.provider, "ollama");
        assert_eq!(overridden.llm.model, "llama3.2");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml_sections() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  provider: ollama
  model: llama3.2
embedding:
  provider: mock
  dimensions: 384
knowledge:
  chunkSize: 500
  chunkOverlap: 50
  scoreThreshold: 0.5
logging:
  level: debug
  color: false
  format: json
"#,
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.llm.provider, "ollama");
        assert_eq!(merged.embedding.dimensions, 384);
        assert_eq!(merged.knowledge.chunk_size, 500);
        assert_eq!(merged.knowledge.chunk_overlap, 50);
        // Unspecified keys keep their defaults
        assert_eq!(merged.knowledge.batch_size, 100);
        assert_eq!(merged.knowledge.top_k, 4);
        assert_eq!(merged.log_level, Some("debug".to_string()));
        assert!(merged.no_color);
        assert_eq!(merged.log_format, LogFormat::Json);
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = offline_config();
        config.llm.provider = "unknown".to_string();
        assert!(config.validate().is_err());

        let mut config = offline_config();
        config.embedding.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_offline_providers() {
        assert!(offline_config().validate().is_ok());
    }

    #[test]
    fn test_validate_missing_gemini_key() {
        let mut config = offline_config();
        config.llm.provider = "gemini".to_string();
        config.llm.api_key_env = "FLASHCARDS_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_overlap_must_be_smaller_than_chunk() {
        let mut config = offline_config();
        config.knowledge.chunk_overlap = config.knowledge.chunk_size;
        assert!(config.validate_knowledge().is_err());
    }

    #[test]
    fn test_validate_threshold_range() {
        let mut config = offline_config();
        config.knowledge.score_threshold = 1.5;
        assert!(config.validate_knowledge().is_err());
    }
}
