//! Configuration management for RegiGuard.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - Config file (`.regiguard/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric: the document index, the prompt
//! overrides and the config file all live under `<workspace>/.regiguard/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Generation providers the LLM factory knows how to build.
pub const KNOWN_LLM_PROVIDERS: [&str; 3] = ["openai", "ollama", "mock"];

/// Embedding providers the embedding factory knows how to build.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 4] = ["openai", "ollama", "trigram", "mock"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .regiguard/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Generation provider ("openai", "ollama", "mock")
    pub provider: String,

    /// Generation model identifier
    pub model: String,

    /// Explicit API key (REGIGUARD_API_KEY); takes precedence over `llm.api_key_env`
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Completion client settings
    pub llm: LlmSettings,

    /// Index embedding provider selection
    pub embedding: EmbeddingSettings,

    /// Relevance check settings
    pub reflection: ReflectionSettings,

    /// Retrieval settings
    pub retrieval: RetrievalSettings,
}

/// Completion client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmSettings {
    /// Custom endpoint URL for the generation provider
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Environment variable holding the provider API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Upper bound on a single completion call
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    /// Maximum tokens to generate
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_generation_timeout(),
            max_tokens: None,
        }
    }
}

/// Configuration of one embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingConfig {
    /// Provider name: "openai", "ollama", "trigram", "mock"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Custom endpoint URL
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Maximum batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Request timeout for remote providers
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl EmbeddingConfig {
    /// Local, offline trigram embedder.
    pub fn trigram() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout(),
        }
    }

    /// Remote OpenAI embedder.
    pub fn openai() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-large".to_string(),
            dimensions: 3072,
            endpoint: None,
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::trigram()
    }
}

/// Index embedder: a primary provider and the local fallback tried once when
/// the primary fails to initialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    pub primary: EmbeddingConfig,
    pub fallback: EmbeddingConfig,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            primary: EmbeddingConfig::openai(),
            fallback: EmbeddingConfig::trigram(),
        }
    }
}

/// Relevance check settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectionSettings {
    /// Local embedding model used only for reflection
    #[serde(default)]
    pub embedder: EmbeddingConfig,

    /// Minimum max-similarity for `ok == true` (inclusive)
    #[serde(default = "default_reflect_threshold")]
    pub threshold: f32,

    #[serde(default = "default_reflection_timeout")]
    pub timeout_secs: u64,
}

impl Default for ReflectionSettings {
    fn default() -> Self {
        Self {
            embedder: EmbeddingConfig::trigram(),
            threshold: default_reflect_threshold(),
            timeout_secs: default_reflection_timeout(),
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalSettings {
    /// Multiplier applied to k before access filtering
    #[serde(default = "default_oversample")]
    pub oversample: usize,

    /// k used when a request does not carry one
    #[serde(default = "default_k")]
    pub default_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            oversample: default_oversample(),
            default_k: default_k(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_generation_timeout() -> u64 {
    60
}

fn default_reflection_timeout() -> u64 {
    30
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_batch_size() -> usize {
    100
}

fn default_reflect_threshold() -> f32 {
    0.5
}

fn default_oversample() -> usize {
    2
}

fn default_k() -> usize {
    3
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmFileSection>,
    embedding: Option<EmbeddingSettings>,
    reflection: Option<ReflectionSettings>,
    retrieval: Option<RetrievalSettings>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LlmFileSection {
    provider: Option<String>,
    model: Option<String>,
    #[serde(flatten)]
    settings: LlmSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            reflection: ReflectionSettings::default(),
            retrieval: RetrievalSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the workspace config file and the
    /// environment.
    ///
    /// Environment variables:
    /// - `REGIGUARD_WORKSPACE`: Override workspace path
    /// - `REGIGUARD_CONFIG`: Path to config file
    /// - `REGIGUARD_PROVIDER`: Generation provider
    /// - `REGIGUARD_MODEL`: Generation model
    /// - `REGIGUARD_API_KEY`: API key
    /// - `REFLECT_THRESHOLD`: Reflection threshold
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use regiguard_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("REGIGUARD_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("REGIGUARD_CONFIG") {
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
            .unwrap_or_else(|| config.regiguard_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("REGIGUARD_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("REGIGUARD_MODEL") {
            config.model = model;
        }

        if let Ok(threshold) = std::env::var("REFLECT_THRESHOLD") {
            config.reflection.threshold = threshold.trim().parse().map_err(|e| {
                AppError::Config(format!("Invalid REFLECT_THRESHOLD '{}': {}", threshold, e))
            })?;
        }

        config.api_key = std::env::var("REGIGUARD_API_KEY").ok();
        config.log_level = std::env::var("RUST_LOG").ok();

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

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> Result<Self, serde_yaml::Error> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;
        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            if let Some(provider) = llm.provider {
                result.provider = provider;
            }
            if let Some(model) = llm.model {
                result.model = model;
            }
            result.llm = llm.settings;
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(reflection) = config_file.reflection {
            result.reflection = reflection;
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
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

    /// Get the path to the .regiguard directory.
    pub fn regiguard_dir(&self) -> PathBuf {
        self.workspace.join(".regiguard")
    }

    /// Directory holding the document index and its manifest.
    pub fn index_dir(&self) -> PathBuf {
        self.regiguard_dir().join("index")
    }

    /// Ensure the .regiguard directory exists.
    pub fn ensure_regiguard_dir(&self) -> AppResult<()> {
        let dir = self.regiguard_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .regiguard directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Resolve the provider API key.
    ///
    /// `REGIGUARD_API_KEY` wins; otherwise the variable named by
    /// `llm.apiKeyEnv` is read.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        std::env::var(&self.llm.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Validate the merged configuration.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_LLM_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_LLM_PROVIDERS.join(", ")
            )));
        }

        for (role, embedder) in [
            ("embedding.primary", &self.embedding.primary),
            ("embedding.fallback", &self.embedding.fallback),
            ("reflection.embedder", &self.reflection.embedder),
        ] {
            if !KNOWN_EMBEDDING_PROVIDERS.contains(&embedder.provider.as_str()) {
                return Err(AppError::Config(format!(
                    "Unknown embedding provider for {}: {}. Supported: {}",
                    role,
                    embedder.provider,
                    KNOWN_EMBEDDING_PROVIDERS.join(", ")
                )));
            }
            if embedder.dimensions == 0 {
                return Err(AppError::Config(format!(
                    "{} dimensions must be greater than zero",
                    role
                )));
            }
        }

        let threshold = self.reflection.threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(AppError::Config(format!(
                "Reflection threshold must be within [0, 1], got {}",
                threshold
            )));
        }

        if self.retrieval.oversample == 0 {
            return Err(AppError::Config(
                "retrieval.oversample must be at least 1".to_string(),
            ));
        }

        if self.retrieval.default_k == 0 {
            return Err(AppError::Config(
                "retrieval.defaultK must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.reflection.threshold, 0.5);
        assert_eq!(config.retrieval.oversample, 2);
        assert_eq!(config.embedding.primary.provider, "openai");
        assert_eq!(config.embedding.fallback.provider, "trigram");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_index_dir() {
        let config = AppConfig::default();
        assert!(config.index_dir().ends_with(".regiguard/index"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("ollama".to_string()),
            Some("llama3.2".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "ollama");
        assert_eq!(overridden.model, "llama3.2");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml_sections() {
        let yaml = r#"
llm:
  provider: ollama
  model: llama3.2
  endpoint: http://localhost:11434
  timeoutSecs: 12
embedding:
  primary:
    provider: ollama
    model: nomic-embed-text
    dimensions: 768
  fallback:
    provider: trigram
    model: trigram-v1
    dimensions: 384
reflection:
  threshold: 0.35
retrieval:
  oversample: 4
logging:
  level: debug
  color: false
"#;

        let merged = AppConfig::default().merge_yaml_str(yaml).unwrap();
        assert_eq!(merged.provider, "ollama");
        assert_eq!(merged.model, "llama3.2");
        assert_eq!(merged.llm.timeout_secs, 12);
        assert_eq!(merged.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(merged.embedding.primary.dimensions, 768);
        assert_eq!(merged.reflection.threshold, 0.35);
        assert_eq!(merged.reflection.embedder.provider, "trigram");
        assert_eq!(merged.retrieval.oversample, 4);
        assert_eq!(merged.retrieval.default_k, 3);
        assert_eq!(merged.log_level, Some("debug".to_string()));
        assert!(merged.no_color);
    }

    #[test]
    fn test_load_from_workspace_file() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".regiguard")).unwrap();
        std::fs::write(
            temp.path().join(".regiguard/config.yaml"),
            "retrieval:\n  oversample: 3\n",
        )
        .unwrap();

        let base = AppConfig {
            workspace: temp.path().to_path_buf(),
            ..AppConfig::default()
        };
        let merged = base
            .merge_yaml(&temp.path().join(".regiguard/config.yaml"))
            .unwrap();
        assert_eq!(merged.retrieval.oversample, 3);
    }

    #[test]
    fn test_validate_unknown_provider() {
        let config = AppConfig {
            provider: "unknown".to_string(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_threshold_out_of_range() {
        let mut config = AppConfig::default();
        config.reflection.threshold = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("threshold"));
    }

    #[test]
    fn test_validate_zero_oversample() {
        let mut config = AppConfig::default();
        config.retrieval.oversample = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let config = AppConfig {
            api_key: Some("sk-explicit".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(config.resolve_api_key(), Some("sk-explicit".to_string()));
    }
}
