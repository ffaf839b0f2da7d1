//! TOML-based configuration for Study Bot
//!
//! This module provides declarative configuration for the server, the history
//! store, LLM providers and models, and the study assistant itself via a TOML
//! file (`studybot.toml`).
//!
//! # Hot Reloading
//!
//! Configuration changes are automatically detected and applied at runtime.
//! Use `StudyBotConfigManager` for thread-safe access to the current configuration.
//! The `[assistant]`, `[providers]` and `[models]` sections are read on every
//! request; the server address and the database backend are bound at startup.

use crate::llm::gemini::{DEFAULT_GEMINI_API_BASE, DEFAULT_GEMINI_MODEL};
use crate::memory::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT, PromptStyle, STUDY_SYSTEM_PROMPT};
use arc_swap::ArcSwap;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Default file name looked up by the binary
pub const DEFAULT_CONFIG_FILE: &str = "studybot.toml";

/// Quiet period after a file event before the config is reloaded
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(500);

/// Root configuration structure loaded from studybot.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyBotConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    /// Named LLM provider configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Named model configurations that reference providers
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,

    /// Study assistant behaviour
    #[serde(default)]
    pub assistant: AssistantConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Maximum accepted request body size in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

// ============= Database Configuration =============

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    /// MongoDB document store (connection string read from `mongodb_uri_env`)
    #[default]
    MongoDB,
    /// Local SQLite file via libsql
    SQLite,
    /// Ephemeral in-memory SQLite
    Memory,
    /// Remote Turso database
    Turso,
}

impl DatabaseBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseBackend::MongoDB => "mongodb",
            DatabaseBackend::SQLite => "sqlite",
            DatabaseBackend::Memory => "memory",
            DatabaseBackend::Turso => "turso",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: DatabaseBackend,

    /// Local database path (sqlite backend)
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Environment variable holding the MongoDB connection string
    #[serde(default = "default_mongodb_uri_env")]
    pub mongodb_uri_env: String,

    #[serde(default = "default_mongodb_database")]
    pub mongodb_database: String,

    #[serde(default = "default_mongodb_collection")]
    pub mongodb_collection: String,

    /// Environment variable for Turso URL
    pub turso_url_env: Option<String>,

    /// Environment variable for Turso auth token
    pub turso_token_env: Option<String>,
}

fn default_database_url() -> String {
    "./data/studybot.db".to_string()
}

fn default_mongodb_uri_env() -> String {
    "MONGODB_URI".to_string()
}

fn default_mongodb_database() -> String {
    "study_bot".to_string()
}

fn default_mongodb_collection() -> String {
    "chat_history".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::default(),
            url: default_database_url(),
            mongodb_uri_env: default_mongodb_uri_env(),
            mongodb_database: default_mongodb_database(),
            mongodb_collection: default_mongodb_collection(),
            turso_url_env: None,
            turso_token_env: None,
        }
    }
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Gemini {
        /// Environment variable containing API key
        #[serde(default = "default_gemini_key_env")]
        api_key_env: String,
        #[serde(default = "default_gemini_base")]
        api_base: String,
        #[serde(default = "default_gemini_model")]
        default_model: String,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        default_model: String,
    },
    OpenAI {
        /// Environment variable containing API key
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        default_model: String,
    },
}

impl ProviderConfig {
    /// Name of the environment variable holding this provider's key, if any
    pub fn api_key_env(&self) -> Option<&str> {
        match self {
            ProviderConfig::Gemini { api_key_env, .. } => Some(api_key_env),
            ProviderConfig::OpenAI { api_key_env, .. } => Some(api_key_env),
            ProviderConfig::Ollama { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProviderConfig::Gemini { .. } => "gemini",
            ProviderConfig::Ollama { .. } => "ollama",
            ProviderConfig::OpenAI { .. } => "openai",
        }
    }
}

fn default_gemini_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

fn default_gemini_base() -> String {
    DEFAULT_GEMINI_API_BASE.to_string()
}

fn default_gemini_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

// ============= Model Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Reference to a provider name defined in [providers]
    pub provider: String,

    /// Model name/identifier to use with the provider
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Optional cap on generated tokens
    pub max_tokens: Option<u32>,

    /// Optional top_p value
    pub top_p: Option<f32>,
}

fn default_temperature() -> f32 {
    0.7
}

// ============= Assistant Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Reference to a model name defined in [models]
    #[serde(default = "default_assistant_model")]
    pub model: String,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Turns of earlier conversation injected as context
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Upper bound for the `limit` accepted by history lookups
    #[serde(default = "default_max_history_limit")]
    pub max_history_limit: usize,

    #[serde(default)]
    pub prompt_style: PromptStyle,

    /// Estimated token budget for injected history
    #[serde(default = "default_context_token_budget")]
    pub context_token_budget: usize,

    /// Read and write conversation history
    #[serde(default = "default_true")]
    pub use_memory: bool,
}

fn default_assistant_model() -> String {
    "default".to_string()
}

fn default_system_prompt() -> String {
    STUDY_SYSTEM_PROMPT.to_string()
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_max_history_limit() -> usize {
    MAX_HISTORY_LIMIT
}

fn default_context_token_budget() -> usize {
    8000
}

fn default_true() -> bool {
    true
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model: default_assistant_model(),
            system_prompt: default_system_prompt(),
            history_limit: default_history_limit(),
            max_history_limit: default_max_history_limit(),
            prompt_style: PromptStyle::default(),
            context_token_budget: default_context_token_budget(),
            use_memory: true,
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Configuration warnings that don't prevent operation but may indicate issues
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub kind: ConfigWarningKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarningKind {
    UnusedProvider,
    UnusedModel,
    MissingApiKey,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("Provider '{0}' referenced by model '{1}' does not exist")]
    MissingProvider(String, String),

    #[error("Model '{0}' referenced by the assistant does not exist")]
    MissingModel(String),

    #[error("Watch error: {0}")]
    WatchError(#[from] notify::Error),
}

impl StudyBotConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;

        config.validate()?;

        Ok(config)
    }

    /// Parse configuration text without validating it
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Validate the configuration for internal consistency and env var availability
    ///
    /// Provider API keys are deliberately not required here: the server starts
    /// without them and reports the missing key through `/health` and per request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.database.backend {
            DatabaseBackend::MongoDB => {
                self.validate_env_var(&self.database.mongodb_uri_env)?;
                if self.database.mongodb_database.trim().is_empty()
                    || self.database.mongodb_collection.trim().is_empty()
                {
                    return Err(ConfigError::ValidationError(
                        "mongodb_database and mongodb_collection must not be empty".to_string(),
                    ));
                }
            }
            DatabaseBackend::Turso => {
                let url_env = self.database.turso_url_env.as_ref().ok_or_else(|| {
                    ConfigError::ValidationError(
                        "turso backend requires database.turso_url_env".to_string(),
                    )
                })?;
                let token_env = self.database.turso_token_env.as_ref().ok_or_else(|| {
                    ConfigError::ValidationError(
                        "turso backend requires database.turso_token_env".to_string(),
                    )
                })?;
                self.validate_env_var(url_env)?;
                self.validate_env_var(token_env)?;
            }
            DatabaseBackend::SQLite => {
                if self.database.url.trim().is_empty() {
                    return Err(ConfigError::ValidationError(
                        "sqlite backend requires database.url".to_string(),
                    ));
                }
            }
            DatabaseBackend::Memory => {}
        }

        // Validate model -> provider references
        for (model_name, model_config) in &self.models {
            if !self.providers.contains_key(&model_config.provider) {
                return Err(ConfigError::MissingProvider(
                    model_config.provider.clone(),
                    model_name.clone(),
                ));
            }
            if !(0.0..=2.0).contains(&model_config.temperature) {
                return Err(ConfigError::ValidationError(format!(
                    "Model '{}' has temperature {} outside 0.0..=2.0",
                    model_name, model_config.temperature
                )));
            }
        }

        // Validate assistant -> model reference
        if !self.models.contains_key(&self.assistant.model) {
            return Err(ConfigError::MissingModel(self.assistant.model.clone()));
        }

        let assistant = &self.assistant;
        if assistant.max_history_limit == 0 {
            return Err(ConfigError::ValidationError(
                "assistant.max_history_limit must be at least 1".to_string(),
            ));
        }
        if assistant.history_limit > assistant.max_history_limit {
            return Err(ConfigError::ValidationError(format!(
                "assistant.history_limit ({}) exceeds assistant.max_history_limit ({})",
                assistant.history_limit, assistant.max_history_limit
            )));
        }
        if assistant.system_prompt.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "assistant.system_prompt must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate configuration with warnings for unused items and missing keys
    ///
    /// Returns Ok with warnings, or Err if validation fails
    pub fn validate_with_warnings(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        self.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(self.check_unused_providers());
        warnings.extend(self.check_unused_models());
        warnings.extend(self.check_missing_api_keys());

        Ok(warnings)
    }

    /// Check for providers that aren't referenced by any model
    fn check_unused_providers(&self) -> Vec<ConfigWarning> {
        let referenced: HashSet<_> = self.models.values().map(|m| m.provider.as_str()).collect();

        self.providers
            .keys()
            .filter(|name| !referenced.contains(name.as_str()))
            .map(|name| ConfigWarning {
                kind: ConfigWarningKind::UnusedProvider,
                message: format!(
                    "Provider '{}' is defined but not referenced by any model",
                    name
                ),
            })
            .collect()
    }

    /// Models other than the assistant's are only reachable through the library API
    fn check_unused_models(&self) -> Vec<ConfigWarning> {
        self.models
            .keys()
            .filter(|name| name.as_str() != self.assistant.model)
            .map(|name| ConfigWarning {
                kind: ConfigWarningKind::UnusedModel,
                message: format!(
                    "Model '{}' is defined but not used by the assistant",
                    name
                ),
            })
            .collect()
    }

    fn check_missing_api_keys(&self) -> Vec<ConfigWarning> {
        self.providers
            .iter()
            .filter_map(|(name, provider)| {
                let env = provider.api_key_env()?;
                if self.resolve_env(env).is_some() {
                    return None;
                }
                Some(ConfigWarning {
                    kind: ConfigWarningKind::MissingApiKey,
                    message: format!(
                        "Provider '{}' reads its API key from '{}', which is not set",
                        name, env
                    ),
                })
            })
            .collect()
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        self.resolve_env(name)
            .map(|_| ())
            .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
    }

    /// Get a resolved, non-empty value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok().filter(|v| !v.trim().is_empty())
    }

    /// Get the MongoDB connection string from the environment
    pub fn mongodb_uri(&self) -> Result<String, ConfigError> {
        self.resolve_env(&self.database.mongodb_uri_env)
            .ok_or_else(|| ConfigError::MissingEnvVar(self.database.mongodb_uri_env.clone()))
    }

    /// Get provider by name
    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Get model by name
    pub fn get_model(&self, name: &str) -> Option<&ModelConfig> {
        self.models.get(name)
    }

    /// The model configuration the assistant answers with
    pub fn assistant_model(&self) -> Option<&ModelConfig> {
        self.get_model(&self.assistant.model)
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for StudyBotConfig {
    /// Gemini-backed configuration matching the generated `studybot.toml`
    fn default() -> Self {
        let mut providers = HashMap::new();
        providers.insert(
            "gemini".to_string(),
            ProviderConfig::Gemini {
                api_key_env: default_gemini_key_env(),
                api_base: default_gemini_base(),
                default_model: default_gemini_model(),
            },
        );

        let mut models = HashMap::new();
        models.insert(
            "default".to_string(),
            ModelConfig {
                provider: "gemini".to_string(),
                model: default_gemini_model(),
                temperature: default_temperature(),
                max_tokens: None,
                top_p: None,
            },
        );

        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            providers,
            models,
            assistant: AssistantConfig::default(),
        }
    }
}

// ============= Hot Reloading Configuration Manager =============

/// Thread-safe configuration manager with hot reloading support
pub struct StudyBotConfigManager {
    config: Arc<ArcSwap<StudyBotConfig>>,
    config_path: PathBuf,
    watcher: RwLock<Option<RecommendedWatcher>>,
}

impl StudyBotConfigManager {
    /// Create a new configuration manager and load the initial config
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        // Convert to absolute path for reliable file watching
        let path = path.as_ref();
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(ConfigError::ReadError)?
                .join(path)
        };

        let config = StudyBotConfig::load(&path)?;

        Ok(Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: path,
            watcher: RwLock::new(None),
        })
    }

    /// Create a config manager directly from a config (useful for testing)
    /// This won't have file watching capabilities.
    pub fn from_config(config: StudyBotConfig) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            watcher: RwLock::new(None),
        }
    }

    /// Get the current configuration (lockless read)
    pub fn config(&self) -> Arc<StudyBotConfig> {
        self.config.load_full()
    }

    /// Path of the watched configuration file
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Manually reload the configuration from disk
    pub fn reload(&self) -> Result<(), ConfigError> {
        info!("Reloading configuration from {:?}", self.config_path);

        let new_config = StudyBotConfig::load(&self.config_path)?;
        self.config.store(Arc::new(new_config));

        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Start watching for configuration file changes
    ///
    /// Events are coalesced for 500 ms, then the file is loaded and validated.
    /// An invalid file is logged and the previous configuration stays active.
    pub fn start_watching(&mut self) -> Result<(), ConfigError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        let config_path = self.config_path.clone();
        let config_arc = Arc::clone(&self.config);
        let file_name = self.config_path.file_name().map(|n| n.to_os_string());

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    let touches_config = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if touches_config && (event.kind.is_modify() || event.kind.is_create()) {
                        let _ = tx.send(());
                    }
                }
                Err(e) => {
                    error!("Config watcher error: {:?}", e);
                }
            }
        })?;

        // Watch the config file's parent directory so editors that replace the file are seen
        if let Some(parent) = self.config_path.parent() {
            watcher.watch(parent, RecursiveMode::NonRecursive)?;
        }

        *self.watcher.write() = Some(watcher);

        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                tokio::time::sleep(RELOAD_DEBOUNCE).await;
                while rx.try_recv().is_ok() {}

                match StudyBotConfig::load(&config_path) {
                    Ok(new_config) => {
                        config_arc.store(Arc::new(new_config));
                        info!("Configuration hot-reloaded successfully");
                    }
                    Err(e) => {
                        warn!(
                            "Failed to hot-reload config: {}. Keeping previous config.",
                            e
                        );
                    }
                }
            }
        });

        info!("Configuration hot-reload watcher started");
        Ok(())
    }

    /// Stop watching for configuration changes
    pub fn stop_watching(&self) {
        *self.watcher.write() = None;
        info!("Configuration hot-reload watcher stopped");
    }
}

impl Clone for StudyBotConfigManager {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            config_path: self.config_path.clone(),
            watcher: RwLock::new(None), // Watcher is not cloned
        }
    }
}
