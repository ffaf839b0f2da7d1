//! Provider Registry for managing multiple LLM providers
//!
//! This module provides a registry for the named providers and models
//! configured in `studybot.toml`, and the factory the server uses to turn a
//! model name into a ready client.

use crate::llm::client::{LLMClient, LLMClientFactoryTrait, Provider};
use crate::llm::gemini::GeminiClient;
use crate::types::{AppError, Result};
use crate::utils::toml_config::{
    ModelConfig, ProviderConfig, StudyBotConfig, StudyBotConfigManager,
};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Whether the credentials a model needs are present in the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyStatus {
    Available,
    Missing,
    /// Local providers such as Ollama
    NotRequired,
}

impl ApiKeyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiKeyStatus::Available => "available",
            ApiKeyStatus::Missing => "missing",
            ApiKeyStatus::NotRequired => "not_required",
        }
    }
}

/// Registry for managing multiple named LLM providers
///
/// The ProviderRegistry holds provider and model configurations and creates
/// LLM clients for specific models or providers by name.
pub struct ProviderRegistry {
    /// Provider configurations keyed by name
    providers: HashMap<String, ProviderConfig>,
    /// Model configurations keyed by name
    models: HashMap<String, ModelConfig>,
    /// Default model name to use when none specified
    default_model: Option<String>,
}

impl ProviderRegistry {
    /// Create a new empty provider registry
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            models: HashMap::new(),
            default_model: None,
        }
    }

    /// Create a provider registry from TOML configuration
    ///
    /// The assistant's model becomes the default.
    pub fn from_config(config: &StudyBotConfig) -> Self {
        Self {
            providers: config.providers.clone(),
            models: config.models.clone(),
            default_model: Some(config.assistant.model.clone()),
        }
    }

    pub fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref()
    }

    /// Register a provider configuration
    pub fn register_provider(&mut self, name: &str, config: ProviderConfig) {
        self.providers.insert(name.to_string(), config);
    }

    /// Register a model configuration
    pub fn register_model(&mut self, name: &str, config: ModelConfig) {
        self.models.insert(name.to_string(), config);
    }

    /// Get a provider configuration by name
    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Get a model configuration by name
    pub fn get_model(&self, name: &str) -> Option<&ModelConfig> {
        self.models.get(name)
    }

    /// Get all model names, sorted
    pub fn model_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.models.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Check if a model exists in the registry
    pub fn has_model(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Resolve a model name to its model and provider configurations
    fn resolve(&self, model_name: &str) -> Result<(&ModelConfig, &ProviderConfig)> {
        let model_config = self.get_model(model_name).ok_or_else(|| {
            AppError::Configuration(format!("Model '{}' not found in configuration", model_name))
        })?;

        let provider_config = self.get_provider(&model_config.provider).ok_or_else(|| {
            AppError::Configuration(format!(
                "Provider '{}' referenced by model '{}' not found",
                model_config.provider, model_name
            ))
        })?;

        Ok((model_config, provider_config))
    }

    /// Create an LLM client for a specific model by name
    ///
    /// This resolves the model -> provider chain and creates the appropriate client.
    pub async fn create_client_for_model(&self, model_name: &str) -> Result<Box<dyn LLMClient>> {
        let (model_config, provider_config) = self.resolve(model_name)?;
        let provider = Provider::from_model_config(model_config, provider_config)?;
        provider.create_client().await
    }

    /// Create an LLM client using the default model
    pub async fn create_default_client(&self) -> Result<Box<dyn LLMClient>> {
        let model_name = self
            .default_model
            .as_ref()
            .ok_or_else(|| AppError::Configuration("No default model configured".into()))?;

        self.create_client_for_model(model_name).await
    }

    /// Create a concrete Gemini client, used for listing the models a key can reach
    pub fn create_gemini_client(&self, model_name: &str) -> Result<GeminiClient> {
        let (model_config, provider_config) = self.resolve(model_name)?;
        match Provider::from_model_config(model_config, provider_config)? {
            Provider::Gemini {
                api_key,
                api_base,
                model,
                params,
            } => GeminiClient::new(api_key, api_base, model, params),
            #[allow(unreachable_patterns)]
            other => Err(AppError::Configuration(format!(
                "Model '{}' uses the {} provider, not Gemini",
                model_name,
                other.name()
            ))),
        }
    }

    /// Provider-level model identifier for a configured model name
    pub fn model_id(&self, model_name: &str) -> Option<&str> {
        self.get_model(model_name).map(|m| m.model.as_str())
    }

    /// Report whether the key a model needs is set, without creating a client
    pub fn api_key_status(&self, model_name: &str) -> ApiKeyStatus {
        let Ok((_, provider_config)) = self.resolve(model_name) else {
            return ApiKeyStatus::Missing;
        };

        match provider_config.api_key_env() {
            None => ApiKeyStatus::NotRequired,
            Some(env) => match std::env::var(env) {
                Ok(key) if !key.trim().is_empty() => ApiKeyStatus::Available,
                _ => ApiKeyStatus::Missing,
            },
        }
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a [`ConfigBasedLLMFactory`] reads providers and models from
enum RegistrySource {
    /// Fixed at construction
    Snapshot {
        registry: Arc<ProviderRegistry>,
        default_model: String,
    },
    /// Rebuilt from the manager's current config on every call
    Live(Arc<StudyBotConfigManager>),
}

/// LLM client factory backed by the TOML configuration
///
/// Clients are built per call, so the model a request asks for and the API
/// keys in the environment are resolved at request time. A factory built with
/// [`ConfigBasedLLMFactory::live`] also follows hot-reloaded providers and models.
pub struct ConfigBasedLLMFactory {
    source: RegistrySource,
}

impl ConfigBasedLLMFactory {
    /// Create a new factory from a provider registry
    pub fn new(registry: Arc<ProviderRegistry>, default_model: &str) -> Self {
        Self {
            source: RegistrySource::Snapshot {
                registry,
                default_model: default_model.to_string(),
            },
        }
    }

    /// Create a factory from a fixed TOML configuration
    pub fn from_config(config: &StudyBotConfig) -> Result<Self> {
        ensure_models(config)?;
        Ok(Self::new(
            Arc::new(ProviderRegistry::from_config(config)),
            &config.assistant.model,
        ))
    }

    /// Create a factory that resolves through whatever config `manager` holds now
    pub fn live(manager: Arc<StudyBotConfigManager>) -> Result<Self> {
        ensure_models(&manager.config())?;
        Ok(Self {
            source: RegistrySource::Live(manager),
        })
    }

    /// The provider registry as of this call
    pub fn registry(&self) -> Arc<ProviderRegistry> {
        match &self.source {
            RegistrySource::Snapshot { registry, .. } => Arc::clone(registry),
            RegistrySource::Live(manager) => {
                Arc::new(ProviderRegistry::from_config(&manager.config()))
            }
        }
    }
}

fn ensure_models(config: &StudyBotConfig) -> Result<()> {
    if config.models.is_empty() {
        return Err(AppError::Configuration(
            "No models defined in configuration".into(),
        ));
    }
    Ok(())
}

#[async_trait]
impl LLMClientFactoryTrait for ConfigBasedLLMFactory {
    fn default_model(&self) -> String {
        match &self.source {
            RegistrySource::Snapshot { default_model, .. } => default_model.clone(),
            RegistrySource::Live(manager) => manager.config().assistant.model.clone(),
        }
    }

    async fn create_default(&self) -> Result<Box<dyn LLMClient>> {
        let model = self.default_model();
        let registry = self.registry();
        let client = registry.create_client_for_model(&model).await?;
        Ok(client)
    }

    async fn create_for_model(&self, model_name: &str) -> Result<Box<dyn LLMClient>> {
        let registry = self.registry();
        let client = registry.create_client_for_model(model_name).await?;
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gemini_config(key_env: &str) -> ProviderConfig {
        ProviderConfig::Gemini {
            api_key_env: key_env.to_string(),
            api_base: "http://localhost:9".to_string(),
            default_model: "gemini-2.5-flash".to_string(),
        }
    }

    fn model(provider: &str, model: &str) -> ModelConfig {
        ModelConfig {
            provider: provider.to_string(),
            model: model.to_string(),
            temperature: 0.7,
            max_tokens: None,
            top_p: None,
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = ProviderRegistry::new();
        assert!(registry.model_names().is_empty());
        assert!(registry.default_model().is_none());
    }

    #[test]
    fn test_register_model() {
        let mut registry = ProviderRegistry::new();
        registry.register_provider("gemini", gemini_config("GOOGLE_API_KEY"));
        registry.register_model("pro", model("gemini", "gemini-2.5-pro"));
        registry.register_model("fast", model("gemini", "gemini-2.0-flash"));

        assert!(registry.has_model("pro"));
        assert!(!registry.has_model("nonexistent"));
        assert_eq!(registry.model_names(), vec!["fast", "pro"]);
        assert_eq!(registry.model_id("pro"), Some("gemini-2.5-pro"));
    }

    #[test]
    fn test_from_config_uses_assistant_model() {
        let config = StudyBotConfig::default();
        let registry = ProviderRegistry::from_config(&config);
        assert_eq!(registry.default_model(), Some("default"));
    }

    #[test]
    fn test_api_key_status() {
        std::env::set_var("STUDYBOT_REGISTRY_TEST_KEY", "secret");
        let mut registry = ProviderRegistry::new();
        registry.register_provider("with-key", gemini_config("STUDYBOT_REGISTRY_TEST_KEY"));
        registry.register_provider("no-key", gemini_config("STUDYBOT_REGISTRY_TEST_KEY_UNSET"));
        registry.register_provider(
            "local",
            ProviderConfig::Ollama {
                base_url: "http://localhost:11434".to_string(),
                default_model: "llama3.2".to_string(),
            },
        );
        registry.register_model("a", model("with-key", "gemini-2.5-flash"));
        registry.register_model("b", model("no-key", "gemini-2.5-flash"));
        registry.register_model("c", model("local", "llama3.2"));

        assert_eq!(registry.api_key_status("a"), ApiKeyStatus::Available);
        assert_eq!(registry.api_key_status("b"), ApiKeyStatus::Missing);
        assert_eq!(registry.api_key_status("c"), ApiKeyStatus::NotRequired);
        assert_eq!(registry.api_key_status("unknown"), ApiKeyStatus::Missing);
        assert_eq!(ApiKeyStatus::NotRequired.as_str(), "not_required");
    }

    #[tokio::test]
    async fn test_missing_model_is_configuration_error() {
        let registry = ProviderRegistry::new();
        let err = match registry.create_client_for_model("ghost").await {
            Ok(_) => panic!("Expected error"),
            Err(e) => e,
        };
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_factory_surfaces_missing_key_per_call() {
        let mut registry = ProviderRegistry::new();
        registry.register_provider("gemini", gemini_config("STUDYBOT_FACTORY_TEST_KEY"));
        registry.register_model("default", model("gemini", "gemini-2.5-flash"));
        let factory = ConfigBasedLLMFactory::new(Arc::new(registry), "default");

        // Use match instead of unwrap_err since Box<dyn LLMClient> doesn't implement Debug
        let err = match factory.create_default().await {
            Ok(_) => panic!("Expected missing key error"),
            Err(e) => e.to_string(),
        };
        assert!(err.contains("API key not found"));

        std::env::set_var("STUDYBOT_FACTORY_TEST_KEY", "now-set");
        let client = factory.create_default().await.expect("key is now available");
        assert_eq!(client.model_name(), "gemini-2.5-flash");
    }

    #[test]
    fn test_create_gemini_client() {
        std::env::set_var("STUDYBOT_GEMINI_CLIENT_TEST_KEY", "k");
        let mut registry = ProviderRegistry::new();
        registry.register_provider("gemini", gemini_config("STUDYBOT_GEMINI_CLIENT_TEST_KEY"));
        registry.register_model("default", model("gemini", "models/gemini-2.5-pro"));

        let client = registry.create_gemini_client("default").unwrap();
        assert_eq!(client.model_name(), "gemini-2.5-pro");
    }

    #[test]
    fn test_live_factory_follows_reloaded_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studybot.toml");
        let base = r#"
[database]
backend = "memory"

[providers.gemini]
type = "gemini"

[models.default]
provider = "gemini"
model = "gemini-2.5-flash"
"#;
        std::fs::write(&path, format!("{}\n[assistant]\nmodel = \"default\"\n", base)).unwrap();

        let manager = Arc::new(StudyBotConfigManager::new(&path).unwrap());
        let live = ConfigBasedLLMFactory::live(manager.clone()).unwrap();
        let snapshot = ConfigBasedLLMFactory::from_config(&manager.config()).unwrap();
        assert_eq!(live.default_model(), "default");

        std::fs::write(
            &path,
            format!(
                "{}\n[models.pro]\nprovider = \"gemini\"\nmodel = \"gemini-2.5-pro\"\n\n[assistant]\nmodel = \"pro\"\n",
                base
            ),
        )
        .unwrap();
        manager.reload().unwrap();

        assert_eq!(live.default_model(), "pro");
        assert_eq!(live.registry().model_id("pro"), Some("gemini-2.5-pro"));
        assert_eq!(snapshot.default_model(), "default");
        assert!(!snapshot.registry().has_model("pro"));
    }
}
