//! LLM Client abstractions and provider management
//!
//! This module provides a unified interface for the LLM providers the study
//! assistant can answer with:
//! - **Gemini**: Google Generative Language REST API (always available)
//! - **Ollama**: Local LLM inference (feature `ollama`)
//! - **OpenAI**: OpenAI API and compatible endpoints (feature `openai`)

use crate::types::{AppError, Result};
use crate::utils::toml_config::{ModelConfig, ProviderConfig};
use async_trait::async_trait;

/// Generic LLM client trait for provider abstraction
///
/// All LLM providers implement this trait, allowing for easy swapping
/// between providers without changing application code.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Generate with conversation history
    async fn generate_with_history(
        &self,
        messages: &[(String, String)], // (role, content) pairs
    ) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Sampling parameters applied to every request of a client
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelParams {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: None,
            top_p: None,
        }
    }
}

impl From<&ModelConfig> for ModelParams {
    fn from(config: &ModelConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
        }
    }
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// Google Gemini via the Generative Language API
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Gemini {
    ///     api_key: std::env::var("GOOGLE_API_KEY")?,
    ///     api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
    ///     model: "gemini-2.5-flash".to_string(),
    ///     params: ModelParams::default(),
    /// };
    /// ```
    Gemini {
        api_key: String,
        api_base: String,
        model: String,
        params: ModelParams,
    },

    /// Ollama local LLM provider
    ///
    /// Sampling parameters are left to the Ollama model file.
    #[cfg(feature = "ollama")]
    Ollama { base_url: String, model: String },

    /// OpenAI API provider (including compatible APIs)
    #[cfg(feature = "openai")]
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
        params: ModelParams,
    },
}

impl Provider {
    /// Create a client instance for this provider
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be constructed or the
    /// provider cannot be reached.
    pub async fn create_client(&self) -> Result<Box<dyn LLMClient>> {
        match self {
            Provider::Gemini {
                api_key,
                api_base,
                model,
                params,
            } => Ok(Box::new(super::gemini::GeminiClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                *params,
            )?)),

            #[cfg(feature = "ollama")]
            Provider::Ollama { base_url, model } => Ok(Box::new(
                super::ollama::OllamaClient::new(base_url.clone(), model.clone()).await?,
            )),

            #[cfg(feature = "openai")]
            Provider::OpenAI {
                api_key,
                api_base,
                model,
                params,
            } => Ok(Box::new(super::openai::OpenAIClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                *params,
            ))),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini { .. } => "Gemini",
            #[cfg(feature = "ollama")]
            Provider::Ollama { .. } => "Ollama",
            #[cfg(feature = "openai")]
            Provider::OpenAI { .. } => "OpenAI",
        }
    }

    /// Model identifier this provider will be asked for
    pub fn model(&self) -> &str {
        match self {
            Provider::Gemini { model, .. } => model,
            #[cfg(feature = "ollama")]
            Provider::Ollama { model, .. } => model,
            #[cfg(feature = "openai")]
            Provider::OpenAI { model, .. } => model,
        }
    }

    /// Build a provider from a `[providers.<name>]` entry
    ///
    /// `model_override` replaces the provider's `default_model`. API keys are
    /// read from the environment at this point, so a key exported after startup
    /// is picked up by the next client.
    pub fn from_config(
        config: &ProviderConfig,
        model_override: Option<&str>,
        params: ModelParams,
    ) -> Result<Self> {
        match config {
            ProviderConfig::Gemini {
                api_key_env,
                api_base,
                default_model,
            } => Ok(Provider::Gemini {
                api_key: read_api_key(api_key_env, "Google")?,
                api_base: api_base.clone(),
                model: model_override.unwrap_or(default_model).to_string(),
                params,
            }),

            #[cfg(feature = "ollama")]
            ProviderConfig::Ollama {
                base_url,
                default_model,
            } => Ok(Provider::Ollama {
                base_url: base_url.clone(),
                model: model_override.unwrap_or(default_model).to_string(),
            }),

            #[cfg(not(feature = "ollama"))]
            ProviderConfig::Ollama { .. } => Err(AppError::Configuration(
                "Ollama provider requires the 'ollama' feature".to_string(),
            )),

            #[cfg(feature = "openai")]
            ProviderConfig::OpenAI {
                api_key_env,
                api_base,
                default_model,
            } => Ok(Provider::OpenAI {
                api_key: read_api_key(api_key_env, "OpenAI")?,
                api_base: api_base.clone(),
                model: model_override.unwrap_or(default_model).to_string(),
                params,
            }),

            #[cfg(not(feature = "openai"))]
            ProviderConfig::OpenAI { .. } => Err(AppError::Configuration(
                "OpenAI provider requires the 'openai' feature".to_string(),
            )),
        }
    }

    /// Build a provider for a `[models.<name>]` entry and the provider it references
    pub fn from_model_config(model: &ModelConfig, provider: &ProviderConfig) -> Result<Self> {
        Self::from_config(provider, Some(&model.model), ModelParams::from(model))
    }
}

fn read_api_key(env_name: &str, vendor: &str) -> Result<String> {
    std::env::var(env_name)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            AppError::Configuration(format!(
                "{} API key not found. Set the {} environment variable.",
                vendor, env_name
            ))
        })
}

/// Trait abstraction for LLM client factories (useful for mocking in tests)
#[async_trait]
pub trait LLMClientFactoryTrait: Send + Sync {
    /// Name of the model used when the caller does not pick one
    fn default_model(&self) -> String;

    /// Create a client for the default model
    async fn create_default(&self) -> Result<Box<dyn LLMClient>>;

    /// Create a client for a named model
    async fn create_for_model(&self, model_name: &str) -> Result<Box<dyn LLMClient>>;
}

/// Factory bound to a single, already resolved provider
///
/// # Example
///
/// ```rust,ignore
/// use studybot::llm::{LLMClientFactory, Provider, ModelParams};
///
/// let factory = LLMClientFactory::new(Provider::Gemini {
///     api_key: key,
///     api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
///     model: "gemini-2.5-flash".to_string(),
///     params: ModelParams::default(),
/// });
/// let client = factory.create_default().await?;
/// ```
pub struct LLMClientFactory {
    default_provider: Provider,
}

impl LLMClientFactory {
    /// Create a new factory with the specified default provider
    pub fn new(default_provider: Provider) -> Self {
        Self { default_provider }
    }

    /// Get a reference to the default provider
    pub fn default_provider(&self) -> &Provider {
        &self.default_provider
    }
}

#[async_trait]
impl LLMClientFactoryTrait for LLMClientFactory {
    fn default_model(&self) -> String {
        self.default_provider.model().to_string()
    }

    async fn create_default(&self) -> Result<Box<dyn LLMClient>> {
        self.default_provider.create_client().await
    }

    /// Swaps the model on the fixed provider
    async fn create_for_model(&self, model_name: &str) -> Result<Box<dyn LLMClient>> {
        let mut provider = self.default_provider.clone();
        match &mut provider {
            Provider::Gemini { model, .. } => *model = model_name.to_string(),
            #[cfg(feature = "ollama")]
            Provider::Ollama { model, .. } => *model = model_name.to_string(),
            #[cfg(feature = "openai")]
            Provider::OpenAI { model, .. } => *model = model_name.to_string(),
        }
        provider.create_client().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gemini_provider() -> Provider {
        Provider::Gemini {
            api_key: "test-key".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            params: ModelParams::default(),
        }
    }

    #[test]
    fn test_provider_name_and_model() {
        let provider = gemini_provider();
        assert_eq!(provider.name(), "Gemini");
        assert_eq!(provider.model(), "gemini-2.5-flash");
    }

    #[test]
    fn test_model_params_default_temperature() {
        let params = ModelParams::default();
        assert!((params.temperature - 0.7).abs() < f32::EPSILON);
        assert!(params.max_tokens.is_none());
    }

    #[test]
    fn test_from_config_missing_key() {
        let config = ProviderConfig::Gemini {
            api_key_env: "STUDYBOT_CLIENT_TEST_KEY_NEVER_SET".to_string(),
            api_base: "http://localhost".to_string(),
            default_model: "gemini-2.5-flash".to_string(),
        };

        let err = Provider::from_config(&config, None, ModelParams::default()).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert!(err.to_string().contains("Google API key not found"));
        assert!(err.to_string().contains("STUDYBOT_CLIENT_TEST_KEY_NEVER_SET"));
    }

    #[test]
    fn test_from_model_config_uses_model_and_params() {
        std::env::set_var("STUDYBOT_CLIENT_TEST_KEY", "abc");
        let provider_config = ProviderConfig::Gemini {
            api_key_env: "STUDYBOT_CLIENT_TEST_KEY".to_string(),
            api_base: "http://localhost".to_string(),
            default_model: "gemini-2.5-flash".to_string(),
        };
        let model_config = ModelConfig {
            provider: "gemini".to_string(),
            model: "gemini-2.5-pro".to_string(),
            temperature: 0.2,
            max_tokens: Some(256),
            top_p: None,
        };

        let provider = Provider::from_model_config(&model_config, &provider_config).unwrap();
        match provider {
            Provider::Gemini {
                api_key,
                model,
                params,
                ..
            } => {
                assert_eq!(api_key, "abc");
                assert_eq!(model, "gemini-2.5-pro");
                assert_eq!(params.max_tokens, Some(256));
            }
            #[allow(unreachable_patterns)]
            other => panic!("Expected Gemini provider, got {:?}", other),
        }
    }

    #[test]
    fn test_factory_default_provider() {
        let factory = LLMClientFactory::new(gemini_provider());
        assert_eq!(factory.default_provider().name(), "Gemini");
        assert_eq!(factory.default_model(), "gemini-2.5-flash");
    }

    #[tokio::test]
    async fn test_factory_create_for_model() {
        let factory = LLMClientFactory::new(gemini_provider());
        let client = factory.create_for_model("gemini-2.0-flash").await.unwrap();
        assert_eq!(client.model_name(), "gemini-2.0-flash");
    }
}
