//! # Study Bot - AI study assistant server
//!
//! An HTTP and terminal chatbot that answers students' academic questions with
//! a hosted LLM (Gemini by default) and remembers each student's recent
//! conversation in a document or SQL store.
//!
//! ## Overview
//!
//! Study Bot can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `studybot-server` binary
//! 2. **As a library** - Import the assistant, stores and LLM clients into your own project
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use studybot::{DatabaseProvider, ConfigBasedLLMFactory, StudyAssistant, StudyBotConfig};
//! use std::sync::Arc;
//!
//! let config = StudyBotConfig::load("studybot.toml")?;
//! let store = DatabaseProvider::from_config(&config)?.create_store().await?;
//! let factory = Arc::new(ConfigBasedLLMFactory::from_config(&config)?);
//!
//! let assistant = StudyAssistant::new(store, factory, (&config.assistant).into());
//! let answer = assistant.ask("izza", "What is photosynthesis?").await?;
//! println!("{}", answer.response);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `mongodb` | MongoDB history store (default) |
//! | `local-db` | Local SQLite history via libsql (default) |
//! | `ollama` | Ollama local inference |
//! | `openai` | OpenAI API support |
//! | `swagger-ui` | Interactive API docs at `/docs` |
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers and routes
//! - [`assistant`] - Question answering with conversation memory
//! - [`cli`] - Command-line interface
//! - [`db`] - History stores (MongoDB, SQLite, Turso)
//! - [`llm`] - LLM client implementations
//! - [`memory`] - Prompt and transcript construction
//! - [`types`] - Common types and error handling

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// REST API handlers, routes and OpenAPI document.
#[allow(missing_docs)]
pub mod api;
/// Study assistant orchestration.
#[allow(missing_docs)]
pub mod assistant;
/// Command-line interface: arguments, output, scaffolding and terminal chat.
#[allow(missing_docs)]
pub mod cli;
/// Chat history stores.
pub mod db;
/// LLM provider clients.
#[allow(missing_docs)]
pub mod llm;
/// Conversation memory and prompt construction.
pub mod memory;
/// Shared request, response and error types.
#[allow(missing_docs)]
pub mod types;
/// Configuration loading and hot reloading.
#[allow(missing_docs)]
pub mod utils;

// Re-export commonly used types
pub use assistant::{AssistantSettings, StudyAnswer, StudyAssistant};
pub use db::{ChatStore, DatabaseProvider, TursoClient};
pub use llm::{
    ApiKeyStatus, ConfigBasedLLMFactory, GeminiClient, LLMClient, LLMClientFactory,
    LLMClientFactoryTrait, Provider, ProviderRegistry,
};
pub use types::{AppError, Result};
pub use utils::toml_config::{StudyBotConfig, StudyBotConfigManager};

use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// TOML configuration with hot-reload support
    pub config_manager: Arc<StudyBotConfigManager>,
    /// Chat history store
    pub store: Arc<dyn ChatStore>,
    /// LLM client factory
    pub llm_factory: Arc<dyn LLMClientFactoryTrait>,
}

impl AppState {
    pub fn new(
        config_manager: Arc<StudyBotConfigManager>,
        store: Arc<dyn ChatStore>,
        llm_factory: Arc<dyn LLMClientFactoryTrait>,
    ) -> Self {
        Self {
            config_manager,
            store,
            llm_factory,
        }
    }

    /// Providers and models as currently configured, for status reporting
    pub fn provider_registry(&self) -> ProviderRegistry {
        ProviderRegistry::from_config(&self.config_manager.config())
    }

    /// An assistant using the `[assistant]` section as it is right now
    pub fn assistant(&self) -> StudyAssistant {
        let config = self.config_manager.config();
        StudyAssistant::new(
            Arc::clone(&self.store),
            Arc::clone(&self.llm_factory),
            AssistantSettings::from(&config.assistant),
        )
    }
}
