//! LLM Provider Clients and Abstractions
//!
//! This module provides a unified interface for the Large Language Model
//! providers the study assistant can answer with. Provider specifics are hidden
//! behind common traits, so the rest of the application works with any of them.
//!
//! # Architecture
//!
//! The module follows a factory pattern:
//! - [`LLMClient`] - The core trait that all providers implement
//! - [`LLMClientFactoryTrait`] - Factory trait for creating clients by model name
//! - [`ProviderRegistry`] - Registry of configured providers and models
//! - [`ConfigBasedLLMFactory`] - Creates clients based on `studybot.toml` configuration
//!
//! # Supported Providers
//!
//! - Gemini - always available
//! - `ollama` feature - Local Ollama server
//! - `openai` feature - OpenAI API and compatible endpoints
//!
//! # Example
//!
//! ```ignore
//! use studybot::llm::{ConfigBasedLLMFactory, LLMClientFactoryTrait};
//!
//! let factory = ConfigBasedLLMFactory::from_config(&config)?;
//! let client = factory.create_default().await?;
//!
//! let answer = client.generate_with_system(STUDY_SYSTEM_PROMPT, "What is osmosis?").await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;
/// Google Gemini REST client.
pub mod gemini;
/// Registry for managing multiple LLM provider instances.
pub mod provider_registry;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{LLMClient, LLMClientFactory, LLMClientFactoryTrait, ModelParams, Provider};
pub use gemini::{GeminiClient, GeminiModelInfo};
pub use provider_registry::{ApiKeyStatus, ConfigBasedLLMFactory, ProviderRegistry};
