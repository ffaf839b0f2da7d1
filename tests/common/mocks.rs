//! Mock implementations for testing.
//!
//! This module provides mock LLM clients, factories and history stores that
//! can be used across different test files without duplication.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use studybot::db::ChatStore;
use studybot::llm::{LLMClient, LLMClientFactoryTrait};
use studybot::types::{AppError, ChatTurn, NewChatTurn, Result};

/// Mock LLM client with a fixed response.
///
/// Every prompt it receives is recorded so tests can check what the
/// assistant sent.
///
/// # Examples
///
/// ```
/// use tests::common::mocks::MockLLMClient;
///
/// // Create a client that returns a simple response
/// let client = MockLLMClient::new("Photosynthesis converts light into chemical energy.");
///
/// // Create a client that always fails
/// let client = MockLLMClient::failing();
/// ```
#[derive(Clone)]
pub struct MockLLMClient {
    response: String,
    should_fail: bool,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockLLMClient {
    /// Create a new mock client that returns the given response.
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            should_fail: false,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new("")
        }
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    fn answer(&self, prompt: String) -> Result<String> {
        self.prompts.lock().push(prompt);
        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }
        Ok(self.response.clone())
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.answer(prompt.to_string())
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.answer(prompt.to_string())
    }

    async fn generate_with_history(&self, messages: &[(String, String)]) -> Result<String> {
        let rendered: Vec<String> = messages
            .iter()
            .map(|(role, content)| format!("{}: {}", role, content))
            .collect();
        self.answer(rendered.join("\n"))
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Mock LLM factory for tests requiring complete isolation from external services.
///
/// Always hands out clones of one `MockLLMClient`, so prompt recording is
/// shared between the factory's clients and the test.
pub struct MockLLMFactory {
    client: MockLLMClient,
}

impl MockLLMFactory {
    /// Create a new mock factory that returns the given mock client.
    pub fn new(client: MockLLMClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LLMClientFactoryTrait for MockLLMFactory {
    fn default_model(&self) -> String {
        "default".to_string()
    }

    async fn create_default(&self) -> Result<Box<dyn LLMClient>> {
        Ok(Box::new(self.client.clone()))
    }

    async fn create_for_model(&self, _model_name: &str) -> Result<Box<dyn LLMClient>> {
        Ok(Box::new(self.client.clone()))
    }
}

/// History store whose every operation fails, as an unreachable database would.
pub struct FailingStore;

#[async_trait]
impl ChatStore for FailingStore {
    fn backend_name(&self) -> &'static str {
        "failing"
    }

    async fn ping(&self) -> Result<()> {
        Err(AppError::Database("connection refused".to_string()))
    }

    async fn save_turn(&self, _turn: &NewChatTurn) -> Result<String> {
        Err(AppError::Database("connection refused".to_string()))
    }

    async fn recent_turns(&self, _user_id: &str, _limit: usize) -> Result<Vec<ChatTurn>> {
        Err(AppError::Database("connection refused".to_string()))
    }

    async fn count_turns(&self, _user_id: &str) -> Result<u64> {
        Err(AppError::Database("connection refused".to_string()))
    }

    async fn clear_user(&self, _user_id: &str) -> Result<u64> {
        Err(AppError::Database("connection refused".to_string()))
    }
}
