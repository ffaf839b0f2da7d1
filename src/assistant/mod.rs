//! The study assistant: history lookup, prompt construction, model call and
//! turn persistence for a single question.

use crate::db::ChatStore;
use crate::llm::{ApiKeyStatus, LLMClientFactoryTrait};
use crate::memory::{self, PromptStyle};
use crate::types::{AppError, ChatTurn, NewChatTurn, Result};
use crate::utils::toml_config::AssistantConfig;
use std::sync::Arc;

/// Behaviour knobs, usually taken from the `[assistant]` config section
#[derive(Debug, Clone)]
pub struct AssistantSettings {
    /// Model name from `[models]`
    pub model: String,
    pub system_prompt: String,
    pub history_limit: usize,
    pub max_history_limit: usize,
    pub prompt_style: PromptStyle,
    pub context_token_budget: usize,
    pub use_memory: bool,
}

impl From<&AssistantConfig> for AssistantSettings {
    fn from(config: &AssistantConfig) -> Self {
        Self {
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            history_limit: config.history_limit,
            max_history_limit: config.max_history_limit,
            prompt_style: config.prompt_style,
            context_token_budget: config.context_token_budget,
            use_memory: config.use_memory,
        }
    }
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self::from(&AssistantConfig::default())
    }
}

/// Result of answering one question
#[derive(Debug, Clone)]
pub struct StudyAnswer {
    pub response: String,
    /// Model that produced the answer
    pub model: String,
    pub history_turns_used: usize,
    /// False when the turn could not be stored (or memory is disabled)
    pub memory_saved: bool,
}

/// Snapshot of the assistant's dependencies, reported by `/health`
#[derive(Debug, Clone)]
pub struct AssistantStatus {
    pub database_connected: bool,
    pub database_backend: &'static str,
    pub api_key: ApiKeyStatus,
    pub model: String,
}

/// Answers study questions with per-user conversation memory
pub struct StudyAssistant {
    store: Arc<dyn ChatStore>,
    llm_factory: Arc<dyn LLMClientFactoryTrait>,
    settings: AssistantSettings,
}

impl StudyAssistant {
    pub fn new(
        store: Arc<dyn ChatStore>,
        llm_factory: Arc<dyn LLMClientFactoryTrait>,
        settings: AssistantSettings,
    ) -> Self {
        Self {
            store,
            llm_factory,
            settings,
        }
    }

    pub fn settings(&self) -> &AssistantSettings {
        &self.settings
    }

    /// Answer `message` for `user_id`, using and extending their history
    pub async fn ask(&self, user_id: &str, message: &str) -> Result<StudyAnswer> {
        let user_id = validate_non_empty(user_id, "user_id")?;
        if message.trim().is_empty() {
            return Err(AppError::InvalidInput("message must not be empty".to_string()));
        }

        let history = if self.settings.use_memory {
            self.load_context(user_id).await
        } else {
            Vec::new()
        };

        let client = self
            .llm_factory
            .create_for_model(&self.settings.model)
            .await?;

        let response = match self.settings.prompt_style {
            PromptStyle::Inline => {
                let prompt =
                    memory::build_inline_prompt(&memory::format_history(&history), message);
                client
                    .generate_with_system(&self.settings.system_prompt, &prompt)
                    .await?
            }
            PromptStyle::Turns => {
                let messages =
                    memory::build_turn_messages(&self.settings.system_prompt, &history, message);
                client
                    .generate_with_history(&memory::to_role_pairs(&messages))
                    .await?
            }
        };

        let memory_saved = if self.settings.use_memory {
            match self
                .store
                .save_turn(&NewChatTurn::now(user_id, message, &response))
                .await
            {
                Ok(id) => {
                    tracing::debug!(user_id, turn_id = %id, "Saved chat turn");
                    true
                }
                Err(e) => {
                    tracing::warn!(user_id, error = %e, "Failed to save chat turn");
                    false
                }
            }
        } else {
            false
        };

        Ok(StudyAnswer {
            response,
            model: client.model_name().to_string(),
            history_turns_used: history.len(),
            memory_saved,
        })
    }

    /// Earlier turns for the prompt; a failing store yields no context
    async fn load_context(&self, user_id: &str) -> Vec<ChatTurn> {
        if self.settings.history_limit == 0 {
            return Vec::new();
        }

        match self
            .store
            .recent_turns(user_id, self.settings.history_limit)
            .await
        {
            Ok(turns) => {
                memory::truncate_turns_to_tokens(&turns, self.settings.context_token_budget)
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to load chat history, answering without context");
                Vec::new()
            }
        }
    }

    /// The newest turns of a user, oldest first
    ///
    /// `None` uses the configured history limit. Zero is rejected and values
    /// above the maximum are clamped.
    pub async fn history(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<ChatTurn>> {
        let user_id = validate_non_empty(user_id, "user_id")?;
        let limit = self.effective_limit(limit)?;
        self.store.recent_turns(user_id, limit).await
    }

    fn effective_limit(&self, limit: Option<usize>) -> Result<usize> {
        match limit {
            Some(0) => Err(AppError::InvalidInput(
                "limit must be at least 1".to_string(),
            )),
            Some(n) => Ok(n.min(self.settings.max_history_limit)),
            None => Ok(self.settings.history_limit.max(1)),
        }
    }

    /// Delete all turns of a user
    pub async fn clear_history(&self, user_id: &str) -> Result<u64> {
        let user_id = validate_non_empty(user_id, "user_id")?;
        let deleted = self.store.clear_user(user_id).await?;
        tracing::info!(user_id, deleted, "Cleared chat history");
        Ok(deleted)
    }

    /// Connectivity and credential status of the assistant's dependencies
    pub async fn status(&self, api_key: ApiKeyStatus) -> AssistantStatus {
        let database_connected = match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "History store is unreachable");
                false
            }
        };

        AssistantStatus {
            database_connected,
            database_backend: self.store.backend_name(),
            api_key,
            model: self.settings.model.clone(),
        }
    }
}

fn validate_non_empty<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AppError::InvalidInput(format!("{} must not be empty", field)))
    } else {
        Ok(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TursoClient;
    use crate::llm::LLMClient;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Records every prompt it receives
    #[derive(Clone, Default)]
    struct RecordingClient {
        prompts: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl LLMClient for RecordingClient {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().push(prompt.to_string());
            Ok("answer".to_string())
        }

        async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
            self.generate(prompt).await
        }

        async fn generate_with_history(&self, messages: &[(String, String)]) -> Result<String> {
            let joined: Vec<String> = messages
                .iter()
                .map(|(role, content)| format!("{}={}", role, content))
                .collect();
            self.generate(&joined.join("|")).await
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    struct RecordingFactory {
        client: RecordingClient,
    }

    #[async_trait]
    impl LLMClientFactoryTrait for RecordingFactory {
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

    async fn assistant(settings: AssistantSettings) -> (StudyAssistant, RecordingClient) {
        let store = Arc::new(TursoClient::new_memory().await.unwrap());
        let client = RecordingClient::default();
        let factory = Arc::new(RecordingFactory {
            client: client.clone(),
        });
        (StudyAssistant::new(store, factory, settings), client)
    }

    #[tokio::test]
    async fn test_second_question_sees_first_turn() {
        let (assistant, client) = assistant(AssistantSettings::default()).await;

        let first = assistant.ask("ana", "What is DNA?").await.unwrap();
        assert_eq!(first.history_turns_used, 0);
        assert!(first.memory_saved);

        let second = assistant.ask("ana", "And RNA?").await.unwrap();
        assert_eq!(second.history_turns_used, 1);

        let prompts = client.prompts.lock();
        assert_eq!(prompts[0], "What is DNA?");
        assert_eq!(
            prompts[1],
            "Previous conversation:\nUser: What is DNA?\nAssistant: answer\n\nCurrent question: And RNA?"
        );
    }

    #[tokio::test]
    async fn test_turn_style_sends_messages() {
        let settings = AssistantSettings {
            prompt_style: PromptStyle::Turns,
            system_prompt: "sys".to_string(),
            ..AssistantSettings::default()
        };
        let (assistant, client) = assistant(settings).await;

        assistant.ask("ana", "q1").await.unwrap();
        assistant.ask("ana", "q2").await.unwrap();

        let prompts = client.prompts.lock();
        assert_eq!(
            prompts[1],
            "system=sys|user=q1|assistant=answer|user=q2"
        );
    }

    #[tokio::test]
    async fn test_memory_disabled_neither_reads_nor_writes() {
        let settings = AssistantSettings {
            use_memory: false,
            ..AssistantSettings::default()
        };
        let (assistant, _client) = assistant(settings).await;

        let answer = assistant.ask("ana", "q").await.unwrap();
        assert!(!answer.memory_saved);
        assert!(assistant.history("ana", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_blank_input() {
        let (assistant, _client) = assistant(AssistantSettings::default()).await;
        assert!(matches!(
            assistant.ask("  ", "q").await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            assistant.ask("ana", "\n").await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_history_limits() {
        let (assistant, _client) = assistant(AssistantSettings {
            max_history_limit: 3,
            history_limit: 2,
            ..AssistantSettings::default()
        })
        .await;
        for n in 0..5 {
            assistant.ask("ana", &format!("q{}", n)).await.unwrap();
        }

        assert_eq!(assistant.history("ana", None).await.unwrap().len(), 2);
        assert_eq!(assistant.history("ana", Some(100)).await.unwrap().len(), 3);
        assert!(matches!(
            assistant.history("ana", Some(0)).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_history() {
        let (assistant, _client) = assistant(AssistantSettings::default()).await;
        assistant.ask("ana", "q").await.unwrap();
        assert_eq!(assistant.clear_history("ana").await.unwrap(), 1);
        assert!(assistant.history("ana", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_reports_backend() {
        let (assistant, _client) = assistant(AssistantSettings::default()).await;
        let status = assistant.status(ApiKeyStatus::Available).await;
        assert!(status.database_connected);
        assert_eq!(status.database_backend, "memory");
        assert_eq!(status.model, "default");
    }
}
