//! Study assistant integration tests
//!
//! Covers degraded operation against an unreachable store, the context token
//! budget, and a full question round trip through the configured Gemini
//! provider against a mocked API.

mod common;

use common::mocks::{FailingStore, MockLLMClient, MockLLMFactory};
use serde_json::json;
use std::sync::Arc;
use studybot::db::{ChatStore, TursoClient};
use studybot::memory::PromptStyle;
use studybot::types::{AppError, NewChatTurn};
use studybot::utils::toml_config::{ProviderConfig, StudyBotConfig};
use studybot::{AssistantSettings, ConfigBasedLLMFactory, StudyAssistant};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_assistant(
    store: Arc<dyn ChatStore>,
    client: &MockLLMClient,
    settings: AssistantSettings,
) -> StudyAssistant {
    StudyAssistant::new(
        store,
        Arc::new(MockLLMFactory::new(client.clone())),
        settings,
    )
}

// ============= Degraded Store =============

#[tokio::test]
async fn test_unreachable_store_still_answers() {
    let client = MockLLMClient::new("An answer without memory.");
    let assistant = mock_assistant(Arc::new(FailingStore), &client, AssistantSettings::default());

    let answer = assistant.ask("izza", "What is gravity?").await.unwrap();

    assert_eq!(answer.response, "An answer without memory.");
    assert_eq!(answer.history_turns_used, 0);
    assert!(!answer.memory_saved);
    // No history section when nothing could be loaded
    assert_eq!(client.prompts(), ["What is gravity?"]);
}

#[tokio::test]
async fn test_unreachable_store_fails_history_reads() {
    let client = MockLLMClient::new("unused");
    let assistant = mock_assistant(Arc::new(FailingStore), &client, AssistantSettings::default());

    assert!(matches!(
        assistant.history("izza", None).await,
        Err(AppError::Database(_))
    ));
    assert!(matches!(
        assistant.clear_history("izza").await,
        Err(AppError::Database(_))
    ));

    let status = assistant.status(studybot::ApiKeyStatus::Available).await;
    assert!(!status.database_connected);
}

#[tokio::test]
async fn test_llm_failure_does_not_save_turn() {
    let store = Arc::new(TursoClient::new_memory().await.unwrap());
    let client = MockLLMClient::failing();
    let assistant = mock_assistant(store.clone(), &client, AssistantSettings::default());

    assert!(matches!(
        assistant.ask("izza", "What is DNA?").await,
        Err(AppError::LLM(_))
    ));
    assert_eq!(store.count_turns("izza").await.unwrap(), 0);
}

// ============= Context Window =============

#[tokio::test]
async fn test_history_limit_bounds_context() {
    let store = Arc::new(TursoClient::new_memory().await.unwrap());
    for n in 1..=8 {
        store
            .save_turn(&NewChatTurn::now("izza", &format!("q{}", n), &format!("a{}", n)))
            .await
            .unwrap();
    }

    let client = MockLLMClient::new("ok");
    let settings = AssistantSettings {
        history_limit: 3,
        ..AssistantSettings::default()
    };
    let answer = mock_assistant(store, &client, settings)
        .ask("izza", "next")
        .await
        .unwrap();

    assert_eq!(answer.history_turns_used, 3);
    let prompt = &client.prompts()[0];
    assert!(!prompt.contains("User: q5\n"));
    assert!(prompt.contains("User: q6\nAssistant: a6\nUser: q7\nAssistant: a7\nUser: q8\nAssistant: a8"));
}

#[tokio::test]
async fn test_token_budget_drops_oldest_turns() {
    let store = Arc::new(TursoClient::new_memory().await.unwrap());
    let long_answer = "x".repeat(400); // ~100 tokens
    for n in 1..=4 {
        store
            .save_turn(&NewChatTurn::now("izza", &format!("q{}", n), &long_answer))
            .await
            .unwrap();
    }

    let client = MockLLMClient::new("ok");
    let settings = AssistantSettings {
        context_token_budget: 250,
        ..AssistantSettings::default()
    };
    let answer = mock_assistant(store, &client, settings)
        .ask("izza", "next")
        .await
        .unwrap();

    assert_eq!(answer.history_turns_used, 2);
    let prompt = &client.prompts()[0];
    assert!(!prompt.contains("User: q2\n"));
    assert!(prompt.contains("User: q3\n"));
    assert!(prompt.contains("User: q4\n"));
}

#[tokio::test]
async fn test_turn_style_renders_roles() {
    let store = Arc::new(TursoClient::new_memory().await.unwrap());
    let client = MockLLMClient::new("a1");
    let settings = AssistantSettings {
        prompt_style: PromptStyle::Turns,
        system_prompt: "Be a tutor.".to_string(),
        ..AssistantSettings::default()
    };
    let assistant = mock_assistant(store, &client, settings);

    assistant.ask("izza", "q1").await.unwrap();
    assistant.ask("izza", "q2").await.unwrap();

    assert_eq!(
        client.prompts()[1],
        "system: Be a tutor.\nuser: q1\nassistant: a1\nuser: q2"
    );
}

// ============= Full Stack =============

fn gemini_config(api_base: &str, key_env: &str) -> StudyBotConfig {
    let mut config = StudyBotConfig::default();
    config.providers.insert(
        "gemini".to_string(),
        ProviderConfig::Gemini {
            api_key_env: key_env.to_string(),
            api_base: api_base.to_string(),
            default_model: "gemini-2.5-flash".to_string(),
        },
    );
    config
}

#[tokio::test]
async fn test_round_trip_through_gemini_provider() {
    let server = MockServer::start().await;
    std::env::set_var("STUDYBOT_ASSISTANT_TEST_KEY", "round-trip-key");

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .and(header("x-goog-api-key", "round-trip-key"))
        .and(body_string_contains("with their academic questions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Mitochondria make ATP." }] },
                "finishReason": "STOP"
            }]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let config = gemini_config(&server.uri(), "STUDYBOT_ASSISTANT_TEST_KEY");
    let store = Arc::new(TursoClient::new_memory().await.unwrap());
    let assistant = StudyAssistant::new(
        store.clone(),
        Arc::new(ConfigBasedLLMFactory::from_config(&config).unwrap()),
        AssistantSettings::from(&config.assistant),
    );

    let first = assistant.ask("izza", "What do mitochondria do?").await.unwrap();
    assert_eq!(first.response, "Mitochondria make ATP.");
    assert_eq!(first.model, "gemini-2.5-flash");
    assert!(first.memory_saved);

    let second = assistant.ask("izza", "And ribosomes?").await.unwrap();
    assert_eq!(second.history_turns_used, 1);
    assert_eq!(store.count_turns("izza").await.unwrap(), 2);
}

#[tokio::test]
async fn test_missing_api_key_is_configuration_error() {
    let config = gemini_config("http://127.0.0.1:9", "STUDYBOT_ASSISTANT_TEST_KEY_UNSET");
    let store = Arc::new(TursoClient::new_memory().await.unwrap());
    let assistant = StudyAssistant::new(
        store.clone(),
        Arc::new(ConfigBasedLLMFactory::from_config(&config).unwrap()),
        AssistantSettings::from(&config.assistant),
    );

    let err = assistant.ask("izza", "hello").await.unwrap_err();
    match err {
        AppError::Configuration(msg) => {
            assert!(msg.contains("STUDYBOT_ASSISTANT_TEST_KEY_UNSET"), "{}", msg)
        }
        other => panic!("Expected configuration error, got {:?}", other),
    }
    assert_eq!(store.count_turns("izza").await.unwrap(), 0);
}
