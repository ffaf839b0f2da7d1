use crate::{AppState, ProviderRegistry, llm::gemini::KNOWN_GEMINI_MODELS};
use axum::{Json, extract::State};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use utoipa::ToSchema;

const SERVICE_NAME: &str = "Study Bot API";

/// Liveness and dependency status
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `healthy` while the process answers
    pub api_status: String,
    /// `connected` or `disconnected`
    pub database: String,
    pub database_backend: String,
    /// `available`, `missing` or `not_required`
    pub api_key: String,
    pub model: String,
    /// RFC3339 server time
    pub timestamp: String,
    pub server: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ModelsResponse {
    pub current_model: String,
    /// Gemini models the service knows how to use
    pub available_models: Vec<String>,
    /// Configured model names mapped to provider model identifiers
    pub configured_models: BTreeMap<String, String>,
    pub note: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TestResponse {
    pub message: String,
    pub status: String,
}

/// Model identifier of the assistant's configured model
fn current_model_id(state: &AppState) -> String {
    let config = state.config_manager.config();
    let registry = ProviderRegistry::from_config(&config);
    registry
        .model_id(&config.assistant.model)
        .unwrap_or(&config.assistant.model)
        .to_string()
}

/// Welcome message with an endpoint map
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Welcome message and endpoint map", body = Object)),
    tag = "system"
)]
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to Study Bot API! 🎓",
        "description": "AI-powered study assistant with conversation memory",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /": "This welcome message",
            "GET /health": "Service and dependency status",
            "GET /info": "API information",
            "GET /models": "Available models",
            "GET /test": "Connectivity test",
            "POST /chat": "Ask a study question",
            "POST /history": "Get a user's recent conversation",
            "DELETE /history/{user_id}": "Delete a user's conversation",
            "GET /openapi.json": "OpenAPI document",
            "GET /docs": "Interactive API documentation (swagger-ui builds)"
        },
        "usage": {
            "chat": {"user_id": "your_name", "message": "What is photosynthesis?"},
            "history": {"user_id": "your_name", "limit": 5}
        }
    }))
}

/// Service and dependency status
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Health report", body = HealthResponse)),
    tag = "system"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let config = state.config_manager.config();
    let api_key = state
        .provider_registry()
        .api_key_status(&config.assistant.model);
    let status = state.assistant().status(api_key).await;

    Json(HealthResponse {
        api_status: "healthy".to_string(),
        database: if status.database_connected {
            "connected"
        } else {
            "disconnected"
        }
        .to_string(),
        database_backend: status.database_backend.to_string(),
        api_key: status.api_key.as_str().to_string(),
        model: current_model_id(&state),
        timestamp: chrono::Utc::now().to_rfc3339(),
        server: "running".to_string(),
    })
}

/// API information
#[utoipa::path(
    get,
    path = "/info",
    responses((status = 200, description = "API information", body = Object)),
    tag = "system"
)]
pub async fn info(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "description": "AI study assistant with conversation memory",
        "framework": "axum",
        "model": current_model_id(&state),
        "database": state.store.backend_name(),
        "documentation": {
            "openapi": "/openapi.json",
            "swagger_ui": "/docs"
        }
    }))
}

/// Models the assistant can use
#[utoipa::path(
    get,
    path = "/models",
    responses((status = 200, description = "Current and available models", body = ModelsResponse)),
    tag = "system"
)]
pub async fn models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let registry = state.provider_registry();
    let configured_models = registry
        .model_names()
        .into_iter()
        .filter_map(|name| {
            registry
                .model_id(name)
                .map(|id| (name.to_string(), id.to_string()))
        })
        .collect();

    Json(ModelsResponse {
        current_model: current_model_id(&state),
        available_models: KNOWN_GEMINI_MODELS.iter().map(|m| m.to_string()).collect(),
        configured_models,
        note: "Run `studybot-server models` to list every model your API key can access"
            .to_string(),
    })
}

/// Connectivity test
#[utoipa::path(
    get,
    path = "/test",
    responses((status = 200, description = "API is reachable", body = TestResponse)),
    tag = "system"
)]
pub async fn test_endpoint() -> Json<TestResponse> {
    Json(TestResponse {
        message: "API is working!".to_string(),
        status: "ok".to_string(),
    })
}
