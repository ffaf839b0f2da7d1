//! HTTP API Handlers and Routes
//!
//! This module provides the REST API layer for Study Bot, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Chat
//! - `POST /chat` - Ask a question; the answer uses and extends the user's history
//!
//! ## History
//! - `POST /history` - Most recent turns of a user
//! - `DELETE /history/{user_id}` - Delete a user's history
//!
//! ## System
//! - `GET /` - Welcome message and endpoint map
//! - `GET /health` - Database and API key status
//! - `GET /info` - API information
//! - `GET /models` - Current and available models
//! - `GET /test` - Connectivity test
//!
//! # OpenAPI Documentation
//!
//! The OpenAPI document is served at `/openapi.json`. When the `swagger-ui`
//! feature is enabled, interactive documentation is available at `/docs`.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

use utoipa::OpenApi;

/// OpenAPI document for every public endpoint
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Study Bot API",
        description = "AI-powered study assistant with conversation memory"
    ),
    paths(
        handlers::system::root,
        handlers::system::health,
        handlers::system::info,
        handlers::system::models,
        handlers::system::test_endpoint,
        handlers::chat::chat,
        handlers::history::get_history,
        handlers::history::clear_history,
    ),
    components(schemas(
        crate::types::ChatRequest,
        crate::types::ChatResponse,
        crate::types::HistoryRequest,
        crate::types::HistoryResponse,
        crate::types::ChatTurnDto,
        crate::types::ClearHistoryResponse,
        handlers::system::HealthResponse,
        handlers::system::ModelsResponse,
        handlers::system::TestResponse,
    )),
    tags(
        (name = "chat", description = "Question answering"),
        (name = "history", description = "Conversation history"),
        (name = "system", description = "Service information and status")
    )
)]
pub struct ApiDoc;
