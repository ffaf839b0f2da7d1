use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============= API Request/Response Types =============

/// A question sent to the study assistant.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// Conversation key; every user has exactly one running conversation
    #[schema(example = "izza")]
    pub user_id: String,
    /// The study question
    #[schema(example = "What is photosynthesis?")]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub user_id: String,
    pub user_message: String,
    pub bot_response: String,
    pub status: String,
    /// Model that produced the answer
    pub model: String,
    /// Number of earlier turns that were given to the model as context
    pub history_turns_used: usize,
    /// False when the turn could not be written to the history store
    pub memory_saved: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryRequest {
    #[schema(example = "izza")]
    pub user_id: String,
    /// Number of most recent turns to return (defaults to 5)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 5)]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    pub user_id: String,
    /// Transcript formatted as `User: ...` / `Assistant: ...` lines
    pub history: String,
    /// The same turns in structured form, oldest first
    pub turns: Vec<ChatTurnDto>,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClearHistoryResponse {
    pub user_id: String,
    pub deleted: u64,
    pub status: String,
}

/// API view of a stored [`ChatTurn`].
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatTurnDto {
    pub id: String,
    pub user_message: String,
    pub bot_response: String,
    /// RFC3339 formatted timestamp
    pub timestamp: String,
}

impl From<ChatTurn> for ChatTurnDto {
    fn from(turn: ChatTurn) -> Self {
        Self {
            id: turn.id,
            user_message: turn.user_message,
            bot_response: turn.bot_response,
            timestamp: turn.timestamp.to_rfc3339(),
        }
    }
}

// ============= History Types =============

/// One stored question/answer exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: String,
    pub user_id: String,
    pub user_message: String,
    pub bot_response: String,
    pub timestamp: DateTime<Utc>,
}

/// A turn that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewChatTurn {
    pub user_id: String,
    pub user_message: String,
    pub bot_response: String,
    pub timestamp: DateTime<Utc>,
}

impl NewChatTurn {
    /// Create a turn stamped with the current time
    pub fn now(user_id: &str, user_message: &str, bot_response: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            user_message: user_message.to_string(),
            bot_response: bot_response.to_string(),
            timestamp: Utc::now(),
        }
    }
}

// ============= LLM Message Types =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::Database(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::LLM(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (axum::http::StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (axum::http::StatusCode::BAD_REQUEST, msg),
            AppError::Configuration(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Internal(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
