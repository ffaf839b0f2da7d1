use crate::{
    AppState,
    types::{ChatRequest, ChatResponse, Result},
};
use axum::{Json, extract::State};

/// Ask the study assistant a question
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Answer from the study assistant", body = ChatResponse),
        (status = 400, description = "Empty user_id or message"),
        (status = 500, description = "Model or configuration error")
    ),
    tag = "chat"
)]
pub async fn chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let answer = state
        .assistant()
        .ask(&payload.user_id, &payload.message)
        .await?;

    // Turns are stored under the trimmed id
    let user_id = payload.user_id.trim().to_string();

    tracing::info!(
        user_id = %user_id,
        model = %answer.model,
        history_turns = answer.history_turns_used,
        "Answered study question"
    );

    Ok(Json(ChatResponse {
        user_id,
        user_message: payload.message,
        bot_response: answer.response,
        status: "success".to_string(),
        model: answer.model,
        history_turns_used: answer.history_turns_used,
        memory_saved: answer.memory_saved,
    }))
}
