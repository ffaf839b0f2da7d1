use crate::{
    AppState,
    memory::{NO_HISTORY_MESSAGE, format_history},
    types::{ChatTurnDto, ClearHistoryResponse, HistoryRequest, HistoryResponse, Result},
};
use axum::{
    Json,
    extract::{Path, State},
};

/// Get a user's recent conversation
#[utoipa::path(
    post,
    path = "/history",
    request_body = HistoryRequest,
    responses(
        (status = 200, description = "Most recent turns, oldest first", body = HistoryResponse),
        (status = 400, description = "Empty user_id or limit of zero"),
        (status = 500, description = "History store error")
    ),
    tag = "history"
)]
pub async fn get_history(
    State(state): State<AppState>,
    Json(payload): Json<HistoryRequest>,
) -> Result<Json<HistoryResponse>> {
    let limit = payload.limit.map(|l| l as usize);
    let turns = state.assistant().history(&payload.user_id, limit).await?;

    let history = if turns.is_empty() {
        NO_HISTORY_MESSAGE.to_string()
    } else {
        format_history(&turns)
    };

    Ok(Json(HistoryResponse {
        user_id: payload.user_id.trim().to_string(),
        history,
        turns: turns.into_iter().map(ChatTurnDto::from).collect(),
        status: "success".to_string(),
    }))
}

/// Delete a user's conversation
#[utoipa::path(
    delete,
    path = "/history/{user_id}",
    params(
        ("user_id" = String, Path, description = "User whose history is removed")
    ),
    responses(
        (status = 200, description = "History deleted", body = ClearHistoryResponse),
        (status = 500, description = "History store error")
    ),
    tag = "history"
)]
pub async fn clear_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ClearHistoryResponse>> {
    let deleted = state.assistant().clear_history(&user_id).await?;

    Ok(Json(ClearHistoryResponse {
        user_id: user_id.trim().to_string(),
        deleted,
        status: "success".to_string(),
    }))
}
