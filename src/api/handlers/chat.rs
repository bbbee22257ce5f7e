use crate::{
    types::{ChatRequest, ChatResponse, Result},
    AppState,
};
use axum::{extract::State, Json};

/// Chat with the finance assistant.
pub async fn chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let message = state
        .invoker
        .invoke(&payload.user_id, &payload.user_name, &payload.message)
        .await?;

    Ok(Json(ChatResponse { message }))
}
