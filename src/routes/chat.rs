use std::sync::Arc;

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::{ChatRequest, ChatResponse},
    routes::AppState,
};

/// POST /api/chat
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let response = state.chat.reply(request).await?;
    Ok(Json(response))
}
