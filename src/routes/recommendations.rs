use std::sync::Arc;

use axum::{extract::State, Extension, Json};

use crate::{
    middleware::RequestId,
    models::{RecommendationRequest, RecommendationResult},
    routes::AppState,
};

/// POST /api/recommendations
///
/// Always answers 200: generator failures degrade to local picks.
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RecommendationRequest>,
) -> Json<RecommendationResult> {
    tracing::debug!(
        request_id = %request_id,
        games = request.games.len(),
        mood = request.preferences.mood.as_str(),
        "Building recommendations"
    );

    let result = state
        .recommender
        .recommend(&request.games, &request.preferences)
        .await;
    Json(result)
}
