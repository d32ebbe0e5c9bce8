use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use crate::{
    db::CollectionUpdate,
    error::AppResult,
    middleware::{RequestId, SignedInOwner},
    models::{AutoCollection, Collection, CollectionValue, Game},
    routes::AppState,
    services::{categorization, estimate_collection_value},
};

#[derive(Debug, Deserialize)]
pub struct GamesBody {
    pub games: Vec<Game>,
}

#[derive(Debug, Deserialize)]
pub struct NewCollection {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// POST /api/auto-collections
pub async fn auto_collections(Json(body): Json<GamesBody>) -> Json<Vec<AutoCollection>> {
    Json(categorization::auto_collections(&body.games))
}

/// POST /api/collection-value
pub async fn collection_value(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GamesBody>,
) -> Json<CollectionValue> {
    let value =
        estimate_collection_value(Arc::clone(&state.prices), &body.games, state.price_settings)
            .await;
    Json(value)
}

/// GET /api/users/:steam_id/collections
pub async fn list(
    State(state): State<Arc<AppState>>,
    SignedInOwner(owner): SignedInOwner,
) -> AppResult<Json<Vec<Collection>>> {
    Ok(Json(state.collections.list(&owner).await?))
}

/// POST /api/users/:steam_id/collections
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    SignedInOwner(owner): SignedInOwner,
    Json(body): Json<NewCollection>,
) -> AppResult<(StatusCode, Json<Collection>)> {
    let collection = state
        .collections
        .create(&owner, &body.name, body.color)
        .await?;

    tracing::debug!(request_id = %request_id, collection_id = %collection.id, "Collection created");

    Ok((StatusCode::CREATED, Json(collection)))
}

/// PATCH /api/users/:steam_id/collections/:id
pub async fn update(
    State(state): State<Arc<AppState>>,
    SignedInOwner(owner): SignedInOwner,
    Path((_, collection_id)): Path<(String, String)>,
    Json(update): Json<CollectionUpdate>,
) -> AppResult<Json<Collection>> {
    let collection = state
        .collections
        .update(&owner, &collection_id, update)
        .await?;
    Ok(Json(collection))
}

/// DELETE /api/users/:steam_id/collections/:id
pub async fn delete(
    State(state): State<Arc<AppState>>,
    SignedInOwner(owner): SignedInOwner,
    Path((_, collection_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    state.collections.delete(&owner, &collection_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/users/:steam_id/collections/:id/games/:appid
pub async fn add_game(
    State(state): State<Arc<AppState>>,
    SignedInOwner(owner): SignedInOwner,
    Path((_, collection_id, appid)): Path<(String, String, u32)>,
) -> AppResult<Json<Collection>> {
    let collection = state
        .collections
        .add_game(&owner, &collection_id, appid)
        .await?;
    Ok(Json(collection))
}

/// DELETE /api/users/:steam_id/collections/:id/games/:appid
pub async fn remove_game(
    State(state): State<Arc<AppState>>,
    SignedInOwner(owner): SignedInOwner,
    Path((_, collection_id, appid)): Path<(String, String, u32)>,
) -> AppResult<Json<Collection>> {
    let collection = state
        .collections
        .remove_game(&owner, &collection_id, appid)
        .await?;
    Ok(Json(collection))
}

/// GET /api/users/:steam_id/collections/:id/games
///
/// Fetches the owner's library, then resolves either an `auto-*` bucket or a custom collection.
pub async fn games(
    State(state): State<Arc<AppState>>,
    SignedInOwner(owner): SignedInOwner,
    Path((_, collection_id)): Path<(String, String)>,
) -> AppResult<Json<Vec<Game>>> {
    let library = state.library.owned_games(&owner).await?;
    let games = state
        .collections
        .games_in_collection(&owner, &collection_id, &library.games)
        .await?;
    Ok(Json(games))
}

/// GET /api/users/:steam_id/games/:appid/collections
pub async fn containing_game(
    State(state): State<Arc<AppState>>,
    SignedInOwner(owner): SignedInOwner,
    Path((_, appid)): Path<(String, u32)>,
) -> AppResult<Json<Vec<Collection>>> {
    Ok(Json(
        state.collections.collections_with_game(&owner, appid).await?,
    ))
}
