use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{OwnedGames, SteamId, SteamProfile},
    routes::AppState,
    services::providers::resolve_identifier,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SteamIdQuery {
    steam_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VanityQuery {
    vanityurl: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IdentifyQuery {
    input: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedId {
    pub success: bool,
    pub steam_id: SteamId,
}

fn required(value: Option<String>, what: &str) -> AppResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::InvalidInput(format!("{} is required", what)))
}

/// GET /api/steam/games?steamId=
///
/// Accepts a SteamID64, a profile URL or a custom profile name.
pub async fn owned_games(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<SteamIdQuery>,
) -> AppResult<Json<OwnedGames>> {
    let input = required(params.steam_id, "Steam ID")?;
    let steam_id = resolve_identifier(state.library.as_ref(), &input).await?;

    tracing::debug!(request_id = %request_id, steam_id = %steam_id, "Fetching owned games");

    let owned = state.library.owned_games(&steam_id).await?;
    Ok(Json(owned))
}

/// GET /api/steam/user?steamId=
pub async fn player_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SteamIdQuery>,
) -> AppResult<Json<SteamProfile>> {
    let input = required(params.steam_id, "Steam ID")?;
    let steam_id = resolve_identifier(state.library.as_ref(), &input).await?;

    let profile = state.library.player_summary(&steam_id).await?;
    Ok(Json(profile))
}

/// GET /api/steam/resolve?vanityurl=
pub async fn resolve_vanity(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VanityQuery>,
) -> AppResult<Json<ResolvedId>> {
    let vanity = required(params.vanityurl, "Vanity URL")?;
    let steam_id = state.library.resolve_vanity(&vanity).await?;

    Ok(Json(ResolvedId {
        success: true,
        steam_id,
    }))
}

/// GET /api/steam/identify?input=
///
/// Normalizes whatever the user pasted into a SteamID64.
pub async fn identify(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IdentifyQuery>,
) -> AppResult<Json<ResolvedId>> {
    let input = required(params.input, "Input")?;
    let steam_id = resolve_identifier(state.library.as_ref(), &input).await?;

    Ok(Json(ResolvedId {
        success: true,
        steam_id,
    }))
}
