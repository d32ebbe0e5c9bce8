use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, patch, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};

pub mod auth;
pub mod chat;
pub mod collections;
pub mod recommendations;
pub mod state;
pub mod steam;

pub use state::AppState;

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
}

/// API routes under /api
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Sign-in
        .route("/auth/steam", get(auth::login))
        .route("/auth/steam/callback", get(auth::callback))
        .route(
            "/auth/session/:steam_id",
            get(auth::get_session).delete(auth::logout),
        )
        // Steam Web API
        .route("/steam/games", get(steam::owned_games))
        .route("/steam/user", get(steam::player_summary))
        .route("/steam/resolve", get(steam::resolve_vanity))
        .route("/steam/identify", get(steam::identify))
        // Library views
        .route("/auto-collections", post(collections::auto_collections))
        .route("/collection-value", post(collections::collection_value))
        .route(
            "/users/:steam_id/collections",
            get(collections::list).post(collections::create),
        )
        .route(
            "/users/:steam_id/collections/:id",
            patch(collections::update).delete(collections::delete),
        )
        .route(
            "/users/:steam_id/collections/:id/games",
            get(collections::games),
        )
        .route(
            "/users/:steam_id/collections/:id/games/:appid",
            put(collections::add_game).delete(collections::remove_game),
        )
        .route(
            "/users/:steam_id/games/:appid/collections",
            get(collections::containing_game),
        )
        // Language model
        .route("/recommendations", post(recommendations::recommend))
        .route("/chat", post(chat::chat))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
