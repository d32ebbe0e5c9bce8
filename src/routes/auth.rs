use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use url::{form_urlencoded, Url};

use crate::{
    config::Config,
    error::{AppError, AppResult},
    middleware::{RequestId, SignedInOwner},
    models::SteamProfile,
    routes::AppState,
};

const CALLBACK_PATH: &str = "/api/auth/steam/callback";

/// Stand-in origin used to check that a redirect target stays on this origin
const REDIRECT_CHECK_ORIGIN: &str = "http://dashboard.invalid/";

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    redirect: Option<String>,
}

/// GET /api/auth/steam
///
/// Sends the browser to Steam. A relative `redirect` path is carried through
/// `return_to` so the callback can send the user back where they started.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Query(params): Query<LoginQuery>,
) -> AppResult<Response> {
    let base = public_base_url(&state.config, &headers);

    let mut return_to = format!("{}{}", base, CALLBACK_PATH);
    if let Some(target) = params.redirect.as_deref().and_then(safe_redirect) {
        return_to = format!(
            "{}?{}",
            return_to,
            form_urlencoded::Serializer::new(String::new())
                .append_pair("redirect", target)
                .finish()
        );
    }

    let login_url = state.openid.login_url(&return_to, &base)?;

    tracing::info!(request_id = %request_id, realm = %base, "Redirecting to Steam login");

    see_other(&login_url)
}

/// GET /api/auth/steam/callback
///
/// Verifies the assertion, stores the signed-in profile, issues a session token
/// and redirects with the profile JSON in `steamAuth` and the token in `sessionToken`.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<HashMap<String, String>>,
) -> AppResult<Response> {
    let steam_id = state.openid.verify(&query).await?;
    let profile = state.library.player_summary(&steam_id).await?;
    state.identities.save(&profile).await?;
    let token = state.identities.start_session(&steam_id).await?;

    let target = query
        .get("redirect")
        .and_then(|r| safe_redirect(r))
        .unwrap_or("/");

    let payload = serde_json::to_string(&profile)
        .map_err(|e| AppError::Internal(format!("Failed to encode profile: {}", e)))?;
    let encoded = form_urlencoded::Serializer::new(String::new())
        .append_pair("steamAuth", &payload)
        .append_pair("sessionToken", &token)
        .finish();
    let separator = if target.contains('?') { '&' } else { '?' };

    tracing::info!(request_id = %request_id, steam_id = %steam_id, "Steam sign-in complete");

    see_other(&format!("{}{}{}", target, separator, encoded))
}

/// GET /api/auth/session/:steam_id
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    SignedInOwner(steam_id): SignedInOwner,
) -> AppResult<Json<SteamProfile>> {
    let profile = state
        .identities
        .load(&steam_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No session for {}", steam_id)))?;

    Ok(Json(profile))
}

/// DELETE /api/auth/session/:steam_id
///
/// Revokes every session of the account and forgets the stored profile.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    SignedInOwner(steam_id): SignedInOwner,
) -> AppResult<StatusCode> {
    let sessions = state.identities.end_sessions(&steam_id).await?;
    let removed = state.identities.delete(&steam_id).await?;

    tracing::info!(request_id = %request_id, steam_id = %steam_id, sessions, removed, "Logged out");

    Ok(StatusCode::NO_CONTENT)
}

/// Externally visible origin: configured `public_url`, else the forwarded scheme and Host header
fn public_base_url(config: &Config, headers: &HeaderMap) -> String {
    if let Some(url) = config
        .public_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
    {
        return url.trim_end_matches('/').to_string();
    }

    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}:{}", config.host, config.port));

    format!("{}://{}", proto, host)
}

/// Only same-origin absolute paths are allowed as post-login targets
///
/// Browsers drop tabs and newlines from URLs, so `/\t/evil.example` would become
/// `//evil.example`. Whitespace, control characters and backslashes are refused
/// outright, then the path must resolve without changing the origin.
fn safe_redirect(target: &str) -> Option<&str> {
    if !target.starts_with('/') || target.starts_with("//") {
        return None;
    }
    if target
        .chars()
        .any(|c| c.is_control() || c.is_whitespace() || c == '\\')
    {
        return None;
    }

    let origin = Url::parse(REDIRECT_CHECK_ORIGIN).ok()?;
    let resolved = origin.join(target).ok()?;
    (resolved.origin() == origin.origin()).then_some(target)
}

/// 303 to `location`, refusing values that cannot be sent as a header
fn see_other(location: &str) -> AppResult<Response> {
    let location = HeaderValue::from_str(location)
        .map_err(|_| AppError::InvalidInput("Redirect target is not a valid URL".to_string()))?;
    Ok((StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response())
}
