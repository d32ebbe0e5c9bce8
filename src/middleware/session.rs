use std::{collections::HashMap, sync::Arc};

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::{header, request::Parts, HeaderMap},
};

use crate::{
    error::AppError,
    models::SteamId,
    routes::AppState,
};

/// Path parameter naming the account a per-user route acts on
const OWNER_PARAM: &str = "steam_id";

/// The `:steam_id` of the route, proven by a bearer session token issued to that account
///
/// Missing or unknown tokens are rejected with 401; a token belonging to another
/// account is rejected with 403.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInOwner(pub SteamId);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for SignedInOwner {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
        let owner = params
            .get(OWNER_PARAM)
            .ok_or_else(|| AppError::Internal("Route has no :steam_id parameter".to_string()))?;
        let owner = SteamId::parse(owner)?;

        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Missing session token".to_string()))?;

        let session_owner = state
            .identities
            .session_owner(token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Unknown or expired session".to_string()))?;

        if session_owner != owner {
            tracing::warn!(owner = %owner, caller = %session_owner, "Session used for another account");
            return Err(AppError::Forbidden(format!(
                "Session does not belong to {}",
                owner
            )));
        }

        Ok(Self(owner))
    }
}

/// Token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(bearer_token(&headers), None);
    }
}
