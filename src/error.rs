use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Invalid OpenID assertion: {0}")]
    InvalidAssertion(String),

    #[error("Steam rejected the OpenID assertion")]
    AssertionRejected,

    #[error("Could not extract Steam ID from claimed identifier: {0}")]
    IdentifierExtractionFailed(String),

    #[error("Invalid Steam ID or profile URL: {0}")]
    InvalidIdentifierFormat(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not signed in: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable cause code returned alongside the message
    pub fn cause(&self) -> &'static str {
        match self {
            AppError::InvalidAssertion(_) => "invalid_assertion",
            AppError::AssertionRejected => "assertion_rejected",
            AppError::IdentifierExtractionFailed(_) => "identifier_extraction_failed",
            AppError::InvalidIdentifierFormat(_) => "invalid_identifier_format",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::ServiceUnavailable(_) => "service_unavailable",
            AppError::NotFound(_) => "not_found",
            AppError::Upstream(_) | AppError::HttpClient(_) => "upstream_error",
            AppError::Cache(_) | AppError::Storage(_) | AppError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidAssertion(_)
            | AppError::IdentifierExtractionFailed(_)
            | AppError::InvalidIdentifierFormat(_)
            | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::AssertionRejected | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
            AppError::Cache(_) | AppError::Storage(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, cause = self.cause(), "Request failed");
        } else {
            tracing::debug!(error = %self, cause = self.cause(), "Request rejected");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "cause": self.cause(),
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_errors_map_to_client_statuses() {
        assert_eq!(
            AppError::InvalidAssertion("mode".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::AssertionRejected.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Unauthorized("token".to_string()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Forbidden("owner".to_string()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::IdentifierExtractionFailed("x".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_fetch_errors_map_to_distinct_statuses() {
        assert_eq!(
            AppError::ServiceUnavailable("key".to_string()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::NotFound("player".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Upstream("boom".to_string()).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_cause_codes() {
        assert_eq!(AppError::AssertionRejected.cause(), "assertion_rejected");
        assert_eq!(
            AppError::InvalidIdentifierFormat("?".to_string()).cause(),
            "invalid_identifier_format"
        );
        assert_eq!(AppError::Storage("io".to_string()).cause(), "internal");
    }
}
