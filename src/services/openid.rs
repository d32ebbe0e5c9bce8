//! Steam OpenID 2.0 relying party
//!
//! Flow:
//! 1. `login_url` sends the browser to Steam with `checkid_setup`.
//! 2. Steam redirects back with an `id_res` assertion in the query string.
//! 3. `verify` echoes every `openid.*` field back with `check_authentication`
//!    and only trusts `openid.claimed_id` once Steam answers `is_valid:true`.

use std::{collections::HashMap, sync::LazyLock, time::Duration};

use regex::Regex;
use reqwest::Client as HttpClient;
use url::Url;

use crate::{
    error::{AppError, AppResult},
    models::SteamId,
};

const OPENID_NS: &str = "http://specs.openid.net/auth/2.0";
const IDENTIFIER_SELECT: &str = "http://specs.openid.net/auth/2.0/identifier_select";

static CLAIMED_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://steamcommunity\.com/openid/id/(\d+)/?$").expect("valid regex")
});

#[derive(Clone)]
pub struct SteamOpenId {
    http_client: HttpClient,
    endpoint: String,
}

impl SteamOpenId {
    pub fn new(endpoint: String, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            endpoint,
        })
    }

    /// URL of the Steam sign-in page for this relying party
    pub fn login_url(&self, return_to: &str, realm: &str) -> AppResult<String> {
        let url = Url::parse_with_params(
            &self.endpoint,
            &[
                ("openid.ns", OPENID_NS),
                ("openid.mode", "checkid_setup"),
                ("openid.return_to", return_to),
                ("openid.realm", realm),
                ("openid.identity", IDENTIFIER_SELECT),
                ("openid.claimed_id", IDENTIFIER_SELECT),
            ],
        )
        .map_err(|e| AppError::Internal(format!("Invalid OpenID endpoint: {}", e)))?;

        Ok(url.into())
    }

    /// Confirms an assertion with Steam and returns the signed-in SteamID64
    pub async fn verify(&self, query: &HashMap<String, String>) -> AppResult<SteamId> {
        if query.get("openid.mode").map(String::as_str) != Some("id_res") {
            return Err(AppError::InvalidAssertion(
                "Invalid OpenID response".to_string(),
            ));
        }

        let mut form: Vec<(&str, &str)> = query
            .iter()
            .filter(|(key, _)| key.starts_with("openid.") && key.as_str() != "openid.mode")
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        form.push(("openid.mode", "check_authentication"));

        let response = self
            .http_client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Steam OpenID request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(status = %status, "Steam OpenID verification returned an error");
            return Err(AppError::Upstream(format!(
                "Steam OpenID returned status {}",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to read OpenID response: {}", e)))?;

        if !body.lines().any(|line| line.trim() == "is_valid:true") {
            tracing::warn!("Steam rejected OpenID assertion");
            return Err(AppError::AssertionRejected);
        }

        let claimed_id = query.get("openid.claimed_id").map(String::as_str).unwrap_or("");
        let steam_id = extract_steam_id(claimed_id)?;

        tracing::info!(steam_id = %steam_id, "Steam OpenID assertion verified");
        Ok(steam_id)
    }
}

/// Pulls the SteamID64 out of a verified `openid.claimed_id`
pub fn extract_steam_id(claimed_id: &str) -> AppResult<SteamId> {
    CLAIMED_ID
        .captures(claimed_id)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| SteamId::parse(digits.as_str()).ok())
        .ok_or_else(|| {
            AppError::IdentifierExtractionFailed(format!(
                "Could not extract Steam ID from {}",
                claimed_id
            ))
        })
}
