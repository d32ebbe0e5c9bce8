//! Steam Web API provider
//!
//! Wraps the three Steam Web API calls the dashboard needs. Calls are single
//! best-effort round trips: no caching and no retry; callers decide what to do
//! with a failure.
//!
//! API Flow:
//! 1. Library: /IPlayerService/GetOwnedGames/v0001/
//! 2. Profile: /ISteamUser/GetPlayerSummaries/v0002/
//! 3. Custom URL: /ISteamUser/ResolveVanityURL/v0001/

use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;

use crate::{
    error::{AppError, AppResult},
    models::{
        ApiOwnedGamesEnvelope, ApiPlayerSummariesEnvelope, ApiVanityEnvelope, OwnedGames, SteamId,
        SteamProfile,
    },
    services::providers::LibraryProvider,
};

#[derive(Clone)]
pub struct SteamWebApiProvider {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
}

impl SteamWebApiProvider {
    pub fn new(api_key: Option<String>, api_url: String, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fails fast when no key is configured rather than calling Steam unauthenticated
    fn api_key(&self) -> AppResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AppError::ServiceUnavailable("Steam API key not configured".to_string()))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> AppResult<T> {
        let key = self.api_key()?;
        let url = format!("{}/{}", self.api_url, endpoint);

        let response = self
            .http_client
            .get(&url)
            .query(&[("key", key), ("format", "json")])
            .query(params)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Steam API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                endpoint = %endpoint,
                status = %status,
                body = %body,
                "Steam API request failed"
            );
            return Err(AppError::Upstream(format!(
                "Steam API returned status {}",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to read Steam API response: {}", e)))?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(endpoint = %endpoint, error = %e, "Failed to parse Steam API response");
            AppError::Upstream(format!("Failed to parse Steam API response: {}", e))
        })
    }
}

#[async_trait::async_trait]
impl LibraryProvider for SteamWebApiProvider {
    async fn owned_games(&self, steam_id: &SteamId) -> AppResult<OwnedGames> {
        let envelope: ApiOwnedGamesEnvelope = self
            .get_json(
                "IPlayerService/GetOwnedGames/v0001/",
                &[
                    ("steamid", steam_id.as_str()),
                    ("include_appinfo", "1"),
                    ("include_played_free_games", "1"),
                ],
            )
            .await?;

        // Private profiles come back as `{"response": {}}`
        let owned = envelope
            .response
            .filter(|r| r.game_count.is_some() || r.games.is_some())
            .ok_or_else(|| {
                AppError::NotFound(format!("No games found for Steam ID {}", steam_id))
            })?;

        let games = owned.games.unwrap_or_default();
        let game_count = owned.game_count.unwrap_or(games.len() as u32);

        tracing::info!(
            steam_id = %steam_id,
            game_count,
            provider = "steam",
            "Owned games fetched"
        );

        Ok(OwnedGames { game_count, games })
    }

    async fn player_summary(&self, steam_id: &SteamId) -> AppResult<SteamProfile> {
        let envelope: ApiPlayerSummariesEnvelope = self
            .get_json(
                "ISteamUser/GetPlayerSummaries/v0002/",
                &[("steamids", steam_id.as_str())],
            )
            .await?;

        let player = envelope
            .response
            .and_then(|r| r.players.into_iter().next())
            .ok_or_else(|| AppError::NotFound(format!("Steam user {} not found", steam_id)))?;

        let profile = SteamProfile::try_from(player)?;

        tracing::debug!(steam_id = %steam_id, provider = "steam", "Player summary fetched");

        Ok(profile)
    }

    async fn resolve_vanity(&self, vanity: &str) -> AppResult<SteamId> {
        let envelope: ApiVanityEnvelope = self
            .get_json(
                "ISteamUser/ResolveVanityURL/v0001/",
                &[("vanityurl", vanity), ("url_type", "1")],
            )
            .await?;

        let result = envelope
            .response
            .ok_or_else(|| AppError::Upstream("Empty vanity URL response".to_string()))?;

        if result.success != 1 {
            tracing::debug!(
                vanity = %vanity,
                message = ?result.message,
                "Vanity URL did not resolve"
            );
            return Err(AppError::NotFound(format!(
                "Steam vanity URL {} not found",
                vanity
            )));
        }

        let raw = result
            .steamid
            .ok_or_else(|| AppError::Upstream("Vanity response missing steamid".to_string()))?;

        SteamId::parse(&raw)
            .map_err(|_| AppError::Upstream(format!("Steam resolved to malformed id {}", raw)))
    }
}
