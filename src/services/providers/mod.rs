//! Upstream provider abstractions
//!
//! Every outbound dependency sits behind a trait so handlers and services can be
//! exercised against mocks: the Steam Web API (library and profile data), the Steam
//! storefront (prices) and an OpenAI-compatible text generator.

use crate::{
    error::AppResult,
    models::{AppPrice, ChatTurn, IdentifierInput, OwnedGames, SteamId, SteamProfile},
};

pub mod openai;
pub mod steam_store;
pub mod steam_web;

/// Read access to a player's Steam library and profile
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LibraryProvider: Send + Sync {
    /// Fetch the owned games (including free-to-play titles that were launched)
    async fn owned_games(&self, steam_id: &SteamId) -> AppResult<OwnedGames>;

    /// Fetch the public profile summary
    async fn player_summary(&self, steam_id: &SteamId) -> AppResult<SteamProfile>;

    /// Resolve a custom profile name to a SteamID64
    async fn resolve_vanity(&self, vanity: &str) -> AppResult<SteamId>;
}

/// Store price lookups for single apps
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PriceProvider: Send + Sync {
    /// `Ok(None)` when the app has no price (free, delisted, region locked)
    async fn fetch_price(&self, appid: u32) -> AppResult<Option<AppPrice>>;
}

/// A single-shot chat completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatTurn>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Text generation backend
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the assistant's reply text. Never retried by callers.
    async fn complete(&self, request: &CompletionRequest) -> AppResult<String>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Turns any accepted identifier shape into a SteamID64, resolving custom names upstream
pub async fn resolve_identifier(
    provider: &dyn LibraryProvider,
    input: &str,
) -> AppResult<SteamId> {
    match IdentifierInput::parse(input)? {
        IdentifierInput::Id(steam_id) => Ok(steam_id),
        IdentifierInput::Vanity(vanity) => {
            tracing::debug!(vanity = %vanity, "Resolving custom profile name");
            provider.resolve_vanity(&vanity).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[tokio::test]
    async fn test_resolve_identifier_skips_lookup_for_ids() {
        let mut provider = MockLibraryProvider::new();
        provider.expect_resolve_vanity().never();

        let id = resolve_identifier(&provider, "https://steamcommunity.com/profiles/76561190000000001")
            .await
            .unwrap();
        assert_eq!(id.as_str(), "76561190000000001");
    }

    #[tokio::test]
    async fn test_resolve_identifier_uses_vanity_lookup() {
        let mut provider = MockLibraryProvider::new();
        provider
            .expect_resolve_vanity()
            .withf(|vanity| vanity == "gaben")
            .times(1)
            .returning(|_| Ok(SteamId::parse("76561197960287930").unwrap()));

        let id = resolve_identifier(&provider, "https://steamcommunity.com/id/gaben")
            .await
            .unwrap();
        assert_eq!(id.as_str(), "76561197960287930");
    }

    #[tokio::test]
    async fn test_resolve_identifier_propagates_not_found() {
        let mut provider = MockLibraryProvider::new();
        provider
            .expect_resolve_vanity()
            .returning(|v| Err(AppError::NotFound(format!("No profile named {}", v))));

        let result = resolve_identifier(&provider, "nobody_here").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_resolve_identifier_rejects_bad_format() {
        let provider = MockLibraryProvider::new();
        let result = resolve_identifier(&provider, "???").await;
        tokio_test::assert_err!(&result);
        assert!(matches!(result, Err(AppError::InvalidIdentifierFormat(_))));
    }
}
