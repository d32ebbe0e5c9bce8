//! Steam storefront price provider
//!
//! Looks up the undiscounted US price of a single app through
//! `/api/appdetails`. Results, including "no price", are cached for a day.

use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::AppPrice,
    services::providers::PriceProvider,
};

const PRICE_CACHE_TTL: u64 = 86400; // 24 hours
const STORE_COUNTRY: &str = "us";

#[derive(Clone)]
pub struct SteamStoreProvider {
    http_client: HttpClient,
    store_url: String,
    cache: Cache,
}

#[derive(Debug, Deserialize)]
struct AppDetails {
    #[serde(default)]
    success: bool,
    /// An object when the app has details, an empty array when filtered out
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct PriceOverview {
    currency: String,
    initial: u64,
}

impl SteamStoreProvider {
    pub fn new(cache: Cache, store_url: String, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        tracing::debug!(price_cache = cache.is_enabled(), "Steam store provider ready");

        Ok(Self {
            http_client,
            store_url: store_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    async fn fetch_from_store(&self, appid: u32) -> AppResult<Option<AppPrice>> {
        let url = format!("{}/api/appdetails", self.store_url);
        let appid_param = appid.to_string();

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("appids", appid_param.as_str()),
                ("cc", STORE_COUNTRY),
                ("filters", "price_overview"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Steam store request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!(appid, status = %status, "Steam store returned an error status");
            return Err(AppError::Upstream(format!(
                "Steam store returned status {}",
                status
            )));
        }

        let mut body: std::collections::HashMap<String, AppDetails> = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse store response: {}", e)))?;

        let Some(details) = body.remove(&appid_param) else {
            return Ok(None);
        };

        Ok(parse_price(appid, details))
    }
}

fn parse_price(appid: u32, details: AppDetails) -> Option<AppPrice> {
    if !details.success {
        return None;
    }

    let overview = details.data.get("price_overview")?.clone();
    let overview: PriceOverview = serde_json::from_value(overview).ok()?;

    Some(AppPrice {
        appid,
        price: overview.initial as f64 / 100.0,
        currency: overview.currency,
    })
}

#[async_trait::async_trait]
impl PriceProvider for SteamStoreProvider {
    async fn fetch_price(&self, appid: u32) -> AppResult<Option<AppPrice>> {
        let key = CacheKey::AppPrice {
            appid,
            country: STORE_COUNTRY.to_string(),
        };

        cached!(self.cache, key, PRICE_CACHE_TTL, self.fetch_from_store(appid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> SteamStoreProvider {
        let (cache, _handle) = Cache::disabled();
        SteamStoreProvider::new(cache, server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_price_uses_initial_price() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/appdetails"))
            .and(query_param("appids", "220"))
            .and(query_param("cc", "us"))
            .and(query_param("filters", "price_overview"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "220": {
                    "success": true,
                    "data": {"price_overview": {
                        "currency": "USD", "initial": 999, "final": 199,
                        "discount_percent": 80
                    }}
                }
            })))
            .mount(&server)
            .await;

        let price = provider(&server).fetch_price(220).await.unwrap().unwrap();
        assert_eq!(price.appid, 220);
        assert_eq!(price.currency, "USD");
        assert!((price.price - 9.99).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_free_game_has_no_price() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "440": {"success": true, "data": []}
            })))
            .mount(&server)
            .await;

        assert_eq!(provider(&server).fetch_price(440).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unsuccessful_lookup_has_no_price() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"1": {"success": false}})),
            )
            .mount(&server)
            .await;

        assert_eq!(provider(&server).fetch_price(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_error_status_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let result = provider(&server).fetch_price(220).await;
        assert!(matches!(result, Err(AppError::Upstream(_))));
    }
}
