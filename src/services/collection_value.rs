use std::{sync::Arc, time::Duration};

use tokio::{sync::Semaphore, time::timeout};

use crate::{
    error::AppError,
    models::{AppPrice, CollectionValue, Game},
    services::providers::PriceProvider,
};

/// Bounds for one library valuation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceLookupSettings {
    /// Only the first `limit` games are priced; larger libraries are extrapolated
    pub limit: usize,
    /// Lookups in flight at once
    pub concurrency: usize,
    /// Per-lookup deadline, not counting time spent waiting for a slot
    pub timeout: Duration,
}

impl Default for PriceLookupSettings {
    fn default() -> Self {
        Self {
            limit: 50,
            concurrency: 10,
            timeout: Duration::from_millis(5000),
        }
    }
}

/// Estimates what a library cost at undiscounted store prices
///
/// Failed, timed out and unpriced lookups are skipped. When nothing could be
/// priced the total is zero.
pub async fn estimate_collection_value(
    provider: Arc<dyn PriceProvider>,
    games: &[Game],
    settings: PriceLookupSettings,
) -> CollectionValue {
    let total_games = games.len();
    let appids: Vec<u32> = games.iter().take(settings.limit).map(|g| g.appid).collect();
    if appids.is_empty() {
        return CollectionValue::empty(total_games);
    }

    tracing::info!(
        lookups = appids.len(),
        total_games,
        concurrency = settings.concurrency,
        "Estimating collection value"
    );

    let semaphore = Arc::new(Semaphore::new(settings.concurrency.max(1)));
    let mut tasks = Vec::with_capacity(appids.len());

    for appid in appids {
        let provider = Arc::clone(&provider);
        let semaphore = Arc::clone(&semaphore);
        let deadline = settings.timeout;

        let task = tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| AppError::Internal(e.to_string()))?;

            match timeout(deadline, provider.fetch_price(appid)).await {
                Ok(result) => result,
                Err(_) => Err(AppError::Upstream(format!(
                    "Price lookup for {} timed out",
                    appid
                ))),
            }
        });
        tasks.push(task);
    }

    let mut prices: Vec<AppPrice> = Vec::new();
    let mut failures = 0usize;

    for task in tasks {
        match task.await {
            Ok(Ok(Some(price))) => prices.push(price),
            Ok(Ok(None)) => {}
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Price lookup failed");
                failures += 1;
            }
            Err(e) => {
                tracing::debug!(error = %e, "Price lookup task panicked");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        tracing::warn!(
            priced = prices.len(),
            failures,
            "Partial price lookup failure"
        );
    }

    summarize(&prices, total_games, settings.limit)
}

fn summarize(prices: &[AppPrice], total_games: usize, limit: usize) -> CollectionValue {
    let estimated = total_games > limit;
    let Some(first) = prices.first() else {
        return CollectionValue {
            estimated,
            ..CollectionValue::empty(total_games)
        };
    };

    let sum: f64 = prices.iter().map(|p| p.price).sum();
    let total = if estimated {
        sum / prices.len() as f64 * total_games as f64
    } else {
        sum
    };

    CollectionValue {
        total: (total * 100.0).round() / 100.0,
        currency: first.currency.clone(),
        games_with_prices: prices.len(),
        total_games,
        estimated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppResult;
    use crate::services::categorization::fixtures::game;
    use crate::services::providers::MockPriceProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn price(appid: u32, price: f64) -> AppPrice {
        AppPrice {
            appid,
            price,
            currency: "USD".to_string(),
        }
    }

    fn library(n: u32) -> Vec<Game> {
        (1..=n).map(|i| game(i, &format!("Game {}", i), 0, None)).collect()
    }

    /// Prices every app at 10.00; app 1 hangs, app 2 fails and app 3 is free
    struct FakeStore {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl FakeStore {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl PriceProvider for FakeStore {
        async fn fetch_price(&self, appid: u32) -> AppResult<Option<AppPrice>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay = if appid == 1 { 2000 } else { 10 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match appid {
                2 => Err(AppError::Upstream("store down".to_string())),
                3 => Ok(None),
                _ => Ok(Some(price(appid, 10.0))),
            }
        }
    }

    fn settings(limit: usize) -> PriceLookupSettings {
        PriceLookupSettings {
            limit,
            concurrency: 3,
            timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn test_failures_and_timeouts_are_skipped() {
        let store = Arc::new(FakeStore::new());
        let value = estimate_collection_value(store.clone(), &library(6), settings(50)).await;

        assert_eq!(value.games_with_prices, 3);
        assert_eq!(value.total, 30.0);
        assert_eq!(value.total_games, 6);
        assert!(!value.estimated);
        assert!(store.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_only_first_games_are_priced_and_extrapolated() {
        let store = Arc::new(FakeStore::new());
        let games: Vec<Game> = (10..30).map(|i| game(i, "G", 0, None)).collect();

        let value = estimate_collection_value(store.clone(), &games, settings(5)).await;

        assert_eq!(store.calls.load(Ordering::SeqCst), 5);
        assert_eq!(value.games_with_prices, 5);
        assert!(value.estimated);
        assert_eq!(value.total, 200.0);
    }

    #[tokio::test]
    async fn test_no_successes_is_zero() {
        let mut provider = MockPriceProvider::new();
        provider
            .expect_fetch_price()
            .times(2)
            .returning(|_| Err(AppError::Upstream("nope".to_string())));

        let value = estimate_collection_value(Arc::new(provider), &library(2), settings(50)).await;
        assert_eq!(value.total, 0.0);
        assert_eq!(value.games_with_prices, 0);
        assert_eq!(value.total_games, 2);
    }

    #[tokio::test]
    async fn test_empty_library_makes_no_calls() {
        let mut provider = MockPriceProvider::new();
        provider.expect_fetch_price().never();

        let value = estimate_collection_value(Arc::new(provider), &[], settings(50)).await;
        assert_eq!(value, CollectionValue::empty(0));
    }

    #[test]
    fn test_summarize_rounds_to_cents() {
        let prices = vec![price(1, 9.99), price(2, 19.99), price(3, 0.01)];
        let value = summarize(&prices, 3, 50);
        assert_eq!(value.total, 29.99);
        assert_eq!(value.currency, "USD");
    }
}
