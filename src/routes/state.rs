use std::{sync::Arc, time::Duration};

use crate::{
    config::Config,
    db::{CollectionRepository, IdentityRepository, KeyValueStore},
    error::AppResult,
    services::{
        providers::{LibraryProvider, PriceProvider, TextGenerator},
        ChatAssistant, PriceLookupSettings, RecommendationEngine, SteamOpenId,
    },
};

/// Shared, read-only application state handed to every handler
pub struct AppState {
    pub config: Config,
    pub library: Arc<dyn LibraryProvider>,
    pub prices: Arc<dyn PriceProvider>,
    pub openid: SteamOpenId,
    pub identities: IdentityRepository,
    pub collections: CollectionRepository,
    pub recommender: RecommendationEngine,
    pub chat: ChatAssistant,
    pub price_settings: PriceLookupSettings,
}

impl AppState {
    /// Wires services around the given upstream ports and storage adapter
    pub fn new(
        config: Config,
        library: Arc<dyn LibraryProvider>,
        prices: Arc<dyn PriceProvider>,
        generator: Option<Arc<dyn TextGenerator>>,
        store: Arc<dyn KeyValueStore>,
    ) -> AppResult<Self> {
        let openid = SteamOpenId::new(
            config.steam_openid_url.clone(),
            Duration::from_secs(config.upstream_timeout_secs),
        )?;

        let price_settings = PriceLookupSettings {
            limit: config.price_lookup_limit,
            concurrency: config.price_lookup_concurrency,
            timeout: Duration::from_millis(config.price_lookup_timeout_ms),
        };

        let recommender = RecommendationEngine::new(
            generator.clone(),
            config.openai_model.clone(),
            config.recommendation_seed,
        );

        let chat = ChatAssistant::new(
            generator,
            Arc::clone(&prices),
            config.chat_model(),
            price_settings,
        );

        tracing::info!(store = store.name(), "Application state initialized");

        Ok(Self {
            identities: IdentityRepository::new(Arc::clone(&store)),
            collections: CollectionRepository::new(store),
            config,
            library,
            prices,
            openid,
            recommender,
            chat,
            price_settings,
        })
    }
}
