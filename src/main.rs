use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use steam_dashboard::{
    config::Config,
    db::{create_redis_client, Cache, KeyValueStore, MemoryStore, RedisStore},
    routes::{create_router, AppState},
    services::providers::{
        openai::OpenAiClient, steam_store::SteamStoreProvider, steam_web::SteamWebApiProvider,
        LibraryProvider, PriceProvider, TextGenerator,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "steam_dashboard=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let upstream_timeout = Duration::from_secs(config.upstream_timeout_secs);

    // Redis backs both the price cache and durable storage; without it everything is in memory
    let (cache, cache_writer, store) = match &config.redis_url {
        Some(url) => {
            let client = create_redis_client(url)?;
            let store = RedisStore::connect(client.clone())
                .await
                .context("Failed to connect to Redis")?;
            let (cache, writer) = Cache::new(client);
            tracing::info!("Using Redis for storage and price cache");
            (cache, writer, Arc::new(store) as Arc<dyn KeyValueStore>)
        }
        None => {
            tracing::warn!("REDIS_URL not set; identities and collections will not survive a restart");
            let (cache, writer) = Cache::disabled();
            (cache, writer, Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>)
        }
    };

    if config.steam_key().is_none() {
        tracing::warn!("STEAM_API_KEY not set; library and profile endpoints will answer 503");
    }

    let library: Arc<dyn LibraryProvider> = Arc::new(SteamWebApiProvider::new(
        config.steam_key().map(str::to_string),
        config.steam_api_url.clone(),
        upstream_timeout,
    )?);

    let prices: Arc<dyn PriceProvider> = Arc::new(SteamStoreProvider::new(
        cache,
        config.steam_store_url.clone(),
        upstream_timeout,
    )?);

    let generator: Option<Arc<dyn TextGenerator>> = match config.openai_key() {
        Some(key) => {
            let client = OpenAiClient::new(
                key.to_string(),
                config.openai_api_url.clone(),
                Duration::from_secs(config.llm_timeout_secs),
            )?;
            Some(Arc::new(client) as Arc<dyn TextGenerator>)
        }
        None => {
            tracing::warn!("OPENAI_API_KEY not set; recommendations use local picks and chat is disabled");
            None
        }
    };

    let addr = SocketAddr::new(
        config.host.parse().context("Invalid HOST address")?,
        config.port,
    );

    let state = Arc::new(AppState::new(config, library, prices, generator, store)?);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache_writer.shutdown().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
