use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use iptv_org_server::config::Config;
use iptv_org_server::services::{
    fetcher::PlaylistFetcher,
    provider::{IptvOrgProvider, ProviderSource},
};
use iptv_org_server::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "iptv_org_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Load configuration
    let config = Config::from_env();
    let port = config.port;

    tracing::info!("Starting IPTV-Org Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app_env);

    let source = ProviderSource::from_config(&config)?;
    tracing::info!("Playlist source: {} ({})", source.name, source.playlist_url);

    let fetcher = PlaylistFetcher::new(
        &config.user_agent,
        config.fetch_timeout_ms,
        config.max_retries,
        config.max_playlist_size_mb,
    )?;

    let provider = IptvOrgProvider::new(source, config.search_options());
    tracing::info!(
        "Search: max {} results, min confidence {}",
        config.search_max_results,
        config.search_min_confidence
    );

    // Build application state
    let state = Arc::new(AppState {
        config,
        provider,
        fetcher,
        start_time: Instant::now(),
    });

    let app = build_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
