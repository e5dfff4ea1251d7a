//! IPTV-Org playlist provider
//!
//! Parses iptv-org M3U playlists, ranks channels against free-text queries
//! and serves catalog, search and playback links over HTTP.
//!
//! The parser ([`services::m3u_parser`]) and the fuzzy search engine
//! ([`services::fuzzy`]) are synchronous and usable on their own:
//!
//! ```rust,ignore
//! use iptv_org_server::services::fuzzy::{FuzzySearcher, SearchOptions};
//! use iptv_org_server::services::m3u_parser::PlaylistParser;
//!
//! let playlist = PlaylistParser::parse(&text)?;
//! let hits = FuzzySearcher::default().search(
//!     "simpsons",
//!     &playlist.items,
//!     &SearchOptions::default(),
//!     |entry| entry.title.as_str(),
//! );
//! ```

pub mod config;
pub mod models;
pub mod routes;
pub mod services;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::services::{fetcher::PlaylistFetcher, provider::IptvOrgProvider};

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub provider: IptvOrgProvider,
    pub fetcher: PlaylistFetcher,
    pub start_time: Instant,
}

/// Build the HTTP router
pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_playlist_size_mb * 1024 * 1024;

    Router::new()
        // Health endpoints
        .route("/", get(routes::health::root))
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .route("/live", get(routes::health::live))
        // Catalog endpoints
        .route("/api/catalog", get(routes::catalog::get_catalog))
        .route("/api/search", get(routes::catalog::search_channels))
        // Playlist endpoints
        .route("/api/playlist/parse", post(routes::playlist::parse_playlist))
        .route("/api/load", post(routes::playlist::load_channel))
        .route("/api/links", post(routes::playlist::load_links))
        // Middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
