use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::models::{Playlist, SearchQuery, SearchResponse};
use crate::routes::{api_error, ApiError};
use crate::services::m3u_parser::PlaylistParser;
use crate::services::metrics::{ENTRIES_PARSED, SEARCHES};
use crate::AppState;

/// Upper bound for the `limit` query parameter
const MAX_SEARCH_LIMIT: usize = 100;

/// Download and parse the configured playlist
async fn fetch_playlist(state: &AppState) -> Result<Playlist, ApiError> {
    let url = &state.provider.source().playlist_url;

    let content = state.fetcher.fetch(url).await.map_err(|e| {
        tracing::error!("Playlist fetch failed: {}", e);
        api_error(StatusCode::BAD_GATEWAY, e.to_string())
    })?;

    let playlist = PlaylistParser::parse(&content).map_err(|e| {
        tracing::error!("Playlist parse failed: {}", e);
        api_error(StatusCode::BAD_GATEWAY, e.to_string())
    })?;

    ENTRIES_PARSED.inc_by(playlist.len() as u64);
    tracing::info!("Loaded {} channels from {}", playlist.len(), url);

    Ok(playlist)
}

/// GET /api/catalog - Channels grouped by group title
pub async fn get_catalog(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let playlist = fetch_playlist(&state).await?;

    let sections = state.provider.main_page(&playlist).map_err(|e| {
        tracing::error!("Catalog build failed: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(serde_json::json!({
        "name": state.provider.source().name,
        "lang": state.provider.source().lang,
        "sections": sections,
        "total": playlist.len()
    })))
}

/// GET /api/search?q=... - Fuzzy search on channel titles
pub async fn search_channels(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if query.q.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Query parameter 'q' is required",
        ));
    }

    let mut options = *state.provider.search_options();
    if let Some(limit) = query.limit {
        options.max_results = limit.min(MAX_SEARCH_LIMIT);
    }

    let playlist = fetch_playlist(&state).await?;

    let items = state
        .provider
        .search_with(&playlist, &query.q, &options)
        .map_err(|e| {
            tracing::error!("Search failed: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    SEARCHES.inc();

    Ok(Json(SearchResponse {
        total: items.len(),
        items,
        query: query.q,
    }))
}
