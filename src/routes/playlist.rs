use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use crate::models::{EntryDataRequest, ParseResponse};
use crate::routes::{api_error, ApiError};
use crate::services::m3u_parser::PlaylistParser;
use crate::services::metrics::ENTRIES_PARSED;
use crate::AppState;

/// POST /api/playlist/parse - Parse M3U text sent in the body
pub async fn parse_playlist(body: String) -> Result<impl IntoResponse, ApiError> {
    let playlist = PlaylistParser::parse(&body)
        .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    ENTRIES_PARSED.inc_by(playlist.len() as u64);

    Ok(Json(ParseResponse {
        total: playlist.len(),
        items: playlist.items,
    }))
}

/// POST /api/load - Details for a channel returned by catalog or search
pub async fn load_channel(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EntryDataRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state
        .provider
        .load(&payload.data)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    Ok(Json(response))
}

/// POST /api/links - Playable links for a channel
pub async fn load_links(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EntryDataRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let links = state
        .provider
        .load_links(&payload.data)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    Ok(Json(links))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{LinkKind, LoadResponse, PlaylistEntry, StreamLink};
    use crate::services::fetcher::PlaylistFetcher;
    use crate::services::provider::{IptvOrgProvider, ProviderSource};
    use crate::build_router;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use std::time::Instant;
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState> {
        let config = Config::from_env();
        let fetcher = PlaylistFetcher::new(&config.user_agent, 1000, 0, 1).unwrap();
        let provider = IptvOrgProvider::new(ProviderSource::all(), config.search_options());

        Arc::new(AppState {
            config,
            provider,
            fetcher,
            start_time: Instant::now(),
        })
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn entry_request(uri: &str, entry: &PlaylistEntry) -> Request<Body> {
        let data = serde_json::to_string(entry).unwrap();
        let body = serde_json::json!({ "data": data }).to_string();
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_parse_endpoint() {
        let app = build_router(test_state());
        let body = "#EXTM3U\n#EXTINF:-1 group-title=\"Kids\",KiKA\nhttp://x/kika.m3u8\n";

        let response = app
            .oneshot(Request::post("/api/playlist/parse").body(Body::from(body)).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: serde_json::Value = body_json(response).await;
        assert_eq!(json["total"], 1);
        assert_eq!(json["items"][0]["title"], "KiKA");
        assert_eq!(json["items"][0]["groupTitle"], "Kids");
    }

    #[tokio::test]
    async fn test_parse_endpoint_invalid_header() {
        let app = build_router(test_state());

        let response = app
            .oneshot(
                Request::post("/api/playlist/parse")
                    .body(Body::from("not a playlist"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_load_endpoint() {
        let app = build_router(test_state());
        let mut entry = PlaylistEntry::new("http://x/zdf.m3u8", "ZDF");
        entry.group_title = Some("General".to_string());

        let response = app.oneshot(entry_request("/api/load", &entry)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let loaded: LoadResponse = body_json(response).await;
        assert_eq!(loaded.name, "ZDF");
        assert_eq!(loaded.url, "http://x/zdf.m3u8");
        assert_eq!(loaded.plot.as_deref(), Some("General"));
    }

    #[tokio::test]
    async fn test_links_endpoint() {
        let app = build_router(test_state());
        let entry = PlaylistEntry::new("http://x/manifest.mpd", "Dash");

        let response = app.oneshot(entry_request("/api/links", &entry)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let links: Vec<StreamLink> = body_json(response).await;
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].kind, LinkKind::Dash);
    }

    #[tokio::test]
    async fn test_load_endpoint_bad_data() {
        let app = build_router(test_state());
        let body = serde_json::json!({ "data": "{broken" }).to_string();

        let response = app
            .oneshot(
                Request::post("/api/load")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_search_requires_query() {
        let app = build_router(test_state());

        let response = app
            .oneshot(Request::get("/api/search?q=").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
