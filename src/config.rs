use std::env;

use crate::services::fuzzy::SearchOptions;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,
    pub app_env: String,

    // Playlist source
    /// iptv-org language code (e.g. "deu"); unset means the full index
    pub language: Option<String>,
    /// Overrides the playlist URL derived from `language`
    pub playlist_url: Option<String>,

    // Fetching
    pub fetch_timeout_ms: u64,
    pub max_retries: u32,
    pub max_playlist_size_mb: usize,

    // Search
    pub search_max_results: usize,
    pub search_min_confidence: f64,

    // Misc
    pub user_agent: String,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            // Server
            port: env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .unwrap_or(3001),
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),

            // Playlist source
            language: env::var("IPTV_LANGUAGE")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            playlist_url: env::var("PLAYLIST_URL")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),

            // Fetching
            fetch_timeout_ms: env::var("FETCH_TIMEOUT_MS")
                .unwrap_or_else(|_| "60000".to_string())
                .parse()
                .unwrap_or(60_000), // 1 minute

            max_retries: env::var("MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),

            max_playlist_size_mb: env::var("MAX_PLAYLIST_SIZE_MB")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .unwrap_or(100),

            // Search
            search_max_results: env::var("SEARCH_MAX_RESULTS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .unwrap_or(15),

            search_min_confidence: env::var("SEARCH_MIN_CONFIDENCE")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| (0.0..=1.0).contains(v))
                .unwrap_or(0.5),

            // Misc - VLC user agent, some stream hosts block unknown clients
            user_agent: env::var("USER_AGENT")
                .unwrap_or_else(|_| "VLC/3.0.20 LibVLC/3.0.20".to_string()),
        }
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            max_results: self.search_max_results,
            min_confidence: self.search_min_confidence,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
