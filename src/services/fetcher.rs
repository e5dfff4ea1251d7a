use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

use crate::services::metrics::PLAYLIST_FETCHES;

/// Errors raised while downloading a playlist
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Playlist exceeds the {limit_mb}MB limit")]
    TooLarge { limit_mb: usize },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Playlist is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

impl FetchError {
    /// Network failures and rate limiting are worth another attempt
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::Status { status, .. } => *status == StatusCode::TOO_MANY_REQUESTS.as_u16(),
            _ => false,
        }
    }
}

fn status_message(status: StatusCode) -> String {
    match status {
        StatusCode::NOT_FOUND => "Playlist not found. Check the URL.".to_string(),
        StatusCode::FORBIDDEN => "Access denied.".to_string(),
        StatusCode::TOO_MANY_REQUESTS => "The playlist host is rate limiting.".to_string(),
        _ => status.canonical_reason().unwrap_or("Error").to_string(),
    }
}

/// Exponential backoff for retry `attempt`, capped at 10s
fn backoff(attempt: u32) -> Duration {
    let backoff_ms = (1u64 << attempt.min(20)).saturating_mul(500).min(10_000);
    Duration::from_millis(backoff_ms)
}

/// Downloads playlist text over HTTP
pub struct PlaylistFetcher {
    client: Client,
    max_retries: u32,
    max_playlist_size_mb: usize,
    max_bytes: u64,
}

impl PlaylistFetcher {
    pub fn new(
        user_agent: &str,
        timeout_ms: u64,
        max_retries: u32,
        max_playlist_size_mb: usize,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_millis(timeout_ms))
            .gzip(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            max_retries,
            max_playlist_size_mb,
            max_bytes: (max_playlist_size_mb as u64) * 1024 * 1024,
        })
    }

    fn too_large(&self) -> FetchError {
        FetchError::TooLarge {
            limit_mb: self.max_playlist_size_mb,
        }
    }

    /// Single download attempt, body read chunk by chunk up to the size limit
    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                message: status_message(status),
            });
        }

        // Compressed responses carry no usable Content-Length
        if response.content_length().is_some_and(|len| len > self.max_bytes) {
            return Err(self.too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(self.too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8(body)?)
    }

    /// Fetch the playlist at `url` as text, retrying network errors and 429s
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        tracing::info!("Fetching playlist: {}", url);

        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Ok(body) => {
                    PLAYLIST_FETCHES.inc();
                    tracing::info!("Playlist size: {:.2} MB", body.len() as f64 / 1024.0 / 1024.0);
                    return Ok(body);
                }
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    let delay = backoff(attempt);
                    tracing::warn!(
                        "Fetch attempt {} failed ({}), retrying in {}ms",
                        attempt + 1,
                        err,
                        delay.as_millis()
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
