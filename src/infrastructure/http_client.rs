//! HTTP client for listing polls with rate limiting and error handling
//!
//! The listing endpoint is an AJAX script. It is called with JSON
//! `Accept`/`Content-Type` headers like the site's own frontend does, even
//! though it answers with an HTML fragment.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::{
    Client,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use tracing::{debug, info};

use crate::domain::FetchError;
use crate::infrastructure::config::{SourceConfig, defaults};

/// HTTP client configuration for listing polls
#[derive(Debug, Clone, serde::Serialize)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::USER_AGENT.to_string(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
        }
    }
}

impl HttpClientConfig {
    pub fn from_source_config(source: &SourceConfig) -> Self {
        Self {
            user_agent: source.user_agent.clone(),
            timeout_seconds: source.timeout_seconds,
            max_requests_per_second: source.max_requests_per_second,
        }
    }
}

/// HTTP client with a direct (unkeyed) rate limiter
pub struct HttpClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    pub fn new(config: &HttpClientConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .cookie_store(true)
            .gzip(true)
            .build()
            .map_err(|e| FetchError::Client(format!("Failed to create HTTP client: {e}")))?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .ok_or_else(|| FetchError::Client("Rate limit must be greater than 0".to_string()))?,
        );
        let rate_limiter = RateLimiter::direct(quota);

        Ok(Self {
            client,
            rate_limiter,
        })
    }

    /// Fetch URL and return the body as text
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.rate_limiter.until_ready().await;

        info!("Fetching URL: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let text = response.text().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;

        debug!("Successfully fetched: {} ({}, {} chars)", url, status, text.len());
        Ok(text)
    }
}
