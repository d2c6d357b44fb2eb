use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::services::BROWSER_USER_AGENT;

use super::FeedSource;

/// Largest feed document accepted.
const MAX_FEED_SIZE: u64 = 5 * 1024 * 1024;

pub struct HttpFeedSource {
    client: Client,
}

impl HttpFeedSource {
    pub fn new() -> Result<Self> {
        // Some publishers reject non-browser agents outright.
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(BROWSER_USER_AGENT)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_feed_document(&self, url: &str) -> Result<Vec<u8>> {
        let unavailable = |reason: String| AppError::FeedUnavailable {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(unavailable(format!("HTTP {}", response.status())));
        }

        if let Some(length) = response.content_length() {
            if length > MAX_FEED_SIZE {
                return Err(unavailable(format!("feed too large: {length} bytes")));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if bytes.len() as u64 > MAX_FEED_SIZE {
            return Err(unavailable(format!("feed too large: {} bytes", bytes.len())));
        }

        Ok(bytes.to_vec())
    }
}
