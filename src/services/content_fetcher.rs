use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use url::Url;

use crate::error::{AppError, Result};

use super::{PageSource, BROWSER_USER_AGENT};

/// Fetches article pages the way a browser would ask for them.
pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self, article_url: &str) -> Result<String> {
        let unavailable = |reason: String| AppError::PageUnavailable {
            url: article_url.to_string(),
            reason,
        };

        let url = Url::parse(article_url).map_err(|e| unavailable(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(unavailable(format!("unsupported scheme {}", url.scheme())));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if !response.status().is_success() {
            tracing::debug!("Failed to fetch {}: {}", article_url, response.status());
            return Err(unavailable(format!("HTTP {}", response.status())));
        }

        response.text().await.map_err(|e| unavailable(e.to_string()))
    }
}
