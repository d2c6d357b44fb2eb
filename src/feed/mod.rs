mod fetcher;
mod reader;

use async_trait::async_trait;

use crate::error::Result;

pub use fetcher::HttpFeedSource;
pub use reader::FeedReader;

/// Transport for feed documents.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Raw document bytes, or `FeedUnavailable`.
    async fn fetch_feed_document(&self, url: &str) -> Result<Vec<u8>>;
}
