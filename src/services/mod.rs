mod content_fetcher;
mod extractor;
mod selectors;
pub(crate) mod text;

use async_trait::async_trait;

use crate::error::Result;

pub use content_fetcher::HttpPageSource;
pub use extractor::ContentExtractor;
pub use selectors::SelectorTable;

pub(crate) const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Transport for article web pages.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Page HTML, or `PageUnavailable`.
    async fn fetch_page(&self, url: &str) -> Result<String>;
}
