mod repository;
mod schema;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{ArticlePage, ArticleQuery, Feed, InsertOutcome, NewArticle, Overview, SummaryShape};

pub use repository::Repository;

/// Storage contract shared by the fetch pipeline and the digest.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn active_feeds(&self) -> Result<Vec<Feed>>;

    async fn article_exists_by_link(&self, link: &str) -> Result<bool>;

    /// Returns `AlreadyExists` when the link's unique constraint is hit.
    async fn insert_article(&self, article: NewArticle) -> Result<InsertOutcome>;

    async fn summary_capabilities(&self) -> Result<SummaryShape>;

    /// Updates the article's summary row in place, or inserts one.
    async fn upsert_summary(
        &self,
        article_id: i64,
        short: String,
        detailed: Option<String>,
    ) -> Result<()>;

    async fn query_articles(&self, query: ArticleQuery) -> Result<ArticlePage>;

    async fn insert_overview(
        &self,
        week_start: String,
        content: String,
        created_at: DateTime<Utc>,
    ) -> Result<i64>;

    async fn latest_overview(&self) -> Result<Option<Overview>>;
}
