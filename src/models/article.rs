use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored when a feed gives no creator, so display never sees NULL.
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// One entry parsed from a feed document, before extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    /// Richest inline HTML the feed carried for this entry.
    pub content: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticle {
    pub feed_url: String,
    pub title: String,
    pub link: String,
    pub full_text: String,
    pub published_at: Option<DateTime<Utc>>,
    pub author: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    AlreadyExists,
}

/// A stored article joined with its feed and summary, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub feed_url: String,
    pub feed_name: Option<String>,
    pub title: String,
    pub link: String,
    pub full_text: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub author: String,
    /// Short summary, or the legacy single summary.
    pub short_summary: Option<String>,
    pub detailed_summary: Option<String>,
}

impl Article {
    /// Text fed into the digest: the detailed summary when there is one.
    pub fn digest_summary(&self) -> Option<&str> {
        self.detailed_summary
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.short_summary.as_deref().filter(|s| !s.trim().is_empty()))
    }

    pub fn source_name(&self) -> &str {
        self.feed_name.as_deref().unwrap_or(&self.feed_url)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArticleQuery {
    pub feed_urls: Vec<String>,
    pub active_only: bool,
    pub window_start: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl ArticleQuery {
    pub fn for_feeds(feed_urls: Vec<String>) -> Self {
        Self {
            feed_urls,
            ..Self::default()
        }
    }

    /// 1-based page of `limit` rows.
    pub fn page(mut self, page: usize, limit: usize) -> Self {
        self.limit = Some(limit);
        self.offset = page.saturating_sub(1) * limit;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticlePage {
    pub articles: Vec<Article>,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(short: Option<&str>, detailed: Option<&str>) -> Article {
        Article {
            id: 1,
            feed_url: "https://example.com/feed".into(),
            feed_name: None,
            title: "t".into(),
            link: "https://example.com/a".into(),
            full_text: None,
            published_at: None,
            author: UNKNOWN_AUTHOR.into(),
            short_summary: short.map(Into::into),
            detailed_summary: detailed.map(Into::into),
        }
    }

    #[test]
    fn digest_prefers_detailed_summary() {
        assert_eq!(
            article(Some("short"), Some("long")).digest_summary(),
            Some("long")
        );
        assert_eq!(article(Some("short"), Some("  ")).digest_summary(), Some("short"));
        assert_eq!(article(None, None).digest_summary(), None);
    }

    #[test]
    fn page_offsets_are_one_based() {
        let query = ArticleQuery::for_feeds(vec![]).page(3, 20);
        assert_eq!(query.offset, 40);
        assert_eq!(query.limit, Some(20));
        assert_eq!(ArticleQuery::for_feeds(vec![]).page(0, 20).offset, 0);
    }
}
