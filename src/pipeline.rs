use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::ai::{LanguageModel, Summarizer};
use crate::config::Config;
use crate::db::ArticleStore;
use crate::error::Result;
use crate::feed::{FeedReader, FeedSource};
use crate::models::{ArticleQuery, FeedItem, InsertOutcome, NewArticle, UNKNOWN_AUTHOR};
use crate::services::{ContentExtractor, PageSource, SelectorTable};

/// What happened to one feed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Added {
        article_id: i64,
        summary: SummaryStatus,
    },
    AlreadyPresent,
    Dropped,
}

/// How much of an article's summary was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryStatus {
    Complete,
    /// Short summary stored, the detailed call failed.
    ShortOnly,
    Missing,
}

#[derive(Debug, Clone, Default)]
pub struct FeedReport {
    pub feed_url: String,
    pub new_links: Vec<String>,
    pub skipped_existing: usize,
    pub dropped_insufficient: usize,
    pub partial_summaries: usize,
    pub summary_failures: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub feeds: Vec<FeedReport>,
    /// (feed url, error) for feeds that could not be fetched or parsed.
    pub failed_feeds: Vec<(String, String)>,
}

impl RunReport {
    pub fn new_articles(&self) -> usize {
        self.feeds.iter().map(|f| f.new_links.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegenerationReport {
    pub processed: usize,
    pub failed: usize,
}

/// Fetch → dedup → extract → insert → summarize, one feed at a time.
pub struct Pipeline {
    store: Arc<dyn ArticleStore>,
    reader: FeedReader,
    extractor: ContentExtractor,
    model: Arc<dyn LanguageModel>,
    feed_concurrency: usize,
    model_timeout: Duration,
    max_input_chars: usize,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn ArticleStore>,
        feeds: Arc<dyn FeedSource>,
        pages: Arc<dyn PageSource>,
        model: Arc<dyn LanguageModel>,
        config: &Config,
    ) -> Self {
        let selectors = SelectorTable::with_overrides(&config.extractor.domain_selectors);
        Self {
            store,
            reader: FeedReader::new(feeds, config.pipeline.max_items_per_fetch),
            extractor: ContentExtractor::new(
                pages,
                selectors,
                config.extractor.min_content_chars,
                config.extractor.substantial_paragraph_chars,
            ),
            model,
            feed_concurrency: config.pipeline.feed_concurrency.max(1),
            model_timeout: Duration::from_secs(config.pipeline.model_timeout_secs),
            max_input_chars: config.pipeline.max_input_chars,
        }
    }

    /// Probes the store's summary shape once for the whole run.
    async fn summarizer(&self) -> Result<Summarizer> {
        let shape = self.store.summary_capabilities().await?;
        let summarizer = Summarizer::new(
            Arc::clone(&self.model),
            shape,
            self.model_timeout,
            self.max_input_chars,
        );
        tracing::debug!(
            shape = ?summarizer.shape(),
            model = self.model.model_version(),
            "resolved summary shape"
        );
        Ok(summarizer)
    }

    /// Processes one feed. Feed-level failures are returned as errors.
    pub async fn fetch_feed(&self, feed_url: &str) -> Result<FeedReport> {
        let summarizer = self.summarizer().await?;
        self.process_feed(feed_url, &summarizer).await
    }

    /// Processes every active feed; a failing feed does not stop the others.
    pub async fn refresh_all(&self) -> Result<RunReport> {
        let summarizer = self.summarizer().await?;
        let feeds = self.store.active_feeds().await?;
        tracing::info!(feeds = feeds.len(), "refreshing active feeds");

        let summarizer = &summarizer;
        let results: Vec<_> = stream::iter(feeds)
            .map(|feed| async move {
                let result = self.process_feed(&feed.url, summarizer).await;
                (feed.url, result)
            })
            .buffer_unordered(self.feed_concurrency)
            .collect()
            .await;

        let mut report = RunReport::default();
        for (url, result) in results {
            match result {
                Ok(feed_report) => report.feeds.push(feed_report),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(feed = %url, error = %e, "feed failed");
                    report.failed_feeds.push((url, e.to_string()));
                }
            }
        }

        tracing::info!(
            processed = report.feeds.len(),
            failed = report.failed_feeds.len(),
            new_articles = report.new_articles(),
            "refresh completed"
        );
        Ok(report)
    }

    async fn process_feed(&self, feed_url: &str, summarizer: &Summarizer) -> Result<FeedReport> {
        let items = self.reader.read(feed_url).await?;
        tracing::debug!(feed = %feed_url, items = items.len(), "fetched feed");

        let mut report = FeedReport {
            feed_url: feed_url.to_string(),
            ..FeedReport::default()
        };

        // One item at a time: a link's existence check and insert never
        // interleave with another item's.
        for item in items {
            let link = item.link.clone();
            match self.process_item(feed_url, item, summarizer).await? {
                ItemOutcome::Added {
                    article_id,
                    summary,
                } => {
                    match summary {
                        SummaryStatus::Complete => {}
                        SummaryStatus::ShortOnly => report.partial_summaries += 1,
                        SummaryStatus::Missing => {
                            tracing::debug!(article_id, "stored without summary");
                            report.summary_failures += 1;
                        }
                    }
                    report.new_links.push(link);
                }
                ItemOutcome::AlreadyPresent => report.skipped_existing += 1,
                ItemOutcome::Dropped => report.dropped_insufficient += 1,
            }
        }

        tracing::info!(
            feed = %feed_url,
            new = report.new_links.len(),
            skipped = report.skipped_existing,
            dropped = report.dropped_insufficient,
            "processed feed"
        );
        Ok(report)
    }

    /// Only storage failures escape; everything else becomes an outcome.
    async fn process_item(
        &self,
        feed_url: &str,
        item: FeedItem,
        summarizer: &Summarizer,
    ) -> Result<ItemOutcome> {
        if self.store.article_exists_by_link(&item.link).await? {
            tracing::debug!(link = %item.link, "already stored");
            return Ok(ItemOutcome::AlreadyPresent);
        }

        let extraction = match self.extractor.extract(&item).await {
            Ok(extraction) => extraction,
            Err(e) => {
                tracing::warn!(link = %item.link, error = %e, "dropping item");
                return Ok(ItemOutcome::Dropped);
            }
        };
        tracing::debug!(link = %item.link, stage = ?extraction.stage, "extracted text");

        let article = NewArticle {
            feed_url: feed_url.to_string(),
            title: item.title,
            link: item.link,
            full_text: extraction.text,
            published_at: item.published_at,
            author: item.author.unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        };
        let link = article.link.clone();
        let text = article.full_text.clone();

        let article_id = match self.store.insert_article(article).await? {
            InsertOutcome::Inserted(id) => id,
            InsertOutcome::AlreadyExists => {
                tracing::debug!(link = %link, "lost insert race, already stored");
                return Ok(ItemOutcome::AlreadyPresent);
            }
        };
        tracing::info!(article_id, link = %link, "inserted article");

        let summary = self.summarize_article(summarizer, article_id, &text).await?;
        Ok(ItemOutcome::Added {
            article_id,
            summary,
        })
    }

    /// Summarizes and upserts; only storage failures escape.
    async fn summarize_article(
        &self,
        summarizer: &Summarizer,
        article_id: i64,
        text: &str,
    ) -> Result<SummaryStatus> {
        let draft = match summarizer.summarize(text).await {
            Ok(draft) => draft,
            Err(e) => {
                tracing::warn!(article_id, error = %e, timeout = e.is_timeout(), "summarization failed");
                return Ok(SummaryStatus::Missing);
            }
        };
        let status = if summarizer.shape().has_detailed_summary() && draft.detailed.is_none() {
            SummaryStatus::ShortOnly
        } else {
            SummaryStatus::Complete
        };

        match self
            .store
            .upsert_summary(article_id, draft.short, draft.detailed)
            .await
        {
            Ok(()) => Ok(status),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!(article_id, error = %e, "summary not stored");
                Ok(SummaryStatus::Missing)
            }
        }
    }

    /// Re-summarizes every stored article of `feed_urls` without fetching.
    pub async fn regenerate(&self, feed_urls: &[String]) -> Result<RegenerationReport> {
        let summarizer = self.summarizer().await?;
        let page = self
            .store
            .query_articles(ArticleQuery::for_feeds(feed_urls.to_vec()))
            .await?;
        tracing::info!(articles = page.total, "regenerating summaries");

        let mut report = RegenerationReport::default();
        for article in page.articles {
            let Some(text) = article.full_text.as_deref().filter(|t| !t.trim().is_empty()) else {
                tracing::warn!(article_id = article.id, "no stored text to summarize");
                report.failed += 1;
                continue;
            };

            match self.summarize_article(&summarizer, article.id, text).await? {
                SummaryStatus::Missing => report.failed += 1,
                SummaryStatus::Complete | SummaryStatus::ShortOnly => report.processed += 1,
            }
        }

        tracing::info!(processed = report.processed, failed = report.failed, "regeneration completed");
        Ok(report)
    }
}
