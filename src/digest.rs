use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::ai::{complete_within, render, LanguageModel, ModelProfile, Prompt};
use crate::config::DigestConfig;
use crate::db::ArticleStore;
use crate::error::Result;
use crate::models::{week_start, Article, ArticleQuery, Overview};
use crate::services::text::{char_len, truncate_chars};

const RECORD_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestOutcome {
    Created(Overview),
    NoArticles,
}

/// Rolls recent summaries of active feeds into one weekly overview.
pub struct DigestAggregator {
    store: Arc<dyn ArticleStore>,
    model: Arc<dyn LanguageModel>,
    settings: DigestConfig,
    timeout: Duration,
    profile: ModelProfile,
}

impl DigestAggregator {
    pub fn new(
        store: Arc<dyn ArticleStore>,
        model: Arc<dyn LanguageModel>,
        settings: DigestConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            model,
            settings,
            timeout,
            profile: ModelProfile::Default,
        }
    }

    pub fn with_profile(mut self, profile: ModelProfile) -> Self {
        self.profile = profile;
        self
    }

    pub async fn generate(&self, now: DateTime<Utc>) -> Result<DigestOutcome> {
        let articles = self.eligible_articles(now).await?;
        let selected = select_articles(
            articles,
            self.settings.per_feed_cap,
            self.settings.max_articles,
        );
        if selected.is_empty() {
            tracing::info!("no summarized articles in the digest window");
            return Ok(DigestOutcome::NoArticles);
        }

        tracing::info!(articles = selected.len(), profile = ?self.profile, "generating digest");
        let prompt = render(
            Prompt::WeeklyOverview,
            &render_records(&selected, self.settings.summary_chars),
        );
        let content = complete_within(self.model.as_ref(), &prompt, self.profile, self.timeout)
            .await?
            .trim()
            .to_string();

        let week_start = week_start(now).to_string();
        let id = self
            .store
            .insert_overview(week_start.clone(), content.clone(), now)
            .await?;
        tracing::info!(overview_id = id, week_start = %week_start, "stored digest");

        Ok(DigestOutcome::Created(Overview {
            id,
            week_start,
            content,
            created_at: now,
        }))
    }

    async fn eligible_articles(&self, now: DateTime<Utc>) -> Result<Vec<Article>> {
        let feed_urls: Vec<String> = self
            .store
            .active_feeds()
            .await?
            .into_iter()
            .map(|feed| feed.url)
            .collect();

        let query = ArticleQuery {
            feed_urls,
            active_only: true,
            window_start: Some(now - chrono::Duration::days(self.settings.window_days)),
            ..ArticleQuery::default()
        };
        let page = self.store.query_articles(query).await?;
        Ok(page
            .articles
            .into_iter()
            .filter(|article| article.digest_summary().is_some())
            .collect())
    }
}

/// Caps each feed at its `per_feed_cap` newest articles, then keeps the
/// newest `max_articles` overall.
fn select_articles(
    articles: Vec<Article>,
    per_feed_cap: usize,
    max_articles: usize,
) -> Vec<Article> {
    let mut by_feed: BTreeMap<String, Vec<Article>> = BTreeMap::new();
    for article in articles {
        by_feed.entry(article.feed_url.clone()).or_default().push(article);
    }

    let mut selected: Vec<Article> = by_feed
        .into_values()
        .flat_map(|mut feed_articles| {
            feed_articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
            feed_articles.truncate(per_feed_cap);
            feed_articles
        })
        .collect();

    selected.sort_by(|a, b| b.published_at.cmp(&a.published_at).then(b.id.cmp(&a.id)));
    selected.truncate(max_articles);
    selected
}

fn render_records(articles: &[Article], summary_chars: usize) -> String {
    articles
        .iter()
        .filter_map(|article| {
            let summary = article.digest_summary()?;
            let summary = if char_len(summary) > summary_chars {
                format!("{}...", truncate_chars(summary, summary_chars))
            } else {
                summary.to_string()
            };
            Some(format!(
                "Title: {}\nAuthor: {}\nSource: {}\nSummary: {}",
                article.title,
                article.author,
                article.source_name(),
                summary
            ))
        })
        .collect::<Vec<_>>()
        .join(RECORD_SEPARATOR)
}
