use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::{AppError, Result};
use crate::models::{
    Article, ArticlePage, ArticleQuery, Feed, InsertOutcome, NewArticle, Overview, SummaryShape,
    UNKNOWN_AUTHOR,
};

use super::schema::{COLUMN_PATCHES, LEGACY_OVERVIEWS, SCHEMA};
use super::ArticleStore;

const ARTICLE_COLUMNS: &str = "a.id, a.feed_url, f.feed_name, a.title, a.link, a.full_text, a.published_date, a.author";

/// Result of the published-date maintenance pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRepair {
    pub updated: usize,
    pub invalid: usize,
}

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            let tx = conn.transaction()?;
            upgrade_legacy_tables(&tx)?;
            tx.commit()?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Feed operations

    /// Returns `None` when a feed with this url is already registered.
    pub async fn add_feed(&self, url: &str, name: Option<&str>) -> Result<Option<i64>> {
        let url = url.to_string();
        let name = name.map(str::to_string);
        let id = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "INSERT INTO feeds (feed_url, feed_name, deleted) VALUES (?1, ?2, 0)
                     ON CONFLICT(feed_url) DO NOTHING",
                    params![url, name],
                )?;
                Ok((changed > 0).then(|| conn.last_insert_rowid()))
            })
            .await?;
        Ok(id)
    }

    pub async fn list_feeds(&self, archived: bool) -> Result<Vec<Feed>> {
        let feeds = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, feed_url, feed_name, deleted FROM feeds WHERE deleted = ?1 ORDER BY id DESC",
                )?;
                let feeds = stmt
                    .query_map(params![archived], feed_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(feeds)
            })
            .await?;
        Ok(feeds)
    }

    /// Archives or reactivates a feed. Its articles are kept either way.
    pub async fn set_feed_archived(&self, id: i64, archived: bool) -> Result<()> {
        let changed = self
            .conn
            .call(move |conn| {
                Ok(conn.execute(
                    "UPDATE feeds SET deleted = ?1 WHERE id = ?2",
                    params![archived, id],
                )?)
            })
            .await?;
        if changed == 0 {
            return Err(AppError::FeedNotFound(id));
        }
        Ok(())
    }

    /// Deletes every article (and summary) stored for an active feed.
    pub async fn clear_feed(&self, id: i64) -> Result<usize> {
        let deleted = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let url: Option<String> = tx
                    .query_row(
                        "SELECT feed_url FROM feeds WHERE id = ?1 AND deleted = 0",
                        params![id],
                        |row| row.get(0),
                    )
                    .optional()?;
                let Some(url) = url else {
                    return Ok(None);
                };
                tx.execute(
                    "DELETE FROM summaries WHERE article_id IN (SELECT id FROM articles WHERE feed_url = ?1)",
                    params![url],
                )?;
                let deleted = tx.execute("DELETE FROM articles WHERE feed_url = ?1", params![url])?;
                tx.commit()?;
                Ok(Some(deleted))
            })
            .await?;
        deleted.ok_or(AppError::FeedNotFound(id))
    }

    // Maintenance

    /// Rewrites stored publication dates into the canonical ISO form.
    pub async fn normalize_published_dates(&self) -> Result<DateRepair> {
        let repair = self
            .conn
            .call(|conn| {
                let tx = conn.transaction()?;
                let repair = normalize_dates(&tx)?;
                tx.commit()?;
                Ok(repair)
            })
            .await?;
        Ok(repair)
    }
}

#[async_trait]
impl ArticleStore for Repository {
    async fn active_feeds(&self) -> Result<Vec<Feed>> {
        self.list_feeds(false).await
    }

    async fn article_exists_by_link(&self, link: &str) -> Result<bool> {
        let link = link.to_string();
        let exists = self
            .conn
            .call(move |conn| {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM articles WHERE link = ?1)",
                    params![link],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await?;
        Ok(exists)
    }

    async fn insert_article(&self, article: NewArticle) -> Result<InsertOutcome> {
        let outcome = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    r#"INSERT INTO articles (title, link, full_text, published_date, feed_url, author)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                       ON CONFLICT(link) DO NOTHING"#,
                    params![
                        article.title,
                        article.link,
                        article.full_text,
                        article.published_at.map(format_timestamp),
                        article.feed_url,
                        article.author,
                    ],
                )?;
                if changed == 0 {
                    Ok(InsertOutcome::AlreadyExists)
                } else {
                    Ok(InsertOutcome::Inserted(conn.last_insert_rowid()))
                }
            })
            .await?;
        Ok(outcome)
    }

    async fn summary_capabilities(&self) -> Result<SummaryShape> {
        let shape = self.conn.call(|conn| Ok(summary_shape(conn)?)).await?;
        Ok(shape)
    }

    async fn upsert_summary(
        &self,
        article_id: i64,
        short: String,
        detailed: Option<String>,
    ) -> Result<()> {
        let written = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM articles WHERE id = ?1)",
                    params![article_id],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Ok(false);
                }

                match summary_shape(&tx)? {
                    SummaryShape::TwoTier => {
                        let updated = tx.execute(
                            "UPDATE summaries SET short_summary = ?2, detailed_summary = COALESCE(?3, detailed_summary)
                             WHERE article_id = ?1",
                            params![article_id, short, detailed],
                        )?;
                        if updated == 0 {
                            tx.execute(
                                "INSERT INTO summaries (article_id, short_summary, detailed_summary) VALUES (?1, ?2, ?3)",
                                params![article_id, short, detailed],
                            )?;
                        }
                    }
                    SummaryShape::Legacy => {
                        let updated = tx.execute(
                            "UPDATE summaries SET summary = ?2 WHERE article_id = ?1",
                            params![article_id, short],
                        )?;
                        if updated == 0 {
                            tx.execute(
                                "INSERT INTO summaries (article_id, summary) VALUES (?1, ?2)",
                                params![article_id, short],
                            )?;
                        }
                    }
                }
                tx.commit()?;
                Ok(true)
            })
            .await?;

        if !written {
            return Err(AppError::ArticleNotFound(article_id));
        }
        Ok(())
    }

    async fn query_articles(&self, query: ArticleQuery) -> Result<ArticlePage> {
        if query.feed_urls.is_empty() {
            return Ok(ArticlePage {
                articles: Vec::new(),
                total: 0,
            });
        }

        let page = self
            .conn
            .call(move |conn| {
                let (short_col, detailed_col) = match summary_shape(conn)? {
                    SummaryShape::TwoTier => ("s.short_summary", "s.detailed_summary"),
                    SummaryShape::Legacy => ("s.summary", "NULL"),
                };
                let feed_join = if query.active_only {
                    "JOIN feeds f ON f.feed_url = a.feed_url AND f.deleted = 0"
                } else {
                    "LEFT JOIN feeds f ON f.feed_url = a.feed_url"
                };

                let placeholders = vec!["?"; query.feed_urls.len()].join(", ");
                let mut filter = format!("a.feed_url IN ({placeholders})");
                let mut values: Vec<Value> = query
                    .feed_urls
                    .iter()
                    .cloned()
                    .map(Value::Text)
                    .collect();
                if let Some(start) = query.window_start {
                    filter.push_str(" AND a.published_date >= ?");
                    values.push(Value::Text(format_timestamp(start)));
                }

                let total: i64 = conn.query_row(
                    &format!("SELECT COUNT(*) FROM articles a {feed_join} WHERE {filter}"),
                    params_from_iter(values.iter()),
                    |row| row.get(0),
                )?;

                let sql = format!(
                    r#"SELECT {ARTICLE_COLUMNS}, {short_col}, {detailed_col}
                       FROM articles a
                       {feed_join}
                       LEFT JOIN summaries s
                         ON s.id = (SELECT MAX(id) FROM summaries WHERE article_id = a.id)
                       WHERE {filter}
                       ORDER BY a.published_date DESC NULLS LAST, a.id DESC
                       LIMIT ? OFFSET ?"#
                );
                // SQLite treats a negative LIMIT as unbounded.
                values.push(Value::Integer(query.limit.map_or(-1, |l| l as i64)));
                values.push(Value::Integer(query.offset as i64));

                let mut stmt = conn.prepare(&sql)?;
                let articles = stmt
                    .query_map(params_from_iter(values.iter()), article_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                Ok(ArticlePage {
                    articles,
                    total: total as usize,
                })
            })
            .await?;
        Ok(page)
    }

    async fn insert_overview(
        &self,
        week_start: String,
        content: String,
        created_at: DateTime<Utc>,
    ) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO overviews (week_start, content, created_at) VALUES (?1, ?2, ?3)",
                    params![week_start, content, format_timestamp(created_at)],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    async fn latest_overview(&self) -> Result<Option<Overview>> {
        let overview = self
            .conn
            .call(|conn| {
                let overview = conn
                    .query_row(
                        "SELECT id, week_start, content, created_at FROM overviews
                         ORDER BY created_at DESC, id DESC LIMIT 1",
                        [],
                        overview_from_row,
                    )
                    .optional()?;
                Ok(overview)
            })
            .await?;
        Ok(overview)
    }
}

/// Creates missing tables, brings older layouts up to the current columns and
/// canonicalizes stored dates. The summaries table keeps whatever shape it has.
fn upgrade_legacy_tables(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    let overview_columns = table_columns(conn, "overviews")?;
    if !overview_columns.is_empty() && !overview_columns.iter().any(|c| c == "week_start") {
        tracing::info!(table = LEGACY_OVERVIEWS, "moving legacy overviews aside");
        conn.execute_batch(&format!("ALTER TABLE overviews RENAME TO {LEGACY_OVERVIEWS}"))?;
    }

    conn.execute_batch(SCHEMA)?;

    for patch in COLUMN_PATCHES {
        let columns = table_columns(conn, patch.table)?;
        if !columns.iter().any(|c| c == patch.column) {
            tracing::info!(table = patch.table, column = patch.column, "adding missing column");
            conn.execute_batch(&format!(
                "ALTER TABLE {} ADD COLUMN {} {}",
                patch.table, patch.column, patch.definition
            ))?;
        }
    }

    let repair = normalize_dates(conn)?;
    if repair.updated > 0 {
        tracing::info!(updated = repair.updated, "normalized stored publication dates");
    }
    Ok(())
}

/// Column names of `table`; empty when the table does not exist.
fn table_columns(conn: &rusqlite::Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Rewrites every non-canonical `published_date` that parses. Window queries
/// compare the stored text, so only the canonical form sorts correctly.
fn normalize_dates(conn: &rusqlite::Connection) -> rusqlite::Result<DateRepair> {
    let rows: Vec<(i64, String)> = {
        let mut stmt = conn.prepare(
            "SELECT id, published_date FROM articles
             WHERE published_date IS NOT NULL AND published_date NOT LIKE '____-__-__T__:__:__.___Z'",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    };

    let mut repair = DateRepair::default();
    for (id, raw) in rows {
        let Some(parsed) = parse_datetime(&raw) else {
            tracing::debug!(article_id = id, value = %raw, "unparseable published date");
            repair.invalid += 1;
            continue;
        };
        let canonical = format_timestamp(parsed);
        if canonical != raw {
            conn.execute(
                "UPDATE articles SET published_date = ?1 WHERE id = ?2",
                params![canonical, id],
            )?;
            repair.updated += 1;
        }
    }
    Ok(repair)
}

fn summary_shape(conn: &rusqlite::Connection) -> rusqlite::Result<SummaryShape> {
    let columns = table_columns(conn, "summaries")?;
    let has = |name: &str| columns.iter().any(|c| c == name);

    if has("short_summary") && has("detailed_summary") {
        Ok(SummaryShape::TwoTier)
    } else {
        Ok(SummaryShape::Legacy)
    }
}

/// Canonical stored form, e.g. `2026-10-12T09:30:00.000Z`.
pub(crate) fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Accepts the formats found in older rows and raw feeds.
pub(crate) fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    // RFC3339 (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // RFC2822 (e.g., "Sun, 11 Jan 2026 12:34:56 GMT")
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    None
}

fn feed_from_row(row: &Row) -> rusqlite::Result<Feed> {
    Ok(Feed {
        id: row.get(0)?,
        url: row.get(1)?,
        name: row.get(2)?,
        archived: row.get::<_, i64>(3)? != 0,
    })
}

fn article_from_row(row: &Row) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get(0)?,
        feed_url: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        feed_name: row.get(2)?,
        title: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        link: row.get(4)?,
        full_text: row.get(5)?,
        published_at: row
            .get::<_, Option<String>>(6)?
            .and_then(|s| parse_datetime(&s)),
        author: row
            .get::<_, Option<String>>(7)?
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        short_summary: row.get(8)?,
        detailed_summary: row.get(9)?,
    })
}

fn overview_from_row(row: &Row) -> rusqlite::Result<Overview> {
    let created_at: String = row.get(3)?;
    Ok(Overview {
        id: row.get(0)?,
        week_start: row.get(1)?,
        content: row.get(2)?,
        created_at: parse_datetime(&created_at).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                Type::Text,
                format!("invalid created_at {created_at:?}").into(),
            )
        })?,
    })
}
