/// Tables are only created when missing; a database that already holds the
/// legacy `summaries(summary)` table keeps it and is written in that shape.
pub const SCHEMA: &str = r#"
-- feeds table
CREATE TABLE IF NOT EXISTS feeds (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    feed_url TEXT UNIQUE NOT NULL,
    feed_name TEXT,
    deleted INTEGER NOT NULL DEFAULT 0
);

-- articles table
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    link TEXT UNIQUE NOT NULL,
    full_text TEXT,
    published_date TEXT,
    feed_url TEXT,
    author TEXT,
    FOREIGN KEY(feed_url) REFERENCES feeds(feed_url)
);

CREATE INDEX IF NOT EXISTS idx_articles_feed_url ON articles(feed_url);
CREATE INDEX IF NOT EXISTS idx_articles_published_date ON articles(published_date DESC);

-- summaries table
CREATE TABLE IF NOT EXISTS summaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    article_id INTEGER NOT NULL,
    short_summary TEXT,
    detailed_summary TEXT,
    FOREIGN KEY(article_id) REFERENCES articles(id)
);

CREATE INDEX IF NOT EXISTS idx_summaries_article_id ON summaries(article_id);

-- overviews table
CREATE TABLE IF NOT EXISTS overviews (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    week_start TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

/// A column older databases may lack, added in place on open.
pub struct ColumnPatch {
    pub table: &'static str,
    pub column: &'static str,
    pub definition: &'static str,
}

/// Columns missing from databases created before feed names, archiving and
/// authors existed. Applied after `SCHEMA`, each only when absent.
pub const COLUMN_PATCHES: &[ColumnPatch] = &[
    ColumnPatch {
        table: "feeds",
        column: "feed_name",
        definition: "TEXT",
    },
    ColumnPatch {
        table: "feeds",
        column: "deleted",
        definition: "INTEGER NOT NULL DEFAULT 0",
    },
    ColumnPatch {
        table: "articles",
        column: "author",
        definition: "TEXT",
    },
];

/// Where an `overviews(overview, created_date)` table is moved before the
/// current one is created.
pub const LEGACY_OVERVIEWS: &str = "overviews_legacy";

/// The pre-migration summaries table, kept for tests against old databases.
#[cfg(test)]
pub const LEGACY_SUMMARIES: &str = r#"
CREATE TABLE summaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    article_id INTEGER NOT NULL,
    summary TEXT,
    FOREIGN KEY(article_id) REFERENCES articles(id)
);
"#;

/// Tables as the first releases created them.
#[cfg(test)]
pub const LEGACY_DATABASE: &str = r#"
CREATE TABLE articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT,
    link TEXT UNIQUE,
    full_text TEXT,
    published_date TEXT,
    feed_url TEXT
);
CREATE TABLE summaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    article_id INTEGER,
    summary TEXT,
    FOREIGN KEY (article_id) REFERENCES articles(id)
);
CREATE TABLE overviews (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    overview TEXT,
    created_date TEXT
);
CREATE TABLE feeds (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    feed_url TEXT UNIQUE
);
"#;
