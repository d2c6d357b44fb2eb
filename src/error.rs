use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("feed unavailable: {url}: {reason}")]
    FeedUnavailable { url: String, reason: String },

    #[error("feed unparseable: {url}: {reason}")]
    FeedUnparseable { url: String, reason: String },

    #[error("page unavailable: {url}: {reason}")]
    PageUnavailable { url: String, reason: String },

    #[error("insufficient content for {link} ({chars} chars)")]
    InsufficientContent { link: String, chars: usize },

    #[error("model call timed out after {0}s")]
    ModelTimeout(u64),

    #[error("Claude API error: {0}")]
    ClaudeApi(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("article {0} not found")]
    ArticleNotFound(i64),

    #[error("feed {0} not found or archived")]
    FeedNotFound(i64),

    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Timeouts are retryable and reported separately from other failures.
    pub fn is_timeout(&self) -> bool {
        matches!(self, AppError::ModelTimeout(_))
    }

    /// Errors that stop a whole run instead of a single item or feed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Config(_) | AppError::Database(_) | AppError::Sqlite(_) | AppError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
