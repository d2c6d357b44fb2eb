mod article;
mod feed;
mod overview;
mod summary;

pub use article::{Article, ArticlePage, ArticleQuery, FeedItem, InsertOutcome, NewArticle, UNKNOWN_AUTHOR};
pub use feed::Feed;
pub use overview::{week_start, Overview};
pub use summary::{SummaryDraft, SummaryShape};
