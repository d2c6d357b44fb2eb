use std::sync::Arc;

use feed_rs::model::Entry;
use feed_rs::parser;

use crate::error::{AppError, Result};
use crate::models::FeedItem;

use super::FeedSource;

/// Fetches a feed and hands back the items worth processing this cycle.
pub struct FeedReader {
    source: Arc<dyn FeedSource>,
    max_items: usize,
}

impl FeedReader {
    pub fn new(source: Arc<dyn FeedSource>, max_items: usize) -> Self {
        Self { source, max_items }
    }

    /// The first `max_items` linked entries, in document order.
    pub async fn read(&self, url: &str) -> Result<Vec<FeedItem>> {
        let bytes = self.source.fetch_feed_document(url).await?;
        let mut items = parse_items(url, &bytes)?;
        items.truncate(self.max_items);
        Ok(items)
    }
}

/// Parses RSS, Atom or JSON Feed bytes into items. Entries without a link are
/// dropped since the link is the article's identity.
pub fn parse_items(url: &str, bytes: &[u8]) -> Result<Vec<FeedItem>> {
    let feed = parser::parse(bytes).map_err(|e| AppError::FeedUnparseable {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let items = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let item = item_from_entry(entry);
            if item.is_none() {
                tracing::warn!(feed = %url, "skipping entry without a link");
            }
            item
        })
        .collect();

    Ok(items)
}

fn item_from_entry(entry: Entry) -> Option<FeedItem> {
    let link = entry
        .links
        .first()
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty())?;

    // Full content first, then summary/description, then media text
    let content = entry
        .content
        .and_then(|c| c.body)
        .filter(|body| !body.trim().is_empty())
        .or_else(|| {
            entry
                .summary
                .map(|s| s.content)
                .filter(|s| !s.trim().is_empty())
        })
        .or_else(|| {
            entry
                .media
                .into_iter()
                .find_map(|m| m.description.map(|d| d.content))
                .filter(|d| !d.trim().is_empty())
        });

    let author = entry
        .authors
        .into_iter()
        .map(|a| a.name.trim().to_string())
        .find(|name| !name.is_empty());

    Some(FeedItem {
        title: entry
            .title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled".to_string()),
        link,
        content,
        published_at: entry.published.or(entry.updated),
        author,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedFeeds;
    use chrono::{TimeZone, Utc};

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Example</title>
    <link>https://example.com</link>
    <description>Example feed</description>
    <item>
      <title>Full content wins</title>
      <link>https://example.com/one</link>
      <description>Teaser only</description>
      <content:encoded><![CDATA[<p>The whole story.</p>]]></content:encoded>
      <dc:creator>Ada Lovelace</dc:creator>
      <pubDate>Tue, 13 Oct 2026 08:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Description fallback</title>
      <link>https://example.com/two</link>
      <description>&lt;p&gt;Only a description.&lt;/p&gt;</description>
      <pubDate>sometime last week</pubDate>
    </item>
    <item>
      <title>No link here</title>
      <description>Dropped</description>
    </item>
    <item>
      <link>https://example.com/three</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_items_in_document_order() {
        let items = parse_items("https://example.com/feed", RSS.as_bytes()).unwrap();
        assert_eq!(items.len(), 3);

        assert_eq!(items[0].title, "Full content wins");
        assert_eq!(items[0].link, "https://example.com/one");
        assert!(items[0].content.as_deref().unwrap().contains("The whole story."));
        assert_eq!(items[0].author.as_deref(), Some("Ada Lovelace"));
        assert_eq!(
            items[0].published_at,
            Some(Utc.with_ymd_and_hms(2026, 10, 13, 8, 0, 0).unwrap())
        );

        assert!(items[1].content.as_deref().unwrap().contains("Only a description."));
        assert_eq!(items[1].published_at, None);
        assert_eq!(items[1].author, None);

        assert_eq!(items[2].title, "Untitled");
        assert_eq!(items[2].content, None);
    }

    #[test]
    fn atom_entries_are_supported() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Example</title>
  <id>urn:example</id>
  <updated>2026-10-14T10:00:00Z</updated>
  <entry>
    <title>Atom entry</title>
    <id>urn:example:1</id>
    <link href="https://example.com/atom-1"/>
    <updated>2026-10-14T10:00:00Z</updated>
    <author><name>Grace Hopper</name></author>
    <content type="html">&lt;p&gt;Atom body&lt;/p&gt;</content>
  </entry>
</feed>"#;
        let items = parse_items("https://example.com/atom", atom.as_bytes()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].author.as_deref(), Some("Grace Hopper"));
        assert_eq!(
            items[0].published_at,
            Some(Utc.with_ymd_and_hms(2026, 10, 14, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn garbage_is_unparseable() {
        let err = parse_items("https://example.com/feed", b"<html><body>nope</body></html>")
            .unwrap_err();
        assert!(matches!(err, AppError::FeedUnparseable { .. }));
    }

    #[tokio::test]
    async fn read_caps_item_count() {
        let feeds = Arc::new(ScriptedFeeds::default());
        feeds.set("https://example.com/feed", RSS);

        let reader = FeedReader::new(feeds, 2);
        let items = reader.read("https://example.com/feed").await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].link, "https://example.com/two");
    }

    #[tokio::test]
    async fn transport_failure_is_unavailable() {
        let reader = FeedReader::new(Arc::new(ScriptedFeeds::default()), 5);
        let err = reader.read("https://missing.example.com/feed").await.unwrap_err();
        assert!(matches!(err, AppError::FeedUnavailable { .. }));
    }
}
