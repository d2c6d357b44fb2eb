use std::sync::Arc;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::FeedItem;

use super::selectors::SelectorTable;
use super::text::{char_len, clean, collapse_whitespace, decode_entities, join_paragraphs};
use super::PageSource;

const BLOCKS: &str = "p, h1, h2, h3, h4, h5, h6, li, blockquote, pre";

/// Non-textual and promotional nodes, never part of article text.
const BOILERPLATE: &str = "img, table, figure, hr, script, style, noscript, iframe, svg, \
     .promo, .subscribe, .quill-line, .quill-button, .newsletter, .advertisement";

/// Page chrome, ignored in addition to boilerplate on fetched pages.
const PAGE_CHROME: &str = "nav, header, footer, aside, form, button, .sidebar, .nav, .comments";

const GENERIC_CONTAINERS: &str =
    "[class*=article], [class*=post], [class*=entry], [itemprop=articleBody]";

/// Which stage of the fallback chain produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStage {
    Embedded,
    DomainSelectors,
    GenericBlocks,
    Paragraphs,
    RawBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub stage: ExtractionStage,
}

/// Resolves readable article text, inline content first, then the live page.
pub struct ContentExtractor {
    pages: Arc<dyn PageSource>,
    selectors: SelectorTable,
    min_chars: usize,
    paragraph_chars: usize,
}

impl ContentExtractor {
    pub fn new(
        pages: Arc<dyn PageSource>,
        selectors: SelectorTable,
        min_chars: usize,
        paragraph_chars: usize,
    ) -> Self {
        Self {
            pages,
            selectors,
            min_chars,
            paragraph_chars,
        }
    }

    /// Text of at least `min_chars` characters, or `InsufficientContent`.
    pub async fn extract(&self, item: &FeedItem) -> Result<Extraction> {
        let mut best = 0;

        if let Some(html) = item.content.as_deref() {
            let text = embedded_text(html);
            best = char_len(&text);
            if let Some(text) = self.accept(text) {
                return Ok(Extraction {
                    text,
                    stage: ExtractionStage::Embedded,
                });
            }
            tracing::debug!(link = %item.link, chars = best, "inline content too short, fetching page");
        }

        let page = match self.pages.fetch_page(&item.link).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(link = %item.link, error = %e, "page fetch failed");
                return Err(AppError::InsufficientContent {
                    link: item.link.clone(),
                    chars: best,
                });
            }
        };

        self.extract_page(&item.link, &page)
            .ok_or_else(|| AppError::InsufficientContent {
                link: item.link.clone(),
                chars: best,
            })
    }

    /// Runs the page stages of the chain over fetched HTML.
    pub fn extract_page(&self, link: &str, html: &str) -> Option<Extraction> {
        let doc = Html::parse_document(html);
        let skip = selector(&format!("{BOILERPLATE}, {PAGE_CHROME}"));

        let host = Url::parse(link)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();

        for raw in self.selectors.selectors_for(&host) {
            let Ok(containers) = Selector::parse(raw) else {
                tracing::warn!(selector = %raw, host = %host, "ignoring invalid selector");
                continue;
            };
            let text = join_paragraphs(
                doc.select(&containers)
                    .filter(|el| {
                        !is_skipped(el, &skip) && !has_matching_ancestor(el, &containers, None)
                    })
                    .map(|el| container_text(el, &skip)),
            );
            if let Some(text) = self.accept(text) {
                tracing::debug!(link, selector = %raw, "matched domain selector");
                return Some(Extraction {
                    text,
                    stage: ExtractionStage::DomainSelectors,
                });
            }
        }

        let generic = selector(GENERIC_CONTAINERS);
        let text = join_paragraphs(
            doc.select(&generic)
                .filter(|el| !is_skipped(el, &skip) && !has_matching_ancestor(el, &generic, None))
                .map(|el| join_paragraphs(block_text(el, &skip))),
        );
        if let Some(text) = self.accept(text) {
            return Some(Extraction {
                text,
                stage: ExtractionStage::GenericBlocks,
            });
        }

        let paragraphs = selector("p");
        let text = join_paragraphs(
            doc.select(&paragraphs)
                .filter(|el| !is_skipped(el, &skip))
                .map(|el| clean(&visible_text(el, &skip)))
                .filter(|p| char_len(p) > self.paragraph_chars),
        );
        if let Some(text) = self.accept(text) {
            return Some(Extraction {
                text,
                stage: ExtractionStage::Paragraphs,
            });
        }

        self.accept(raw_body_text(html)).map(|text| Extraction {
            text,
            stage: ExtractionStage::RawBody,
        })
    }

    fn accept(&self, text: String) -> Option<String> {
        (char_len(&text) >= self.min_chars).then_some(text)
    }
}

/// Block text of inline feed content, or all its text when it has no blocks.
pub fn embedded_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let skip = selector(BOILERPLATE);
    let root = fragment.root_element();

    let paragraphs = block_text(root, &skip);
    if paragraphs.is_empty() {
        clean(&visible_text(root, &skip))
    } else {
        join_paragraphs(paragraphs)
    }
}

/// Whole page rendered to text.
fn raw_body_text(html: &str) -> String {
    match html2text::from_read(html.as_bytes(), 10_000) {
        Ok(text) => collapse_whitespace(&decode_entities(&text)),
        Err(e) => {
            tracing::debug!("Failed to convert HTML to text: {}", e);
            String::new()
        }
    }
}

fn container_text(el: ElementRef, skip: &Selector) -> String {
    let paragraphs = block_text(el, skip);
    if paragraphs.is_empty() {
        clean(&visible_text(el, skip))
    } else {
        join_paragraphs(paragraphs)
    }
}

/// Text of block and list elements under `root` in document order. Blocks
/// nested in other blocks are covered by their parent.
fn block_text(root: ElementRef, skip: &Selector) -> Vec<String> {
    let blocks = selector(BLOCKS);
    root.select(&blocks)
        .filter(|el| !is_skipped(el, skip) && !has_matching_ancestor(el, &blocks, Some(root)))
        .map(|el| clean(&visible_text(el, skip)))
        .filter(|text| !text.is_empty())
        .collect()
}

fn visible_text(el: ElementRef, skip: &Selector) -> String {
    let mut out = String::new();
    collect_text(el, skip, &mut out);
    out
}

fn collect_text(el: ElementRef, skip: &Selector, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if child_el.value().name() == "br" {
                out.push(' ');
            } else if !skip.matches(&child_el) {
                collect_text(child_el, skip, out);
                out.push(' ');
            }
        }
    }
}

fn is_skipped(el: &ElementRef, skip: &Selector) -> bool {
    skip.matches(el) || has_matching_ancestor(el, skip, None)
}

/// True when an ancestor of `el` (below `stop`, if given) matches `sel`.
fn has_matching_ancestor(el: &ElementRef, sel: &Selector, stop: Option<ElementRef>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .take_while(|a| stop.map_or(true, |s| a.id() != s.id()))
        .any(|a| sel.matches(&a))
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::text::ENTITY;
    use crate::testing::CountingPages;

    fn extractor(pages: Arc<CountingPages>) -> ContentExtractor {
        ContentExtractor::new(pages, SelectorTable::builtin(), 100, 80)
    }

    fn item(link: &str, content: Option<&str>) -> FeedItem {
        FeedItem {
            title: "Title".into(),
            link: link.into(),
            content: content.map(Into::into),
            published_at: None,
            author: None,
        }
    }

    fn sentence(topic: &str) -> String {
        format!("The {topic} section explains concrete results with enough words to count as real prose.")
    }

    #[test]
    fn embedded_blocks_skip_boilerplate() {
        let html = format!(
            r#"<div>
                <h2>Heading &amp; more</h2>
                <p>{}</p>
                <div class="promo"><p>Subscribe now for deals</p></div>
                <figure><img src="x.png"><figcaption>Caption text</figcaption></figure>
                <ul><li>first &nbsp; point</li><li><p>nested paragraph</p></li></ul>
                <table><tr><td>cell</td></tr></table>
            </div>"#,
            sentence("opening")
        );
        let text = embedded_text(&html);
        let paragraphs: Vec<&str> = text.split("\n\n").collect();

        assert_eq!(paragraphs[0], "Heading & more");
        assert_eq!(paragraphs[1], sentence("opening"));
        assert_eq!(paragraphs[2], "first point");
        assert_eq!(paragraphs[3], "nested paragraph");
        assert_eq!(paragraphs.len(), 4);
        assert!(!text.contains("Subscribe"));
        assert!(!text.contains("Caption"));
        assert!(!text.contains("cell"));
    }

    #[test]
    fn embedded_without_blocks_uses_all_text() {
        let text = embedded_text("Plain &lt;b&gt;escaped&lt;/b&gt; <span>text</span> only");
        assert_eq!(text, "Plain <b>escaped</b> text only");
    }

    #[tokio::test]
    async fn inline_content_skips_page_fetch() {
        let pages = Arc::new(CountingPages::default());
        let html = format!("<p>{}</p><p>{}</p>", sentence("first"), sentence("second"));

        let extraction = extractor(pages.clone())
            .extract(&item("https://example.com/a", Some(&html)))
            .await
            .unwrap();

        assert_eq!(extraction.stage, ExtractionStage::Embedded);
        assert_eq!(pages.calls(), 0);
    }

    #[tokio::test]
    async fn short_inline_content_falls_back_to_domain_selectors() {
        let pages = Arc::new(CountingPages::default());
        pages.set(
            "https://www.wired.com/story/x",
            &format!(
                r#"<html><body>
                    <nav><p>{}</p></nav>
                    <div class="body__inner-container"><p>{}</p><p>{}</p></div>
                </body></html>"#,
                sentence("navigation"),
                sentence("wired"),
                sentence("closing")
            ),
        );

        let extraction = extractor(pages.clone())
            .extract(&item("https://www.wired.com/story/x", Some("<p>Teaser</p>")))
            .await
            .unwrap();

        assert_eq!(extraction.stage, ExtractionStage::DomainSelectors);
        assert_eq!(
            extraction.text,
            format!("{}\n\n{}", sentence("wired"), sentence("closing"))
        );
        assert_eq!(pages.calls(), 1);
    }

    #[test]
    fn nested_domain_containers_are_read_once() {
        let ex = extractor(Arc::new(CountingPages::default()));
        let html = format!(
            "<html><body><article><p>{}</p><article><p>{}</p></article></article></body></html>",
            sentence("outer"),
            sentence("inner")
        );

        let result = ex.extract_page("https://unknown.example/nested", &html).unwrap();

        assert_eq!(result.stage, ExtractionStage::DomainSelectors);
        assert_eq!(result.text.matches("outer section").count(), 1);
        assert_eq!(result.text.matches("inner section").count(), 1);
    }

    #[test]
    fn generic_containers_then_paragraphs_then_body() {
        let ex = extractor(Arc::new(CountingPages::default()));

        let generic = format!(
            r#"<html><body><div class="post-wrapper"><div class="post-body"><p>{}</p><p>{}</p></div></div></body></html>"#,
            sentence("generic"),
            sentence("again")
        );
        let result = ex.extract_page("https://unknown.example/post", &generic).unwrap();
        assert_eq!(result.stage, ExtractionStage::GenericBlocks);
        assert_eq!(result.text.matches("generic section").count(), 1);

        let bare = format!(
            r#"<html><body><div><p>Short nav text</p><p>{}</p><p>{}</p></div></body></html>"#,
            sentence("bare"),
            sentence("other")
        );
        let result = ex.extract_page("https://unknown.example/bare", &bare).unwrap();
        assert_eq!(result.stage, ExtractionStage::Paragraphs);
        assert!(!result.text.contains("Short nav text"));

        let body = format!(
            "<html><body><div>{} {}</div></body></html>",
            sentence("div"),
            sentence("only")
        );
        let result = ex.extract_page("https://unknown.example/raw", &body).unwrap();
        assert_eq!(result.stage, ExtractionStage::RawBody);
        assert!(result.text.contains("div section"));
    }

    #[tokio::test]
    async fn unreachable_page_is_insufficient() {
        let pages = Arc::new(CountingPages::default());
        let err = extractor(pages.clone())
            .extract(&item("https://down.example/a", Some("")))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InsufficientContent { chars: 0, .. }));
        assert_eq!(pages.calls(), 1);
    }

    #[tokio::test]
    async fn tiny_page_is_insufficient() {
        let pages = Arc::new(CountingPages::default());
        pages.set("https://tiny.example/a", "<html><body><p>Too short.</p></body></html>");

        let err = extractor(pages)
            .extract(&item("https://tiny.example/a", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientContent { .. }));
    }

    #[tokio::test]
    async fn accepted_text_is_long_and_entity_free() {
        let pages = Arc::new(CountingPages::default());
        let html = format!(
            "<p>R&amp;D &amp;amp; &#8220;quotes&#8221; &nbsp; {}</p><p>{}</p>",
            sentence("entity"),
            sentence("tail")
        );

        let extraction = extractor(pages)
            .extract(&item("https://example.com/e", Some(&html)))
            .await
            .unwrap();

        assert!(char_len(&extraction.text) >= 100);
        assert!(!ENTITY.is_match(&extraction.text));
        assert!(extraction.text.starts_with("R&D & \u{201c}quotes\u{201d} The entity"));
    }
}
