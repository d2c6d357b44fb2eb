//! Plain-text cleanup shared by every extraction stage.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Named, decimal and hex character references.
pub(crate) static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z][a-zA-Z0-9]{1,31});")
        .expect("entity pattern")
});

/// Feeds double-escape often enough that one pass is not always enough.
const MAX_DECODE_PASSES: usize = 3;

/// Decodes HTML character references, including double-escaped ones.
pub fn decode_entities(text: &str) -> String {
    let mut current = text.to_string();
    for _ in 0..MAX_DECODE_PASSES {
        if !ENTITY.is_match(&current) {
            break;
        }
        // Escape '<' so only references are interpreted, never markup.
        let fragment = Html::parse_fragment(&current.replace('<', "&lt;"));
        let decoded: String = fragment.root_element().text().collect();
        if decoded == current {
            break;
        }
        current = decoded;
    }
    current
}

/// Collapses whitespace runs to a single space and trims.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

pub fn clean(text: &str) -> String {
    collapse_whitespace(&decode_entities(text))
}

pub fn join_paragraphs<I>(paragraphs: I) -> String
where
    I: IntoIterator<Item = String>,
{
    paragraphs
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Cuts `text` to at most `max` chars on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
