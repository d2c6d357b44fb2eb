use std::collections::HashMap;

/// Containers tried on hosts without an entry of their own.
const DEFAULT_SELECTORS: &[&str] = &[
    "article",
    "div.article-content",
    "div.main-content",
    "div.article-body",
    "div.post-content",
    "div.entry-content",
    "section.content",
    "main",
];

/// Site-specific article containers, most specific first.
const BUILTIN_DOMAINS: &[(&str, &[&str])] = &[
    ("oneusefulthing.org", &["div.available-content", "div.body.markup", "article"]),
    ("substack.com", &["div.available-content", "div.body.markup", "article"]),
    ("every.to", &["article div.prose", "div.prose", "article"]),
    ("wired.com", &["div.body__inner-container", "article"]),
    ("theverge.com", &["div.duet--article--article-body-component", "article"]),
    ("techcrunch.com", &["div.entry-content", "div.article-content", "article"]),
    ("medium.com", &["article section", "article"]),
    ("arstechnica.com", &["div.post-content", "article"]),
    ("technologyreview.com", &["div.gutenbergContent", "div[class*=contentBody]", "article"]),
    ("venturebeat.com", &["div.article-content", "article"]),
];

/// Hostname to ordered CSS selector list, with a default entry.
#[derive(Debug, Clone)]
pub struct SelectorTable {
    domains: HashMap<String, Vec<String>>,
    default: Vec<String>,
}

impl SelectorTable {
    pub fn builtin() -> Self {
        let domains = BUILTIN_DOMAINS
            .iter()
            .map(|(host, selectors)| {
                (
                    host.to_string(),
                    selectors.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect();

        Self {
            domains,
            default: DEFAULT_SELECTORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Built-ins with `overrides` layered on top; an override replaces the
    /// whole list for its host.
    pub fn with_overrides(overrides: &HashMap<String, Vec<String>>) -> Self {
        let mut table = Self::builtin();
        for (host, selectors) in overrides {
            table.insert(host, selectors.clone());
        }
        table
    }

    pub fn insert(&mut self, host: &str, selectors: Vec<String>) {
        self.domains.insert(normalize_host(host).to_string(), selectors);
    }

    /// Selectors for `host`, trying the host itself, then each parent domain.
    pub fn selectors_for(&self, host: &str) -> &[String] {
        let lowered = host.to_ascii_lowercase();
        let mut candidate = normalize_host(&lowered);

        loop {
            if let Some(selectors) = self.domains.get(candidate) {
                return selectors;
            }
            match candidate.split_once('.') {
                Some((_, parent)) if parent.contains('.') => candidate = parent,
                _ => return self.default_selectors(),
            }
        }
    }

    pub fn default_selectors(&self) -> &[String] {
        &self.default
    }
}

impl Default for SelectorTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize_host(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}
