use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    pub id: i64,
    pub url: String,
    pub name: Option<String>,
    pub archived: bool,
}

impl Feed {
    /// Name shown in digests; falls back to the url.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }
}
