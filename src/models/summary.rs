use serde::{Deserialize, Serialize};

/// Which summary columns the store provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryShape {
    /// A single `summary` column.
    Legacy,
    /// `short_summary` plus `detailed_summary`.
    TwoTier,
}

impl SummaryShape {
    pub fn has_detailed_summary(self) -> bool {
        matches!(self, SummaryShape::TwoTier)
    }
}

/// Model output for one article, before it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryDraft {
    pub short: String,
    pub detailed: Option<String>,
}
