use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::models::{SummaryDraft, SummaryShape};
use crate::services::text::truncate_chars;

use super::{complete_within, render, LanguageModel, ModelProfile, Prompt};

/// Produces article summaries in the shape the store can hold.
pub struct Summarizer {
    model: Arc<dyn LanguageModel>,
    shape: SummaryShape,
    timeout: Duration,
    max_input_chars: usize,
}

impl Summarizer {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        shape: SummaryShape,
        timeout: Duration,
        max_input_chars: usize,
    ) -> Self {
        Self {
            model,
            shape,
            timeout,
            max_input_chars,
        }
    }

    pub fn shape(&self) -> SummaryShape {
        self.shape
    }

    /// Short summary always; the detailed one only for two-tier stores. A
    /// failed detailed call leaves `detailed` empty and keeps the short text.
    pub async fn summarize(&self, article_text: &str) -> Result<SummaryDraft> {
        let content = truncate_chars(article_text, self.max_input_chars);

        let short = self.generate(Prompt::ShortSummary, content).await?;
        let detailed = if self.shape.has_detailed_summary() {
            match self.generate(Prompt::DetailedSummary, content).await {
                Ok(text) => Some(text),
                Err(e) => {
                    tracing::warn!(error = %e, timeout = e.is_timeout(), "detailed summary failed");
                    None
                }
            }
        } else {
            None
        };

        Ok(SummaryDraft { short, detailed })
    }

    async fn generate(&self, prompt: Prompt, content: &str) -> Result<String> {
        let prompt = render(prompt, content);
        let text =
            complete_within(self.model.as_ref(), &prompt, ModelProfile::Default, self.timeout)
                .await?;
        Ok(text.trim().to_string())
    }
}
