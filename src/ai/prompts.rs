//! Instruction templates. `{{content}}` is replaced with the input text.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    ShortSummary,
    DetailedSummary,
    WeeklyOverview,
}

const PLACEHOLDER: &str = "{{content}}";

const SHORT_SUMMARY: &str = "You are an expert article summarizer tasked with creating a concise summary of the article below.

Create a BRIEF summary of 1-2 sentences that captures the key information.
Focus on the core message and any unique insights.
Avoid filler phrases like 'this article discusses' or 'the author explains'.
Maximize information density with specific details.

ARTICLE:
{{content}}";

const DETAILED_SUMMARY: &str = "Extract only meaningful, insightful content from the article below.

Create a detailed summary that captures only the meaningful information.

Include:
- Unique or interesting statements and claims
- Novel insights, perspectives and implications
- Specific, practical advice for consumers or builders
- Concrete comparisons between products or models, with strengths and weaknesses
- Recent or upcoming releases if they are impactful

Exclude:
- Common or trite observations
- General background information familiar to practitioners
- Filler content and boilerplate descriptions

ONLY return plain text, no markdown. Do not add any filler text, headings or formatting.

ARTICLE:
{{content}}";

const WEEKLY_OVERVIEW: &str = "Create a weekly overview of recent developments.

Below are summaries of articles published in the past 7 days.
Create a comprehensive overview of substantive developments, releases, and insights or advice from these articles.
Avoid fuzzy web-copy language; be very concrete and focus on specific details and advice.

The audience is the staff of a software studio whose job is to imagine, build and sell applications on top of these developments.

Use absolutely no filler language. Be extremely direct and concrete. Your purpose is to inform, not to entertain.
Be concise and focus on the most important information.

Avoid weak constructions like \"suggesting\", \"emphasizing the need for\" or \"offering new directions\". Instead state what has happened, what will likely happen, and how businesses should react where relevant.
Never describe a product as offering improved or enhanced capabilities without naming the specific improvements.

ARTICLES FROM PAST 7 DAYS:
{{content}}";

impl Prompt {
    fn template(self) -> &'static str {
        match self {
            Prompt::ShortSummary => SHORT_SUMMARY,
            Prompt::DetailedSummary => DETAILED_SUMMARY,
            Prompt::WeeklyOverview => WEEKLY_OVERVIEW,
        }
    }
}

pub fn render(prompt: Prompt, content: &str) -> String {
    prompt.template().replacen(PLACEHOLDER, content, 1)
}
