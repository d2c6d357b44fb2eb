mod claude;
mod prompts;
mod summarizer;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, Result};

pub use claude::{ClaudeClient, DEFAULT_MODEL};
pub use prompts::{render, Prompt};
pub use summarizer::Summarizer;

/// Token budget and sampling settings for one kind of request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ModelProfile {
    #[default]
    Default,
    Concise,
    Creative,
}

impl ModelProfile {
    pub fn max_tokens(self) -> u32 {
        match self {
            ModelProfile::Default => 1500,
            ModelProfile::Concise => 800,
            ModelProfile::Creative => 2000,
        }
    }

    pub fn temperature(self) -> Option<f32> {
        match self {
            ModelProfile::Creative => Some(0.7),
            ModelProfile::Default | ModelProfile::Concise => None,
        }
    }
}

/// Text completion backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str, profile: ModelProfile) -> Result<String>;

    fn model_version(&self) -> &str;
}

/// Runs one completion, failing with `ModelTimeout` instead of hanging.
pub async fn complete_within(
    model: &dyn LanguageModel,
    prompt: &str,
    profile: ModelProfile,
    timeout: Duration,
) -> Result<String> {
    match tokio::time::timeout(timeout, model.complete(prompt, profile)).await {
        Ok(result) => result,
        Err(_) => Err(AppError::ModelTimeout(timeout.as_secs())),
    }
}
