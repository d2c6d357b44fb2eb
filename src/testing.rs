//! Fakes of the external collaborators for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::ai::{LanguageModel, ModelProfile};
use crate::error::{AppError, Result};
use crate::feed::FeedSource;
use crate::services::PageSource;

/// Serves canned feed documents; unknown urls are unavailable.
#[derive(Default)]
pub struct ScriptedFeeds {
    documents: Mutex<HashMap<String, String>>,
}

impl ScriptedFeeds {
    pub fn set(&self, url: &str, body: &str) {
        self.documents
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_string());
    }
}

#[async_trait]
impl FeedSource for ScriptedFeeds {
    async fn fetch_feed_document(&self, url: &str) -> Result<Vec<u8>> {
        self.documents
            .lock()
            .unwrap()
            .get(url)
            .map(|body| body.clone().into_bytes())
            .ok_or_else(|| AppError::FeedUnavailable {
                url: url.to_string(),
                reason: "connection refused".into(),
            })
    }
}

/// Serves canned pages and counts every fetch attempt.
#[derive(Default)]
pub struct CountingPages {
    pages: Mutex<HashMap<String, String>>,
    calls: AtomicUsize,
}

impl CountingPages {
    pub fn set(&self, url: &str, html: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), html.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for CountingPages {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::PageUnavailable {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".into(),
            })
    }
}

/// Answers every prompt with a fixed line per prompt kind and records prompts.
#[derive(Default)]
pub struct ScriptedModel {
    prompts: Mutex<Vec<String>>,
    fail_on: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fails any prompt containing `needle`.
    pub fn fail_on(&self, needle: &str) {
        self.fail_on.lock().unwrap().push(needle.to_string());
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str, _profile: ModelProfile) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self
            .fail_on
            .lock()
            .unwrap()
            .iter()
            .any(|needle| prompt.contains(needle.as_str()))
        {
            return Err(AppError::ClaudeApi("HTTP 529: overloaded".into()));
        }

        let reply = if prompt.contains("BRIEF summary") {
            "Short summary."
        } else if prompt.contains("ONLY return plain text") {
            "Detailed summary."
        } else {
            "Weekly overview."
        };
        Ok(reply.to_string())
    }

    fn model_version(&self) -> &str {
        "scripted"
    }
}
