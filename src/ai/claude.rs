use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

use super::{LanguageModel, ModelProfile};

const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

pub struct ClaudeClient {
    client: Client,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl ClaudeClient {
    pub fn new(api_key: String, model: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key,
            model,
            timeout_secs,
        })
    }
}

#[async_trait]
impl LanguageModel for ClaudeClient {
    async fn complete(&self, prompt: &str, profile: ModelProfile) -> Result<String> {
        let request = MessageRequest {
            model: &self.model,
            max_tokens: profile.max_tokens(),
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            temperature: profile.temperature(),
        };

        let response = self
            .client
            .post(CLAUDE_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.map_err(|e| self.classify(e))?;
            return Err(AppError::ClaudeApi(format!("HTTP {status}: {error_text}")));
        }

        let message_response: MessageResponse =
            response.json().await.map_err(|e| self.classify(e))?;

        let text = message_response
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");

        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::ClaudeApi("empty completion".into()));
        }
        Ok(text.to_string())
    }

    fn model_version(&self) -> &str {
        &self.model
    }
}

impl ClaudeClient {
    fn classify(&self, err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            AppError::ModelTimeout(self.timeout_secs)
        } else {
            AppError::Http(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_unset_temperature() {
        let request = MessageRequest {
            model: DEFAULT_MODEL,
            max_tokens: ModelProfile::Concise.max_tokens(),
            messages: vec![Message {
                role: "user",
                content: "hello",
            }],
            temperature: ModelProfile::Concise.temperature(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_tokens"], 800);
        assert!(json.get("temperature").is_none());
        assert_eq!(json["messages"][0]["content"], "hello");
    }

    #[test]
    fn response_joins_text_blocks() {
        let response: MessageResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"one"},{"type":"tool_use"},{"type":"text","text":"two"}]}"#,
        )
        .unwrap();
        let text: Vec<String> = response.content.into_iter().filter_map(|b| b.text).collect();
        assert_eq!(text, vec!["one", "two"]);
    }
}
