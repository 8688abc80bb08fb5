//! LLM summarizer: turns one horse's context into a short judgment.
//!
//! The summarizer is built once at startup and passed into the pipeline. When
//! no API key is configured it is built as `Unavailable`, and every call fails
//! with a horse-scoped error instead of aborting the run.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::SummarizerConfig;
use crate::error::SummarizerError;
use crate::types::{HorseContext, Judgment};

const SYSTEM_PROMPT: &str = "あなたは競馬の予想家です。与えられた出走馬の情報(出馬表の項目、近走成績、特徴量、血統)から、\
この馬の強み・弱み・評価理由・今回の条件への適性を日本語で簡潔に述べてください。\
必ず JSON オブジェクト {\"strong\": string, \"weak\": string, \"reason\": string, \"suitability\": string} のみを返してください。";

/// Produces a narrative judgment for one horse
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, context: &HorseContext<'_>) -> Result<Judgment, SummarizerError>;
}

/// Summarizer that always fails with the reason it could not be built
pub struct UnavailableSummarizer {
    reason: String,
}

impl UnavailableSummarizer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Summarizer for UnavailableSummarizer {
    async fn summarize(&self, _context: &HorseContext<'_>) -> Result<Judgment, SummarizerError> {
        Err(SummarizerError::Unavailable(self.reason.clone()))
    }
}

/// OpenAI-compatible chat completions client
pub struct OpenAiSummarizer {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: serde_json::Value,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponseRaw {
    choices: Vec<ChoiceRaw>,
}

#[derive(Deserialize)]
struct ChoiceRaw {
    message: MessageRaw,
}

#[derive(Deserialize)]
struct MessageRaw {
    content: Option<String>,
}

impl OpenAiSummarizer {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SummarizerError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SummarizerError::Unavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, context: &HorseContext<'_>) -> Result<Judgment, SummarizerError> {
        let user_prompt =
            serde_json::to_string(context).map_err(|e| SummarizerError::Parse(e.to_string()))?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            response_format: serde_json::json!({ "type": "json_object" }),
            temperature: 0.2,
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Summarizer request failed");
                SummarizerError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Summarizer API error");
            return Err(SummarizerError::Api(format!("{}: {}", status, error_text)));
        }

        let raw: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| SummarizerError::Parse(e.to_string()))?;

        let content = raw
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| SummarizerError::Parse("empty completion".to_string()))?;

        debug!(horse = %context.entry.horse_name, "Summarizer returned {} bytes", content.len());
        parse_judgment(&content)
    }
}

/// Parse the model's JSON answer, tolerating a fenced code block around it
pub fn parse_judgment(content: &str) -> Result<Judgment, SummarizerError> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(body).map_err(|e| SummarizerError::Parse(e.to_string()))
}

/// Build the configured summarizer, or an unavailable one explaining why not
pub fn from_config(config: &SummarizerConfig) -> Arc<dyn Summarizer> {
    if !config.enabled {
        return Arc::new(UnavailableSummarizer::new("summarizer disabled"));
    }

    let api_key = match std::env::var(&config.api_key_env) {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            warn!("{} not set; narratives disabled", config.api_key_env);
            return Arc::new(UnavailableSummarizer::new(format!(
                "{} not set",
                config.api_key_env
            )));
        }
    };

    match OpenAiSummarizer::new(
        api_key,
        &config.base_url,
        &config.model,
        Duration::from_secs(config.timeout_secs),
    ) {
        Ok(client) => Arc::new(client),
        Err(e) => Arc::new(UnavailableSummarizer::new(e.to_string())),
    }
}
