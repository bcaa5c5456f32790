//! OpenAI-compatible chat-completions analyzer (Groq by default).
//!
//! Sends the fixed system prompt plus the fenced code, asks for a JSON-only
//! reply (`response_format = json_object`) at a low temperature, and checks
//! the reply against the feedback schema. No retries: a failed call fails
//! the review.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::analyzer::{AnalysisError, AnalysisRequest, CodeAnalyzer, SYSTEM_PROMPT, parse_feedback};
use crate::models::review::ReviewFeedback;

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const TEMPERATURE: f32 = 0.3;

/// Analyzer endpoint settings.
#[derive(Clone)]
pub struct AnalyzerConfig {
    /// Bearer key. Without it every analysis fails with `Config`.
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API, without `/chat/completions`.
    pub base_url: String,
    pub model: String,
    /// Upper bound on one analysis call.
    pub timeout: Duration,
}

impl std::fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl AnalyzerConfig {
    /// Reads analyzer settings from the environment.
    ///
    /// | Variable                | Default                           |
    /// |-------------------------|-----------------------------------|
    /// | `GROQ_API_KEY`          | unset                             |
    /// | `ANALYZER_BASE_URL`     | `https://api.groq.com/openai/v1`  |
    /// | `ANALYZER_MODEL`        | `llama-3.3-70b-versatile`         |
    /// | `ANALYZER_TIMEOUT_SECS` | `60`                              |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("GROQ_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: std::env::var("ANALYZER_BASE_URL").unwrap_or(defaults.base_url),
            model: std::env::var("ANALYZER_MODEL").unwrap_or(defaults.model),
            timeout: std::env::var("ANALYZER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Calls `{base_url}/chat/completions`.
pub struct ChatCompletionsAnalyzer {
    client: Client,
    config: AnalyzerConfig,
}

impl ChatCompletionsAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AnalysisError::Config(format!("http client: {e}")))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CodeAnalyzer for ChatCompletionsAnalyzer {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<ReviewFeedback, AnalysisError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| AnalysisError::Config("GROQ_API_KEY is not set".to_string()))?;

        let user_prompt = request.user_prompt();
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: TEMPERATURE,
        };

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalysisError::Timeout(self.config.timeout)
                } else {
                    AnalysisError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data: ChatResponse = resp
            .json()
            .await
            .map_err(|e| AnalysisError::InvalidResponse(format!("chat response parse: {e}")))?;
        let content = data
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(AnalysisError::EmptyResponse)?;

        debug!(model = %self.config.model, bytes = content.len(), "analysis reply received");
        parse_feedback(&content)
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}
