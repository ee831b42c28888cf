//! Text-generation client for the marketplace.
//!
//! Every Anthropic Messages API call goes through `LlmClient`; feature modules
//! (skill suggestion today) wrap it behind their own trait.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Model behind skill suggestion; logged at startup.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("model reply is not the expected JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model API still throttled after {retries} attempts")]
    RateLimited { retries: u32 },

    #[error("model reply had no text block")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// First text block; thinking and tool blocks are skipped.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Wraps the Anthropic Messages API with retry logic and a JSON helper.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, api_key })
    }

    /// One user turn against `MODEL`. Throttling, server errors and transport
    /// failures are retried up to `MAX_RETRIES` attempts in total.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error = None;
        for attempt in 0..MAX_RETRIES {
            if let Some(delay) = backoff_delay(attempt) {
                warn!(attempt, delay_ms = delay.as_millis() as u64, "retrying skill model call");
                tokio::time::sleep(delay).await;
            }

            match self.send_once(&request_body).await {
                Attempt::Done(response) => return Ok(response),
                Attempt::Fatal(err) => return Err(err),
                Attempt::Retry(err) => last_error = Some(err),
            }
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    async fn send_once(&self, body: &AnthropicRequest<'_>) -> Attempt {
        let response = match self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Attempt::Retry(LlmError::Http(e)),
        };

        let status = response.status();
        if status.is_success() {
            return match response.json::<LlmResponse>().await {
                Ok(parsed) => {
                    debug!(
                        input_tokens = parsed.usage.input_tokens,
                        output_tokens = parsed.usage.output_tokens,
                        "skill model call succeeded"
                    );
                    Attempt::Done(parsed)
                }
                Err(e) => Attempt::Fatal(LlmError::Http(e)),
            };
        }

        let body = response.text().await.unwrap_or_default();
        let err = LlmError::Api {
            status: status.as_u16(),
            message: api_error_message(body),
        };
        if is_retryable(status) {
            warn!("model API returned {status}: {err}");
            Attempt::Retry(err)
        } else {
            Attempt::Fatal(err)
        }
    }

    /// Calls the model and deserializes its text reply as JSON.
    /// The prompt must ask for JSON only.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let response = self.call(prompt, system).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        Ok(serde_json::from_str(strip_json_fences(text))?)
    }
}

enum Attempt {
    Done(LlmResponse),
    Retry(LlmError),
    Fatal(LlmError),
}

/// No wait before the first attempt, then 1s, 2s, 4s...
fn backoff_delay(attempt: u32) -> Option<Duration> {
    (attempt > 0).then(|| Duration::from_secs(1 << (attempt - 1)))
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// The API's `error.message` when the body has one, else the raw body.
fn api_error_message(body: String) -> String {
    serde_json::from_str::<AnthropicError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

/// Models sometimes wrap JSON in a markdown fence despite the system prompt.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(fenced) = text.strip_prefix("```") else {
        return text;
    };
    let fenced = fenced.strip_prefix("json").unwrap_or(fenced).trim_start();
    fenced.strip_suffix("```").unwrap_or(fenced).trim()
}
