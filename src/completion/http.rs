use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{CompletionClient, CompletionRequest, Message};
use crate::error::CapabilityError;
use crate::settings::Settings;

const BASE_BACKOFF_MS: u64 = 2000;

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct HttpCompletionClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout_secs: u64,
    max_attempts: u32,
    base_backoff: Duration,
}

impl HttpCompletionClient {
    pub fn new(
        api_base: &str,
        api_key: Option<String>,
        timeout_secs: u64,
        connect_timeout_secs: u64,
        max_attempts: u32,
    ) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .build()
            .map_err(|e| CapabilityError::Connection(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            api_key: api_key.filter(|k| !k.is_empty()),
            timeout_secs,
            max_attempts: max_attempts.max(1),
            base_backoff: Duration::from_millis(BASE_BACKOFF_MS),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, CapabilityError> {
        Self::new(
            &settings.api_base,
            settings.api_key.clone(),
            settings.request_timeout_secs,
            settings.connect_timeout_secs,
            settings.max_attempts,
        )
        .map(|c| c.with_backoff(Duration::from_millis(settings.retry_backoff_ms)))
    }

    pub fn with_backoff(mut self, base: Duration) -> Self {
        self.base_backoff = base;
        self
    }

    async fn send_once(&self, request: &CompletionRequest) -> Result<String, CapabilityError> {
        let body = ChatRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        };

        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let start = Instant::now();
        let response = builder.send().await.map_err(|e| self.map_transport(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_transport(e))?;
        debug!(
            model = %request.model,
            status = status.as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Completion response"
        );

        if !status.is_success() {
            return Err(status_error(status.as_u16(), text));
        }
        parse_chat_response(&text)
    }

    fn map_transport(&self, e: reqwest::Error) -> CapabilityError {
        if e.is_timeout() {
            CapabilityError::Timeout(self.timeout_secs)
        } else if e.is_decode() {
            CapabilityError::Malformed(e.to_string())
        } else {
            CapabilityError::Connection(e.to_string())
        }
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CapabilityError> {
        let mut attempt = 1;
        loop {
            match self.send_once(request).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let backoff = backoff_delay(self.base_backoff, attempt);
                    warn!(
                        model = %request.model,
                        error = %e,
                        "Completion attempt {}/{} failed, backing off {:.1}s",
                        attempt,
                        self.max_attempts,
                        backoff.as_secs_f64()
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Delay before retrying after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`,
/// saturating instead of overflowing for large attempt counts.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}

fn status_error(status: u16, body: String) -> CapabilityError {
    if status == 429 {
        CapabilityError::Throttled { status }
    } else {
        CapabilityError::Status { status, body }
    }
}

/// Pull the first choice's text out of a chat completion body.
pub fn parse_chat_response(body: &str) -> Result<String, CapabilityError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| CapabilityError::Malformed(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| CapabilityError::Malformed("response has no completion text".into()))
}
