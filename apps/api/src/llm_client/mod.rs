/// LLM Client — the single point of entry for all Gemini API calls in the architect service.
///
/// ARCHITECTURAL RULE: No other module may call the generative-language endpoint directly.
/// All LLM interactions MUST go through this module.
///
/// Model: gemini-2.5-flash-preview-09-2025 (hardcoded — do not make configurable to prevent drift)
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(test)]
pub(crate) mod test_support;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
/// The model used for all proposal generation.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "gemini-2.5-flash-preview-09-2025";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_ATTEMPTS: u32 = 5;
const BASE_DELAY_MS: u64 = 1000;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Gave up after {attempts} attempts, last error: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<LlmError>,
    },
}

// ────────────────────────────────────────────────────────────────────────────
// Wire format
// ────────────────────────────────────────────────────────────────────────────

/// Body of a `generateContent` call: one user turn plus the system instruction.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    system_instruction: SystemInstruction<'a>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

impl<'a> GenerateContentRequest<'a> {
    pub fn new(system: &'a str, prompt: &'a str) -> Self {
        Self {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            system_instruction: SystemInstruction {
                parts: vec![RequestPart { text: system }],
            },
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Transport
// ────────────────────────────────────────────────────────────────────────────

/// One HTTP round-trip to the generative-language endpoint.
///
/// Any `Err` is treated as a retryable failure by [`LlmClient`]; implementations
/// must not retry on their own.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, request: &GenerateContentRequest<'_>) -> Result<Value, LlmError>;
}

/// Production transport for the Gemini `generateContent` API.
pub struct GeminiTransport {
    client: Client,
    /// Sent as a header only, never placed in the URL or logged.
    api_key: SecretString,
    endpoint: String,
}

impl std::fmt::Debug for GeminiTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiTransport")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl GeminiTransport {
    pub fn new(api_key: SecretString) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
            endpoint: format!("{GEMINI_API_BASE}/{MODEL}:generateContent"),
        })
    }
}

#[async_trait]
impl Transport for GeminiTransport {
    async fn post(&self, request: &GenerateContentRequest<'_>) -> Result<Value, LlmError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Retry policy
// ────────────────────────────────────────────────────────────────────────────

/// Timing for a single attempt. Only used to drive the backoff sleep and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptRecord {
    pub attempt_number: u32,
    pub delay_before_ms: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay_ms: BASE_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    /// Attempt `n` (0-indexed) waits `base * 2^(n-1)` first; attempt 0 never waits.
    pub fn attempt(&self, attempt_number: u32) -> AttemptRecord {
        let delay_before_ms = match attempt_number {
            0 => 0,
            n => self
                .base_delay_ms
                .saturating_mul(2u64.saturating_pow(n - 1)),
        };
        AttemptRecord {
            attempt_number,
            delay_before_ms,
        }
    }

    fn last_attempt(&self) -> u32 {
        self.max_attempts.max(1) - 1
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// The single LLM client used by the proposal service.
/// Wraps a [`Transport`] with bounded exponential-backoff retry.
#[derive(Clone)]
pub struct LlmClient {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl LlmClient {
    pub fn new(api_key: SecretString) -> Result<Self, LlmError> {
        let transport = GeminiTransport::new(api_key)?;
        Ok(Self::with_transport(Arc::new(transport)))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            policy: RetryPolicy::default(),
        }
    }

    /// Sends one logical request and returns the decoded response body.
    ///
    /// Every failure is retried the same way regardless of cause, including 4xx
    /// statuses. After the last attempt fails the error is surfaced immediately
    /// as [`LlmError::Exhausted`]. Dropping the future cancels both the pending
    /// HTTP call and any pending backoff sleep.
    pub async fn call(&self, system: &str, prompt: &str) -> Result<Value, LlmError> {
        let request = GenerateContentRequest::new(system, prompt);
        let last_attempt = self.policy.last_attempt();
        let mut record = self.policy.attempt(0);

        loop {
            if record.delay_before_ms > 0 {
                tokio::time::sleep(Duration::from_millis(record.delay_before_ms)).await;
            }

            match self.transport.post(&request).await {
                Ok(raw) => {
                    debug!(
                        "Gemini call succeeded on attempt {}/{}",
                        record.attempt_number + 1,
                        self.policy.max_attempts
                    );
                    return Ok(raw);
                }
                Err(e) if record.attempt_number >= last_attempt => {
                    return Err(LlmError::Exhausted {
                        attempts: record.attempt_number + 1,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    let next = self.policy.attempt(record.attempt_number + 1);
                    warn!(
                        "Gemini call attempt {} failed ({e}), retrying after {}ms...",
                        record.attempt_number + 1,
                        next.delay_before_ms
                    );
                    record = next;
                }
            }
        }
    }
}
