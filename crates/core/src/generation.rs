//! Generation Client
//!
//! Sends a prompt to the external text-generation endpoint and returns the
//! best candidate's text. The trait is the seam used by the aggregator and
//! by tests; `GeminiClient` is the production implementation.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-pro";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a generation call failed. Each variant tells the caller whether
/// trying again can help.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("generation endpoint rejected the request: {0}")]
    InvalidRequest(String),
    #[error("generation endpoint rejected the credential: {0}")]
    Unauthorized(String),
    #[error("generation endpoint rate limit exceeded: {0}")]
    RateLimited(String),
    #[error("generation endpoint server error ({status}): {message}")]
    ServerError { status: u16, message: String },
    #[error("generation call timed out")]
    Timeout,
    #[error("generation endpoint unreachable: {0}")]
    NetworkUnavailable(String),
    #[error("generation endpoint returned no usable text: {0}")]
    MalformedResponse(String),
}

impl GenerationError {
    /// Whether the same call may succeed if repeated later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GenerationError::RateLimited(_)
                | GenerationError::ServerError { .. }
                | GenerationError::Timeout
                | GenerationError::NetworkUnavailable(_)
        )
    }

    fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                GenerationError::Unauthorized(message)
            }
            StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited(message),
            s if s.is_server_error() => GenerationError::ServerError {
                status: s.as_u16(),
                message,
            },
            _ => GenerationError::InvalidRequest(message),
        }
    }

    fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GenerationError::Timeout
        } else if err.is_decode() {
            GenerationError::MalformedResponse(err.to_string())
        } else {
            GenerationError::NetworkUnavailable(err.to_string())
        }
    }
}

/// A client for any text-generation backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Sends `prompt` and returns the text of the single best candidate.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Fixed sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingParameters {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for SamplingParameters {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 2048,
        }
    }
}

/// Retries for transient failures, with the delay doubling each attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const NONE: RetryPolicy = RetryPolicy {
        max_retries: 0,
        base_delay: Duration::from_millis(500),
    };

    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::NONE
    }
}

// --- Gemini wire types ---

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: SamplingParameters,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Deserialize, Debug)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Debug)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    message: String,
}

/// A `GenerationClient` for the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    sampling: SamplingParameters,
    retry: RetryPolicy,
}

impl GeminiClient {
    /// Creates a client for `model` under `api_base`.
    ///
    /// `timeout` bounds each HTTP attempt; an attempt that exceeds it is
    /// reported as `GenerationError::Timeout`.
    pub fn new(
        api_key: impl Into<String>,
        api_base: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            endpoint: format!(
                "{}/models/{}:generateContent",
                api_base.trim_end_matches('/'),
                model
            ),
            sampling: SamplingParameters::default(),
            retry: RetryPolicy::NONE,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn generate_once(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: self.sampling,
            safety_settings: SAFETY_CATEGORIES
                .into_iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: SAFETY_THRESHOLD,
                })
                .collect(),
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(GenerationError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(GenerationError::from_status(status, message));
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(GenerationError::from_transport)?;

        let candidate = payload
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::MalformedResponse("no candidates".to_string()))?;

        let finish_reason = candidate.finish_reason;
        candidate
            .content
            .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
            .ok_or_else(|| {
                GenerationError::MalformedResponse(format!(
                    "candidate has no text (finish reason: {})",
                    finish_reason.as_deref().unwrap_or("unknown")
                ))
            })
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut attempt = 0;
        loop {
            debug!(attempt, endpoint = %self.endpoint, "Sending generation request");
            match self.generate_once(prompt).await {
                Ok(text) => {
                    info!(chars = text.chars().count(), "Received generation response");
                    return Ok(text);
                }
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(error = %e, attempt, ?delay, "Transient generation failure, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
