/// LLM Client: the single point of entry for all Gemini API calls in the workbench.
///
/// ARCHITECTURAL RULE: No other module may call the generative-language API directly.
/// Pipeline code depends on the `TextGenerator` trait, never on `LlmClient` itself,
/// so batches can run against stubs in tests and against several configurations at once.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod prompts;
pub mod retry;

use retry::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Candidate finish reasons Gemini uses when it withholds output on policy grounds.
const BLOCKED_FINISH_REASONS: &[&str] = &["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

/// Coarse failure classes surfaced to callers alongside the error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationErrorReason {
    Timeout,
    RateLimited,
    ProviderRejected,
    Cancelled,
    Unknown,
}

impl GenerationErrorReason {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationErrorReason::Timeout => "timeout",
            GenerationErrorReason::RateLimited => "rate_limited",
            GenerationErrorReason::ProviderRejected => "provider_rejected",
            GenerationErrorReason::Cancelled => "cancelled",
            GenerationErrorReason::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Provider call timed out")]
    Timeout,

    #[error("Rate limited by provider: {0}")]
    RateLimited(String),

    #[error("Provider rejected the request: {0}")]
    ProviderRejected(String),

    #[error("Provider unavailable (status {status}): {message}")]
    Unavailable { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Generation cancelled")]
    Cancelled,
}

impl GenerationError {
    pub fn reason(&self) -> GenerationErrorReason {
        match self {
            GenerationError::Timeout => GenerationErrorReason::Timeout,
            GenerationError::RateLimited(_) => GenerationErrorReason::RateLimited,
            GenerationError::ProviderRejected(_) => GenerationErrorReason::ProviderRejected,
            GenerationError::Cancelled => GenerationErrorReason::Cancelled,
            GenerationError::Unavailable { .. }
            | GenerationError::Transport(_)
            | GenerationError::MalformedResponse(_) => GenerationErrorReason::Unknown,
        }
    }

    /// Timeouts, rate limits, 5xx and connection failures may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GenerationError::Timeout
                | GenerationError::RateLimited(_)
                | GenerationError::Unavailable { .. }
                | GenerationError::Transport(_)
        )
    }

    fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GenerationError::Timeout
        } else {
            GenerationError::Transport(err.to_string())
        }
    }

    fn from_status(status: u16, message: String) -> Self {
        match status {
            408 => GenerationError::Timeout,
            429 => GenerationError::RateLimited(message),
            500..=599 => GenerationError::Unavailable { status, message },
            _ => GenerationError::ProviderRejected(format!("status {status}: {message}")),
        }
    }
}

/// Provider-reported billing units for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Raw output of one provider call.
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// Prompt in, text out. Implemented by `LlmClient` and by test stubs.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Generation, GenerationError>;
}

/// Everything needed to talk to one Gemini model.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Extra attempts on transient failures. 0 disables retries.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

impl GenerateContentResponse {
    fn into_generation(self) -> Result<Generation, GenerationError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GenerationError::ProviderRejected(format!(
                "prompt blocked: {reason}"
            )));
        }

        let usage = self.usage_metadata.map(|u| TokenUsage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        });

        let Some(candidate) = self.candidates.into_iter().next() else {
            return Ok(Generation {
                text: String::new(),
                usage,
            });
        };

        if let Some(reason) = candidate
            .finish_reason
            .as_deref()
            .filter(|r| BLOCKED_FINISH_REASONS.contains(r))
        {
            return Err(GenerationError::ProviderRejected(format!(
                "candidate withheld: {reason}"
            )));
        }

        let text = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
            .unwrap_or_default();

        Ok(Generation { text, usage })
    }
}

/// The single Gemini client used by the workbench.
/// Wraps `generateContent` with timeout, retry, and usage extraction.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
    settings: LlmSettings,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self, reqwest::Error> {
        Self::with_base_url(settings, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(settings: LlmSettings, base_url: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::from_settings(&settings),
            settings,
        })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// One HTTP round trip, no retries.
    async fn call_once(&self, prompt: &str) -> Result<Generation, GenerationError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.settings.model
        );

        let request_body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.settings.api_key)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(GenerationError::from_transport)?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(GenerationError::from_status(status.as_u16(), message));
        }

        let payload: GenerateContentResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout
            } else {
                GenerationError::MalformedResponse(e.to_string())
            }
        })?;

        payload.into_generation()
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<Generation, GenerationError> {
        let generation = self.retry.run(|| self.call_once(prompt)).await?;

        if let Some(usage) = generation.usage {
            debug!(
                model = %self.settings.model,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Gemini call succeeded"
            );
        }

        Ok(generation)
    }
}
