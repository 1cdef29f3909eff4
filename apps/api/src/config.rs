use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::captions::orchestrator::DEFAULT_MAX_CONCURRENCY;
use crate::llm_client::{LlmSettings, DEFAULT_MODEL};

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a value does not parse.
#[derive(Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub llm_timeout_secs: u64,
    pub llm_temperature: f32,
    pub llm_max_output_tokens: u32,
    pub llm_max_retries: u32,
    pub llm_backoff_base_ms: u64,
    pub variant_concurrency: usize,
    pub max_variants_per_request: u32,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_model: optional_env("GEMINI_MODEL", DEFAULT_MODEL.to_string())?,
            llm_timeout_secs: optional_env("LLM_TIMEOUT_SECS", 30)?,
            llm_temperature: optional_env("LLM_TEMPERATURE", 0.9)?,
            llm_max_output_tokens: optional_env("LLM_MAX_OUTPUT_TOKENS", 256)?,
            llm_max_retries: optional_env("LLM_MAX_RETRIES", 2)?,
            llm_backoff_base_ms: optional_env("LLM_BACKOFF_BASE_MS", 500)?,
            variant_concurrency: optional_env("VARIANT_CONCURRENCY", DEFAULT_MAX_CONCURRENCY)?,
            max_variants_per_request: optional_env("MAX_VARIANTS_PER_REQUEST", 10)?,
            port: optional_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings {
            api_key: self.gemini_api_key.clone(),
            model: self.gemini_model.clone(),
            timeout: Duration::from_secs(self.llm_timeout_secs),
            temperature: self.llm_temperature,
            max_output_tokens: self.llm_max_output_tokens,
            max_retries: self.llm_max_retries,
            backoff_base_ms: self.llm_backoff_base_ms,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("gemini_api_key", &"<redacted>")
            .field("gemini_model", &self.gemini_model)
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("llm_max_retries", &self.llm_max_retries)
            .field("variant_concurrency", &self.variant_concurrency)
            .field("max_variants_per_request", &self.max_variants_per_request)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            gemini_api_key: "test-key".to_string(),
            gemini_model: "gemini-test".to_string(),
            llm_timeout_secs: 5,
            llm_temperature: 0.9,
            llm_max_output_tokens: 256,
            llm_max_retries: 0,
            llm_backoff_base_ms: 0,
            variant_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_variants_per_request: 10,
            port: 0,
            rust_log: "debug".to_string(),
        }
    }
}
