//! Back-off policy for transient Gemini failures.
//!
//! Only errors for which [`GenerationError::is_transient`] holds are retried.
//! Policy rejections and malformed responses come back on the first attempt:
//! resending the same prompt will not change the outcome.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use super::{GenerationError, LlmSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first call. 0 disables retries.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub const MAX_DELAY: Duration = Duration::from_secs(60);

    pub fn from_settings(settings: &LlmSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.backoff_base_ms),
            max_delay: Self::MAX_DELAY,
        }
    }

    /// Sleep before retry number `retry` (1-based): `base × 2^(retry-1)`, capped,
    /// then scaled by a random factor in `[0.75, 1.25]` and capped again.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let doublings = retry.saturating_sub(1).min(16);
        let capped = self
            .base_delay
            .saturating_mul(1 << doublings)
            .min(self.max_delay);
        let jitter = rand::thread_rng().gen_range(0.75..=1.25);
        capped.mul_f64(jitter).min(self.max_delay)
    }

    /// Calls `attempt` until it succeeds, fails permanently, or retries run out.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T, GenerationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        let mut retry = 0;
        loop {
            let err = match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if retry >= self.max_retries || !err.is_transient() {
                return Err(err);
            }

            retry += 1;
            let delay = self.delay_for(retry);
            warn!(
                retry,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                reason = err.reason().as_str(),
                error = %err,
                "Gemini call failed, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
