//! Bounded retry with exponential backoff around a single LLM call.
//!
//! Every attempt is wrapped in its own timeout. Rate-limit responses stretch
//! the delay to at least the provider's `retry-after`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::llm::client::{LlmClient, LlmError};
use crate::llm::types::{CompletionRequest, CompletionResponse};

/// How many times and how patiently to call a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts per call, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt (milliseconds).
    pub base_delay_ms: u64,
    /// Ceiling on the exponential part of the delay (milliseconds).
    pub max_delay_ms: u64,
    /// Per-attempt timeout (milliseconds).
    pub call_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2_000,
            max_delay_ms: 60_000,
            call_timeout_ms: 300_000,
        }
    }
}

impl RetryPolicy {
    /// Policy with no waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
            ..Default::default()
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Delay after the given failed attempt (1-based).
    ///
    /// `base * 2^(attempt-1)` capped at `max_delay`, but never shorter than a
    /// rate limit's `retry_after`.
    pub fn delay_for(&self, attempt: u32, err: &LlmError) -> Duration {
        let exp = 2u64.saturating_pow(attempt.saturating_sub(1).min(16));
        let backoff = Duration::from_millis(self.base_delay_ms.saturating_mul(exp).min(self.max_delay_ms));

        match err {
            LlmError::RateLimited { retry_after } => backoff.max(*retry_after),
            _ => backoff,
        }
    }
}

/// Call `client` until it succeeds, fails permanently, or attempts run out.
///
/// Returns the last error when every attempt fails.
pub async fn complete_with_retry(
    client: &dyn LlmClient,
    request: &CompletionRequest,
    policy: &RetryPolicy,
) -> Result<CompletionResponse, LlmError> {
    let attempts = policy.max_attempts.max(1);
    let timeout = policy.call_timeout();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let result = match tokio::time::timeout(timeout, client.complete(request.clone())).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(timeout)),
        };

        let err = match result {
            Ok(response) => {
                if attempt > 1 {
                    log::debug!("LLM call succeeded on attempt {}/{}", attempt, attempts);
                }
                return Ok(response);
            }
            Err(e) => e,
        };

        if !err.is_retryable() {
            log::warn!("LLM call failed permanently: {}", err);
            return Err(err);
        }

        if attempt >= attempts {
            log::warn!("LLM call failed after {} attempts: {}", attempts, err);
            return Err(err);
        }

        let delay = policy.delay_for(attempt, &err);
        tracing::warn!(
            attempt,
            max_attempts = attempts,
            delay_ms = delay.as_millis() as u64,
            rate_limited = err.is_rate_limit(),
            "LLM call failed, retrying: {}",
            err
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
