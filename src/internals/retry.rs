//! Retry logic with exponential backoff.
//!
//! Wraps each LLM invocation in a retry loop:
//! - Retry on network errors, timeouts, HTTP 429, and HTTP >= 500
//! - Do not retry on other 4xx or response-body decode failures
//! - Sleep `backoff_seconds * 2^(attempt-1)` between retries, no jitter
//! - Surface the last error when attempts are exhausted; the coordinator
//!   annotates it with batch identity and moves on

use crate::error::{AnalyzerError, AnalyzerResult};
use crate::logging::{log_debug, log_error};

use std::time::Duration;
use tokio::time::sleep;

/// Retry policy configuration for LLM requests.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Base of the exponential backoff, in seconds.
    pub backoff_seconds: u64,
    /// Timeout for each individual attempt.
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_seconds: 2,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (1-based): base * 2^(retry-1).
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry.saturating_sub(1));
        Duration::from_secs(self.backoff_seconds.saturating_mul(factor))
    }
}

/// Retry executor that drives operations through the policy.
#[derive(Debug, Default)]
pub(crate) struct RetryExecutor {
    pub(crate) policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Execute an operation with per-attempt timeout and retry on
    /// transient failures.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> AnalyzerResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = AnalyzerResult<T>>,
    {
        let attempts = self.policy.max_retries + 1;
        let mut last_error: Option<AnalyzerError> = None;

        for attempt in 1..=attempts {
            if attempt > 1 {
                let delay = self.policy.backoff_delay(attempt - 1);
                log_debug!(
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying after backoff"
                );
                sleep(delay).await;
            }

            let result = tokio::time::timeout(self.policy.request_timeout, operation()).await;

            match result {
                Ok(Ok(value)) => {
                    log_debug!(attempt = attempt, "Request succeeded");
                    return Ok(value);
                }
                Ok(Err(error)) => {
                    if !error.is_retryable() {
                        return Err(error);
                    }
                    log_debug!(
                        attempt = attempt,
                        attempts = attempts,
                        error = %error,
                        "Transient failure"
                    );
                    last_error = Some(error);
                }
                Err(_elapsed) => {
                    last_error = Some(AnalyzerError::timeout(
                        self.policy.request_timeout.as_secs(),
                    ));
                }
            }
        }

        let final_error = last_error.unwrap_or_else(|| {
            AnalyzerError::request_failed("Maximum retry attempts exceeded".to_string(), None)
        });
        log_error!(
            attempts = attempts,
            error = %final_error,
            "Request failed after all retry attempts"
        );
        Err(final_error)
    }
}
