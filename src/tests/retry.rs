// Unit Tests for Retry Logic
//
// UNIT UNDER TEST: RetryPolicy / RetryExecutor
//
// BUSINESS RESPONSIBILITY:
//   - Retries transient failures with fixed exponential backoff (no jitter)
//   - Fails fast on non-retryable errors
//   - Surfaces the last error when attempts are exhausted
//   - Bounds each attempt with the per-request timeout
//
// TEST COVERAGE:
//   - Backoff progression values
//   - Success after transient failures
//   - Immediate propagation of rejected requests
//   - Exhausted-attempt error selection

use crate::error::AnalyzerError;
use crate::internals::retry::{RetryExecutor, RetryPolicy};

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

// Zero backoff keeps these tests fast; the progression itself is covered
// separately through backoff_delay.
fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        backoff_seconds: 0,
        request_timeout: Duration::from_millis(200),
    }
}

#[cfg(test)]
mod policy_tests {
    use super::*;

    #[test]
    fn test_defaults_match_the_documented_contract() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.backoff_seconds, 2);
        assert_eq!(policy.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_backoff_doubles_without_jitter() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(8));
    }
}

#[cfg(test)]
mod executor_tests {
    use super::*;

    #[tokio::test]
    async fn test_success_needs_no_retry() {
        let executor = RetryExecutor::new(fast_policy(3));
        let attempts = AtomicU32::new(0);

        let result = executor
            .execute(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, AnalyzerError>(42) }
            })
            .await;

        assert_eq!(result.expect("should succeed"), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried_until_success() {
        let executor = RetryExecutor::new(fast_policy(3));
        let attempts = AtomicU32::new(0);

        let result = executor
            .execute(|| {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(AnalyzerError::UpstreamError { status: 500 })
                    } else {
                        Ok("recovered")
                    }
                }
            })
            .await;

        assert_eq!(result.expect("third attempt succeeds"), "recovered");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_errors_propagate_immediately() {
        let executor = RetryExecutor::new(fast_policy(3));
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> = executor
            .execute(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(AnalyzerError::Rejected {
                        status: 400,
                        message: "bad request".to_string(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(AnalyzerError::Rejected { .. })));
        assert_eq!(
            attempts.load(Ordering::SeqCst),
            1,
            "4xx other than 429 must not be retried"
        );
    }

    #[tokio::test]
    async fn test_exhausted_attempts_surface_the_last_error() {
        let executor = RetryExecutor::new(fast_policy(2));
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> = executor
            .execute(|| {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 2 {
                        Err(AnalyzerError::RateLimited {
                            retry_after_seconds: 7,
                        })
                    } else {
                        Err(AnalyzerError::UpstreamError { status: 500 })
                    }
                }
            })
            .await;

        // Initial attempt + 2 retries; the final (rate-limited) error wins
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(matches!(
            result,
            Err(AnalyzerError::RateLimited {
                retry_after_seconds: 7
            })
        ));
    }

    #[tokio::test]
    async fn test_slow_attempts_hit_the_request_timeout() {
        let executor = RetryExecutor::new(RetryPolicy {
            max_retries: 1,
            backoff_seconds: 0,
            request_timeout: Duration::from_millis(20),
        });

        let result: Result<(), _> = executor
            .execute(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(AnalyzerError::Timeout { .. })));
    }
}
