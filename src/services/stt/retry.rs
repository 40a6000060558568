//! Retry policy for recognizer calls.
//!
//! Only failures the [`RecognizeError`] taxonomy marks as retryable
//! (timeouts and transient transport errors) are retried; auth failures and
//! malformed responses abort on the spot. Waits double per retry from the
//! engine's configured delay, carry a small per-retry stagger so engines
//! that failed together don't hammer their backends in lockstep, and are
//! capped well below the recognition deadline.

use super::RecognizeError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Upper bound on any single backoff wait.
const MAX_BACKOFF: Duration = Duration::from_secs(20);
/// Stagger added per retry on top of the doubled delay, in milliseconds.
const STAGGER_STEP_MS: u64 = 50;

/// Per-engine retry policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts allowed, first call included
    attempts: u32,
    /// Wait before the first retry
    initial_delay: Duration,
}

impl RetryPolicy {
    /// Allow `max_retries` retries after the first attempt, waiting
    /// `retry_delay_ms` before the first one.
    pub fn new(max_retries: u32, retry_delay_ms: u64) -> Self {
        Self {
            attempts: max_retries.saturating_add(1),
            initial_delay: Duration::from_millis(retry_delay_ms),
        }
    }

    /// Total attempts this policy allows, first call included.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Wait before retry number `retry` (1-based): the initial delay
    /// doubled per retry, staggered, capped at [`MAX_BACKOFF`].
    fn delay_before(&self, retry: u32) -> Duration {
        let doubled = self
            .initial_delay
            .saturating_mul(1u32 << (retry - 1).min(16));
        let stagger = Duration::from_millis(STAGGER_STEP_MS * retry as u64);
        (doubled + stagger).min(MAX_BACKOFF)
    }

    /// Run `operation` until it succeeds, fails non-retryably, or the
    /// attempt budget runs out.
    pub async fn run<F, Fut, T>(&self, operation: F) -> Result<T, RecognizeError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, RecognizeError>>,
    {
        let mut retry = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && retry + 1 < self.attempts => {
                    retry += 1;
                    sleep(self.delay_before(retry)).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn quick_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, 5)
    }

    #[tokio::test]
    async fn transient_failure_is_retried_to_success() {
        let calls = Arc::new(Mutex::new(0));
        let probe = Arc::clone(&calls);

        let operation = || async {
            let mut count = probe.lock().unwrap();
            *count += 1;
            if *count == 1 {
                Err(RecognizeError::Transient("503".into()))
            } else {
                Ok("recognized".to_string())
            }
        };

        let result = quick_policy(2).run(operation).await;
        assert_eq!(result.unwrap(), "recognized");
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn budget_bounds_persistent_transient_failures() {
        let calls = Arc::new(Mutex::new(0));
        let probe = Arc::clone(&calls);

        let operation = || async {
            *probe.lock().unwrap() += 1;
            Err::<String, _>(RecognizeError::Timeout { seconds: 1 })
        };

        let result = quick_policy(2).run(operation).await;
        assert!(matches!(result, Err(RecognizeError::Timeout { .. })));
        // 1 initial attempt + 2 retries.
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn auth_failure_aborts_without_retry() {
        let calls = Arc::new(Mutex::new(0));
        let probe = Arc::clone(&calls);

        let operation = || async {
            *probe.lock().unwrap() += 1;
            Err::<String, _>(RecognizeError::AuthFailed("bad key".into()))
        };

        let result = quick_policy(5).run(operation).await;
        assert!(matches!(result, Err(RecognizeError::AuthFailed(_))));
        assert_eq!(*calls.lock().unwrap(), 1, "auth errors must not retry");
    }

    #[tokio::test]
    async fn malformed_response_aborts_without_retry() {
        let calls = Arc::new(Mutex::new(0));
        let probe = Arc::clone(&calls);

        let operation = || async {
            *probe.lock().unwrap() += 1;
            Err::<String, _>(RecognizeError::Malformed("bad json".into()))
        };

        assert!(quick_policy(5).run(operation).await.is_err());
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn delay_schedule_doubles_staggers_and_caps() {
        let policy = RetryPolicy::new(5, 1000);
        assert_eq!(policy.delay_before(1), Duration::from_millis(1050));
        assert_eq!(policy.delay_before(2), Duration::from_millis(2100));
        assert_eq!(policy.delay_before(3), Duration::from_millis(4150));
        // Deep retries hit the cap instead of growing without bound.
        assert_eq!(policy.delay_before(12), MAX_BACKOFF);
    }

    #[test]
    fn zero_retries_means_a_single_attempt() {
        assert_eq!(RetryPolicy::new(0, 100).attempts(), 1);
        assert_eq!(RetryPolicy::new(2, 100).attempts(), 3);
    }
}
