//! Bounded exponential backoff for Slack Web API calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::error::SlackError;

/// How often and how patiently to retry a failed call.
///
/// Only errors whose [`SlackError::is_retryable`] is true are retried; all
/// others are returned from the first failing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Sleep before the second attempt.
    pub base_delay: Duration,
    /// Multiplier applied to the delay after each retry.
    pub factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::slack_api()
    }
}

impl RetryPolicy {
    /// 3 attempts, 1s base delay, doubling.
    #[must_use]
    pub const fn slack_api() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            factor: 2,
        }
    }

    /// Retry without sleeping. Used in tests.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            factor: 1,
        }
    }

    /// Delay to sleep after the given failed attempt (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        self.base_delay
            .saturating_mul(self.factor.saturating_pow(exponent))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempts run out.
    ///
    /// # Errors
    ///
    /// Returns the last error produced by `op`.
    pub async fn run<T, F, Fut>(&self, method: &str, mut op: F) -> Result<T, SlackError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SlackError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts && e.is_retryable() => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        method = %method,
                        attempt,
                        max_attempts,
                        code = %e.code(),
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Slack call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn api_error(code: &str) -> SlackError {
        SlackError::api("slackLists.items.list", code, &serde_json::Value::Null)
    }

    #[test]
    fn test_delays_double() {
        let policy = RetryPolicy::slack_api();
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_retryable_failures_then_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = RetryPolicy::immediate(3)
            .run("slackLists.items.list", move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(api_error("rate_limited"))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.expect("third attempt succeeds"), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_failure_propagates_immediately() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = RetryPolicy::immediate(3)
            .run("slackLists.items.list", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(api_error("invalid_auth"))
            })
            .await;

        assert_eq!(result.expect_err("fails").code(), "invalid_auth");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = RetryPolicy::immediate(3)
            .run("chat.postMessage", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(api_error("internal_error"))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_policy_sleeps_between_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let started = tokio::time::Instant::now();
        let result = RetryPolicy::slack_api()
            .run("chat.postMessage", move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(api_error("timeout")) } else { Ok(()) }
            })
            .await;

        assert!(result.is_ok());
        assert!(started.elapsed() >= Duration::from_secs(3));
    }
}
