//! Retry policy for rate-limited recognition calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::ServiceError;
use crate::models::config::RetryConfig;

/// Explicit retry policy: exponential backoff with an attempt cap.
///
/// Only rate-limit failures are retried; any other service failure
/// surfaces immediately. Delay computation is a pure function so the
/// schedule is testable without sleeping.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    jitter: bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, jitter: bool) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            jitter,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            config.jitter,
        )
    }

    /// Delay before retrying after the given 1-based failed attempt.
    ///
    /// Doubles per attempt; the optional jitter term is deterministic so
    /// tests can assert the exact schedule.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let mut delay = self.base_delay.saturating_mul(1u32 << exponent);
        if self.jitter {
            delay += Duration::from_millis(u64::from(attempt) * 37 % 100);
        }
        delay
    }

    /// Run an operation under this policy.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, ServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(attempt, delay_ms = delay.as_millis() as u64, "rate limited, backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_schedule_without_jitter() {
        let policy = RetryPolicy::new(5, Duration::from_millis(200), false);
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
    }

    #[test]
    fn test_jitter_is_deterministic() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), true);
        assert_eq!(policy.delay_for(1), policy.delay_for(1));
        assert_ne!(policy.delay_for(1), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_retried_until_cap() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10), false);
        let calls = AtomicU32::new(0);

        let result: Result<(), ServiceError> = policy
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ServiceError::RateLimited) }
            })
            .await;

        assert_eq!(result, Err(ServiceError::RateLimited));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_surfaces_immediately() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10), false);
        let calls = AtomicU32::new(0);

        let result: Result<(), ServiceError> = policy
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ServiceError::Failed("bad request".into())) }
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Failed(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_rate_limit() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10), false);
        let calls = AtomicU32::new(0);

        let result = policy
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(ServiceError::RateLimited)
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
