//! Retry with exponential backoff for rate-limited upstream calls.
//!
//! The executor is blind to what it wraps: it runs a unit of work, classifies
//! the failure, and either backs off and re-runs it or propagates. Only
//! rate-limit signals are retried; every other failure is terminal on the
//! first occurrence.

use std::future::Future;

use tokio::time::sleep;

use crate::config::RetryPolicy;
use crate::error::{BrokerError, BrokerResult};

/// Executes operations under a [`RetryPolicy`].
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Creates a new retry executor with the given policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Executes an operation, retrying rate-limited failures with
    /// exponentially increasing waits.
    ///
    /// A server-provided retry-after hint takes precedence over the computed
    /// backoff for that wait; the backoff schedule still advances. When the
    /// attempt ceiling is hit the final rate-limit failure is reported as
    /// [`BrokerError::RetriesExhausted`].
    pub async fn execute<F, Fut, T>(&self, operation: F) -> BrokerResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = BrokerResult<T>>,
    {
        let mut backoff = self.policy.initial_backoff;
        let mut retries_left = self.policy.max_retries;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_rate_limit() => {
                    if retries_left == 0 {
                        let attempts = self.policy.max_retries + 1;
                        tracing::error!(attempts, "rate limit persisted, giving up");
                        return Err(BrokerError::RetriesExhausted { attempts });
                    }

                    let wait = e
                        .retry_after()
                        .unwrap_or(backoff)
                        .min(self.policy.max_backoff);

                    tracing::warn!(
                        retries_left,
                        wait_ms = wait.as_millis() as u64,
                        "rate limit hit, backing off"
                    );

                    sleep(wait).await;

                    backoff = backoff
                        .mul_f64(self.policy.multiplier)
                        .min(self.policy.max_backoff);
                    retries_left -= 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_secs(1),
            multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_eventually() {
        let executor = RetryExecutor::new(fast_policy(3));
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result = executor
            .execute(|| async {
                let count = attempts_clone.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    Err(BrokerError::RateLimited { retry_after: None })
                } else {
                    Ok("success")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_total_attempts() {
        let executor = RetryExecutor::new(fast_policy(2));
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result: BrokerResult<()> = executor
            .execute(|| async {
                attempts_clone.fetch_add(1, Ordering::SeqCst);
                Err(BrokerError::RateLimited { retry_after: None })
            })
            .await;

        assert!(matches!(
            result,
            Err(BrokerError::RetriesExhausted { attempts: 3 })
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_rate_limit_error_is_terminal() {
        let executor = RetryExecutor::new(fast_policy(3));
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result: BrokerResult<()> = executor
            .execute(|| async {
                attempts_clone.fetch_add(1, Ordering::SeqCst);
                Err(BrokerError::NoImageProduced)
            })
            .await;

        assert!(matches!(result, Err(BrokerError::NoImageProduced)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles_between_retries() {
        let executor = RetryExecutor::new(RetryPolicy {
            max_retries: 2,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        });
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let start = tokio::time::Instant::now();
        let result = executor
            .execute(|| async {
                let count = attempts_clone.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    Err(BrokerError::RateLimited { retry_after: None })
                } else {
                    Ok(())
                }
            })
            .await;

        assert!(result.is_ok());
        // 100ms before attempt 2, 200ms before attempt 3.
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_hint_wins_over_backoff() {
        let executor = RetryExecutor::new(RetryPolicy {
            max_retries: 1,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        });
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let start = tokio::time::Instant::now();
        let result = executor
            .execute(|| async {
                let count = attempts_clone.fetch_add(1, Ordering::SeqCst);
                if count == 0 {
                    Err(BrokerError::RateLimited {
                        retry_after: Some(Duration::from_millis(700)),
                    })
                } else {
                    Ok(())
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(start.elapsed(), Duration::from_millis(700));
    }
}
