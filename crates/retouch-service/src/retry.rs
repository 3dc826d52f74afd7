//! Exponential backoff with jitter and per-attempt timeouts.

use std::future::Future;
use std::time::Duration;

use log::warn;
use rand::Rng;

use crate::error::ServiceError;

/// How often and how patiently transient failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Upper bound (inclusive) of the random delay added to each backoff.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(1000),
            max_jitter: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (0-based), without jitter:
    /// `2^(retry + 1) * base_delay`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_add(1));
        self.base_delay.saturating_mul(factor)
    }

    /// Backoff plus a random jitter in `[0, max_jitter]`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_ms)
        };
        self.backoff(retry) + Duration::from_millis(jitter)
    }
}

/// Result of a retried operation.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T, ServiceError>,
    /// Attempts made, including the first.
    pub attempts: u32,
    /// Sleeps taken between attempts.
    pub delays: Vec<Duration>,
}

/// Run `attempt` until it succeeds, fails terminally or retries run out.
///
/// Each attempt is bounded by `timeout`; an expired attempt counts as a
/// transient [`ServiceError::Timeout`]. Attempts are strictly sequential.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    timeout: Duration,
    mut attempt: F,
) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut delays = Vec::new();
    let mut attempts = 0u32;
    loop {
        let result = match tokio::time::timeout(timeout, attempt(attempts)).await {
            Ok(result) => result,
            Err(_) => Err(ServiceError::Timeout(timeout)),
        };
        attempts += 1;

        match result {
            Err(err) if err.is_transient() && attempts <= policy.max_retries => {
                let delay = policy.delay_for(attempts - 1);
                warn!(
                    "attempt {}/{} failed ({}), retrying in {}ms",
                    attempts,
                    policy.max_retries + 1,
                    err,
                    delay.as_millis()
                );
                delays.push(delay);
                tokio::time::sleep(delay).await;
            }
            result => {
                return RetryOutcome {
                    result,
                    attempts,
                    delays,
                }
            }
        }
    }
}
