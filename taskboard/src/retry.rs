//! Bounded exponential-backoff retry for task service calls.
//!
//! [`with_retry`] runs one remote operation up to `1 + max_retries` times.
//! Each attempt is capped by [`RetryPolicy::attempt_timeout`]; a timed-out
//! attempt counts as a failure. Between attempts it sleeps
//! `base_delay * 2^attempt`. Non-retryable errors (see
//! [`RemoteError::is_retryable`]) stop the loop at once.

use std::future::Future;
use std::time::Duration;

use crate::remote::RemoteError;

/// Retry budget and timing for remote calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of additional attempts after the first failure.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each later retry.
    pub base_delay: Duration,
    /// Upper bound for a single attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(200),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Total number of attempts this policy allows.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait after failed attempt number `attempt` (0-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Runs `op` with the retry policy, returning its first success or its
/// final failure unchanged.
///
/// `operation` names the call in log output.
///
/// # Errors
///
/// Returns the last [`RemoteError`] once the budget is spent, or the first
/// non-retryable error.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, RemoteError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let mut attempt = 0;
    loop {
        let result = match tokio::time::timeout(policy.attempt_timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout),
        };

        let error = match result {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(operation, attempt, "remote call succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !error.is_retryable() {
            tracing::debug!(operation, error = %error, "remote call failed, not retryable");
            return Err(error);
        }
        if attempt >= policy.max_retries {
            tracing::warn!(
                operation,
                attempts = attempt + 1,
                error = %error,
                "remote call failed, retries exhausted"
            );
            return Err(error);
        }

        let delay = policy.delay_for(attempt);
        tracing::debug!(
            operation,
            attempt,
            max_retries = policy.max_retries,
            ?delay,
            error = %error,
            "remote call failed, will retry"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
