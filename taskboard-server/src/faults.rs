//! Fault injection for exercising client retry and rollback.
//!
//! Every faulty request first waits the configured latency, then fails
//! with `503 Service Unavailable` with probability `failure_rate`. Failures
//! can also be forced for the next N requests, which keeps tests
//! deterministic.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use rand::Rng;

/// Decides which requests fail or stall.
#[derive(Debug, Default)]
pub struct FaultInjector {
    failure_rate: f64,
    latency: Duration,
    forced: AtomicU32,
}

impl FaultInjector {
    /// Creates an injector. `failure_rate` is clamped to `0.0..=1.0`; NaN
    /// disables random failures.
    #[must_use]
    pub fn new(failure_rate: f64, latency: Duration) -> Self {
        let failure_rate = if failure_rate.is_nan() {
            0.0
        } else {
            failure_rate.clamp(0.0, 1.0)
        };
        Self {
            failure_rate,
            latency,
            forced: AtomicU32::new(0),
        }
    }

    /// An injector that never interferes.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Probability that a request fails.
    #[must_use]
    pub const fn failure_rate(&self) -> f64 {
        self.failure_rate
    }

    /// Delay added to every request.
    #[must_use]
    pub const fn latency(&self) -> Duration {
        self.latency
    }

    /// Makes the next `count` requests fail regardless of the rate.
    pub fn force_failures(&self, count: u32) {
        self.forced.store(count, Ordering::SeqCst);
    }

    /// Waits the configured latency and decides whether this request fails.
    pub async fn should_fail(&self) -> bool {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let forced = self
            .forced
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        forced || (self.failure_rate > 0.0 && rand::rng().random_bool(self.failure_rate))
    }
}
