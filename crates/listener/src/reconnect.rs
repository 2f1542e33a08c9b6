//! Bounded reconnect policy for the realtime subscription.
//!
//! Delays grow linearly with the attempt number and are capped. Once the
//! retries are used up the caller stops using realtime and polls instead.

use std::time::Duration;

/// Retries allowed after the first failed connection.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Delay before the first retry; retry `n` waits `n` times this.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

/// Upper bound on any single delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based), or `None` once the
    /// policy is exhausted.
    pub fn delay_for(&self, retry: u32) -> Option<Duration> {
        if retry == 0 || retry > self.max_retries {
            return None;
        }
        Some(self.base_delay.saturating_mul(retry).min(self.max_delay))
    }

    /// All delays the policy will ever wait, in order.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.max_retries).filter_map(|r| self.delay_for(r)).collect()
    }
}

/// Tracks retries for one subscription.
#[derive(Debug)]
pub struct Backoff {
    policy: RetryPolicy,
    retries: u32,
}

impl Backoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, retries: 0 }
    }

    /// Record a failure and return how long to wait before retrying, or
    /// `None` when the subscription should give up.
    pub fn next_delay(&mut self) -> Option<Duration> {
        let delay = self.policy.delay_for(self.retries + 1)?;
        self.retries += 1;
        Some(delay)
    }

    /// Forget past failures after a healthy session.
    pub fn reset(&mut self) {
        self.retries = 0;
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }
}
