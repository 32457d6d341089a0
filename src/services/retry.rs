//! Cooperative retry policies for every waiting operation.
//!
//! A single `RetryPolicy` type covers both shapes of waiting the
//! orchestrator does:
//! - fixed-interval polling for eventually consistent state (role metadata,
//!   unit convergence, unit acceptance)
//! - exponential backoff for transient store and scheduler failures
//!
//! Either shape may be bounded by a maximum number of attempts, a wall-clock
//! deadline, both, or neither.

use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::errors::DomainError;
use crate::domain::models::Config;
use crate::domain::ports::{SchedulerError, StoreError};

/// Errors that can tell whether repeating the call might help
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

impl Retryable for StoreError {
    fn is_transient(&self) -> bool {
        Self::is_transient(self)
    }
}

impl Retryable for SchedulerError {
    fn is_transient(&self) -> bool {
        Self::is_transient(self)
    }
}

impl Retryable for DomainError {
    fn is_transient(&self) -> bool {
        Self::is_transient(self)
    }
}

/// Retry policy: attempt bound, deadline, and backoff curve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first (None = unbounded)
    max_attempts: Option<u32>,
    /// Wall-clock budget measured from the first attempt (None = unbounded)
    deadline: Option<Duration>,
    initial_backoff: Duration,
    max_backoff: Duration,
    /// Growth factor per attempt; 1 gives a fixed interval
    multiplier: u32,
}

impl RetryPolicy {
    /// Poll forever at a fixed interval
    pub const fn fixed(interval: Duration) -> Self {
        Self {
            max_attempts: None,
            deadline: None,
            initial_backoff: interval,
            max_backoff: interval,
            multiplier: 1,
        }
    }

    /// Doubling backoff from `initial` capped at `max`, unbounded attempts
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self {
            max_attempts: None,
            deadline: None,
            initial_backoff: initial,
            max_backoff: max.max(initial),
            multiplier: 2,
        }
    }

    /// Run the operation exactly once
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: Some(1),
            deadline: None,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1,
        }
    }

    /// Cap total attempts; `None` removes the cap
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Bound total wall-clock time; `None` removes the bound
    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Configured attempt cap
    pub const fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// True when neither attempts nor time are capped
    pub const fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none() && self.deadline.is_none()
    }

    /// Delay before attempt `attempt + 1`, where `attempt` is 0-indexed.
    ///
    /// Formula: min(initial * multiplier^attempt, max)
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let initial_ms = u64::try_from(self.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max_backoff.as_millis()).unwrap_or(u64::MAX);
        let backoff_ms = initial_ms
            .saturating_mul(u64::from(self.multiplier).saturating_pow(attempt))
            .min(max_ms);

        Duration::from_millis(backoff_ms)
    }

    /// Begin tracking attempts against this policy
    pub fn start(&self) -> Attempts<'_> {
        Attempts {
            policy: self,
            attempt: 0,
            started: Instant::now(),
        }
    }

    /// Execute an operation, retrying transient errors under this policy.
    ///
    /// Permanent errors are returned immediately. When the policy is
    /// exhausted the last transient error is returned.
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let mut attempts = self.start();

        loop {
            match operation().await {
                Ok(result) => {
                    if attempts.count() > 0 {
                        debug!("Operation succeeded after {} retries", attempts.count());
                    }
                    return Ok(result);
                }
                Err(err) if !err.is_transient() => {
                    debug!("Permanent error, not retrying: {}", err);
                    return Err(err);
                }
                Err(err) => {
                    let delay = attempts.next_delay();
                    warn!(
                        attempt = attempts.count(),
                        error = %err,
                        retry_in = ?delay,
                        "transient failure"
                    );
                    if !attempts.wait().await {
                        warn!("Operation failed after {} attempts: {}", attempts.count(), err);
                        return Err(err);
                    }
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    /// Five retries starting at 500ms, capped at 10s
    fn default() -> Self {
        Self::exponential(Duration::from_millis(500), Duration::from_secs(10))
            .with_max_attempts(Some(6))
    }
}

/// Attempt tracker for one wait loop
#[derive(Debug)]
pub struct Attempts<'a> {
    policy: &'a RetryPolicy,
    attempt: u32,
    started: Instant,
}

impl Attempts<'_> {
    /// Failed attempts recorded so far
    pub const fn count(&self) -> u32 {
        self.attempt
    }

    /// Delay before the next attempt, or None if the policy is spent
    pub fn next_delay(&self) -> Option<Duration> {
        let failed = self.attempt + 1;
        if self.policy.max_attempts.is_some_and(|max| failed >= max) {
            return None;
        }
        let delay = self.policy.calculate_backoff(self.attempt);
        if let Some(deadline) = self.policy.deadline {
            if self.started.elapsed() + delay > deadline {
                return None;
            }
        }
        Some(delay)
    }

    /// Record a failed attempt and sleep before the next one.
    ///
    /// Returns false, without sleeping, when the policy allows no further
    /// attempts.
    pub async fn wait(&mut self) -> bool {
        let delay = self.next_delay();
        self.attempt += 1;
        match delay {
            Some(delay) => {
                if !delay.is_zero() {
                    sleep(delay).await;
                }
                true
            }
            None => false,
        }
    }
}

/// The policies threaded into each service, derived from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitPolicies {
    /// Transient store/scheduler failures
    pub transient: RetryPolicy,
    /// Waiting for role metadata or membership
    pub metadata: RetryPolicy,
    /// Resubmitting units that were not accepted
    pub submission: RetryPolicy,
    /// Polling unit state until converged
    pub convergence: RetryPolicy,
    /// Re-reading after a conditional write conflict
    pub conflict: RetryPolicy,
}

impl WaitPolicies {
    /// Derive every policy from the `polling` and `retry` sections
    pub fn from_config(config: &Config) -> Self {
        let polling = &config.polling;
        let deadline = polling.deadline_secs.map(Duration::from_secs);
        let bounded = |interval_ms: u64| {
            RetryPolicy::fixed(Duration::from_millis(interval_ms))
                .with_max_attempts(polling.max_attempts)
                .with_deadline(deadline)
        };

        Self {
            transient: RetryPolicy::exponential(
                Duration::from_millis(config.retry.initial_backoff_ms),
                Duration::from_millis(config.retry.max_backoff_ms),
            )
            .with_max_attempts(Some(config.retry.max_retries.saturating_add(1))),
            metadata: bounded(polling.metadata_interval_ms),
            submission: bounded(polling.submit_interval_ms),
            convergence: bounded(polling.convergence_interval_ms),
            conflict: RetryPolicy::fixed(Duration::ZERO)
                .with_max_attempts(config.retry.max_conflict_retries.map(|n| n.saturating_add(1))),
        }
    }

    /// Millisecond intervals and small bounds, for tests and dry runs
    pub fn immediate(max_attempts: u32) -> Self {
        let policy = RetryPolicy::fixed(Duration::from_millis(1)).with_max_attempts(Some(max_attempts));
        Self {
            transient: policy.clone(),
            metadata: policy.clone(),
            submission: policy.clone(),
            convergence: policy.clone(),
            conflict: policy,
        }
    }
}

impl Default for WaitPolicies {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
