//! Fixed-interval retry policy for live stream recovery.
//!
//! Unlike file transfers, a dropped stream is retried automatically: a fixed
//! number of attempts, a fixed delay between them, and an overall deadline so
//! recovery cannot stretch on indefinitely.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use reelfetch::playback::{RecoveryPolicy, RetryDecision};
//!
//! let policy = RecoveryPolicy::default();
//! match policy.should_retry(1, Duration::ZERO) {
//!     RetryDecision::Retry { delay, attempt } => println!("retry #{attempt} in {delay:?}"),
//!     RetryDecision::DoNotRetry { reason } => println!("giving up: {reason}"),
//! }
//! ```

use std::time::Duration;

use tracing::{debug, instrument};

/// Default maximum reconnect attempts per outage.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay before each reconnect.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Default ceiling on the total time spent recovering from one outage.
pub const DEFAULT_RECOVERY_DEADLINE: Duration = Duration::from_secs(60);

/// Decision on whether to attempt another reconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Reconnect after `delay`.
    Retry {
        delay: Duration,
        /// 1-indexed number of the reconnect about to be scheduled.
        attempt: u32,
    },

    /// Stop retrying automatically.
    DoNotRetry {
        /// Human-readable reason.
        reason: String,
    },
}

/// Retry configuration for stream recovery.
///
/// # Default Values
///
/// - `max_attempts`: 5
/// - `delay`: 3 seconds
/// - `deadline`: 60 seconds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryPolicy {
    max_attempts: u32,
    delay: Duration,
    deadline: Option<Duration>,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
            deadline: Some(DEFAULT_RECOVERY_DEADLINE),
        }
    }
}

impl RecoveryPolicy {
    /// Creates a policy. `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration, deadline: Option<Duration>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            deadline,
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Decides whether reconnect number `attempt` may be scheduled.
    ///
    /// `elapsed` is the time since the outage began. The attempt is refused
    /// when it exceeds `max_attempts` or when waiting `delay` more would cross
    /// the deadline.
    #[instrument(level = "debug", skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, attempt: u32, elapsed: Duration) -> RetryDecision {
        if attempt > self.max_attempts {
            debug!(attempt, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        if let Some(deadline) = self.deadline
            && elapsed.saturating_add(self.delay) > deadline
        {
            debug!(attempt, elapsed_ms = elapsed.as_millis(), "recovery deadline reached");
            return RetryDecision::DoNotRetry {
                reason: format!("recovery deadline ({}s) exceeded", deadline.as_secs()),
            };
        }

        RetryDecision::Retry {
            delay: self.delay,
            attempt,
        }
    }
}
