//! Stream recovery state machine.
//!
//! The machine is pure: it owns no timers and touches no player. Callers feed
//! it [`RecoveryInput`]s with the current instant and carry out the returned
//! [`RecoveryAction`].
//!
//! ```text
//!            StreamStarted              StreamError (retry allowed)
//!   Idle ─────────────────▶ Playing ──────────────────────────────▶ Recovering{1}
//!    ▲                        ▲                                         │  │
//!    │ Stopped / UserAbandon  │ StreamStarted        RetryTimerFired ──┘  │ StreamError
//!    │                        └──────────────── Recovering{n} ◀──────────┘ (n+1 allowed)
//!    │                                               │
//!    │          UserAbandon                          │ StreamError, retries exhausted
//!    └──────────────────────── Failed ◀──────────────┘
//!                                │ UserRetry
//!                                └──────────▶ Recovering{1} + Reconnect
//! ```

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::retry::{RecoveryPolicy, RetryDecision};

/// Where the machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    Idle,
    Playing,
    /// Reconnect number `attempt` is scheduled or in flight.
    Recovering {
        attempt: u32,
    },
    /// Automatic recovery gave up; waiting for the user.
    Failed,
}

/// Something that happened to the stream or the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryInput {
    StreamStarted,
    /// The stream failed while at `position`.
    StreamError {
        position: Duration,
    },
    RetryTimerFired,
    UserRetry,
    UserAbandon,
    Stopped,
}

/// What the caller must do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Arm a timer for `delay`, then send [`RecoveryInput::RetryTimerFired`].
    ScheduleRetry {
        attempt: u32,
        delay: Duration,
    },
    /// Reload the stream now and seek to `resume_at`.
    Reconnect {
        resume_at: Duration,
    },
    /// Ask the user whether to keep trying.
    PromptUser,
    None,
}

/// Explicit recovery state machine for one playback session.
#[derive(Debug, Clone)]
pub struct RecoveryMachine {
    policy: RecoveryPolicy,
    state: RecoveryState,
    resume_position: Duration,
    outage_started: Option<Instant>,
    failure_reason: Option<String>,
}

impl RecoveryMachine {
    #[must_use]
    pub fn new(policy: RecoveryPolicy) -> Self {
        Self {
            policy,
            state: RecoveryState::Idle,
            resume_position: Duration::ZERO,
            outage_started: None,
            failure_reason: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> RecoveryState {
        self.state
    }

    #[must_use]
    pub fn policy(&self) -> &RecoveryPolicy {
        &self.policy
    }

    /// Last known good position, used as the seek target after a reconnect.
    #[must_use]
    pub fn resume_position(&self) -> Duration {
        self.resume_position
    }

    /// Why automatic recovery stopped, while in [`RecoveryState::Failed`].
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Applies `input` observed at `now` and returns the action to perform.
    pub fn handle(&mut self, input: RecoveryInput, now: Instant) -> RecoveryAction {
        let from = self.state;
        let action = match (from, input) {
            (_, RecoveryInput::Stopped) => {
                self.reset(RecoveryState::Idle);
                RecoveryAction::None
            }

            (RecoveryState::Idle | RecoveryState::Playing, RecoveryInput::StreamStarted) => {
                self.state = RecoveryState::Playing;
                RecoveryAction::None
            }
            (RecoveryState::Recovering { attempt }, RecoveryInput::StreamStarted) => {
                info!(attempt, "stream recovered");
                self.outage_started = None;
                self.state = RecoveryState::Playing;
                RecoveryAction::None
            }

            (RecoveryState::Idle | RecoveryState::Playing, RecoveryInput::StreamError { position }) => {
                self.remember_position(position);
                self.outage_started = Some(now);
                self.schedule(1, now)
            }
            (RecoveryState::Recovering { attempt }, RecoveryInput::StreamError { position }) => {
                self.remember_position(position);
                self.schedule(attempt + 1, now)
            }

            (RecoveryState::Recovering { .. }, RecoveryInput::RetryTimerFired) => {
                RecoveryAction::Reconnect {
                    resume_at: self.resume_position,
                }
            }

            (RecoveryState::Failed, RecoveryInput::UserRetry) => {
                self.failure_reason = None;
                self.outage_started = Some(now);
                self.state = RecoveryState::Recovering { attempt: 1 };
                RecoveryAction::Reconnect {
                    resume_at: self.resume_position,
                }
            }

            (RecoveryState::Recovering { .. } | RecoveryState::Failed, RecoveryInput::UserAbandon) => {
                self.reset(RecoveryState::Idle);
                RecoveryAction::None
            }

            // Stale timers, duplicate errors after giving up, user input with
            // nothing to decide.
            _ => RecoveryAction::None,
        };

        if from != self.state {
            debug!(?from, to = ?self.state, ?input, "recovery transition");
        }
        action
    }

    fn schedule(&mut self, attempt: u32, now: Instant) -> RecoveryAction {
        let elapsed = self
            .outage_started
            .map_or(Duration::ZERO, |start| now.saturating_duration_since(start));
        match self.policy.should_retry(attempt, elapsed) {
            RetryDecision::Retry { delay, attempt } => {
                self.state = RecoveryState::Recovering { attempt };
                RecoveryAction::ScheduleRetry { attempt, delay }
            }
            RetryDecision::DoNotRetry { reason } => self.max_attempts_exceeded(reason),
        }
    }

    fn max_attempts_exceeded(&mut self, reason: String) -> RecoveryAction {
        warn!(reason = %reason, "giving up on automatic recovery");
        self.failure_reason = Some(reason);
        self.state = RecoveryState::Failed;
        RecoveryAction::PromptUser
    }

    fn remember_position(&mut self, position: Duration) {
        // A failed reconnect reports 0; keep the last real position.
        if !position.is_zero() {
            self.resume_position = position;
        }
    }

    fn reset(&mut self, state: RecoveryState) {
        self.state = state;
        self.resume_position = Duration::ZERO;
        self.outage_started = None;
        self.failure_reason = None;
    }
}
