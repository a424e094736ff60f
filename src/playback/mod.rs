//! Player boundary and live stream recovery.
//!
//! The media engine sits behind [`MediaPlayer`]. A [`PlaybackSession`] feeds
//! player events through a [`RecoveryMachine`], which reconnects a dropped
//! stream a fixed number of times at a fixed delay, resumes at the last known
//! position, and asks the user once automatic recovery gives up.

mod player;
mod recovery;
mod retry;
mod session;

pub use player::{MediaPlayer, PlaybackError, PlayerEvent};
pub use recovery::{RecoveryAction, RecoveryInput, RecoveryMachine, RecoveryState};
pub use retry::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_RECOVERY_DEADLINE, DEFAULT_RETRY_DELAY, RecoveryPolicy,
    RetryDecision,
};
pub use session::{PlaybackSession, SessionEnd, SessionNotice, fetch_subtitle};
