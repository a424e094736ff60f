//! Drives a [`MediaPlayer`] with the recovery machine.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::player::{MediaPlayer, PlaybackError, PlayerEvent};
use super::recovery::{RecoveryAction, RecoveryInput, RecoveryMachine, RecoveryState};
use super::retry::RecoveryPolicy;
use crate::download::{DownloadEngine, TransferTask, subtitle_file_name};

/// What the UI should show after the session reacted to something.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    Nothing,
    Playing,
    Paused,
    /// Reconnect `attempt` of `max` will run after `delay`.
    Retrying {
        attempt: u32,
        max: u32,
        delay: Duration,
    },
    Reconnected,
    /// Automatic recovery gave up. Ask the user, then call
    /// [`PlaybackSession::user_retry`] or [`PlaybackSession::user_abandon`].
    NeedsUserDecision {
        reason: String,
    },
    Ended,
    Stopped,
}

/// How [`PlaybackSession::run`] finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The event source closed.
    Closed,
    EndReached,
    Stopped,
    /// Recovery gave up; the caller decides what happens next.
    NeedsUserDecision { reason: String },
    Cancelled,
}

/// One open stream on one player.
pub struct PlaybackSession<P> {
    player: P,
    url: String,
    subtitle: Option<PathBuf>,
    machine: RecoveryMachine,
    /// When the scheduled reconnect is due.
    retry_at: Option<tokio::time::Instant>,
    length: Option<Duration>,
}

impl<P: MediaPlayer> PlaybackSession<P> {
    pub fn new(player: P, url: impl Into<String>, policy: RecoveryPolicy) -> Self {
        Self {
            player,
            url: url.into(),
            subtitle: None,
            machine: RecoveryMachine::new(policy),
            retry_at: None,
            length: None,
        }
    }

    /// Attaches a local subtitle file on open and after every reconnect.
    #[must_use]
    pub fn with_subtitle(mut self, path: impl Into<PathBuf>) -> Self {
        self.subtitle = Some(path.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    pub fn state(&self) -> RecoveryState {
        self.machine.state()
    }

    /// Time left until the scheduled reconnect, if one is pending.
    pub fn pending_retry(&self) -> Option<Duration> {
        self.retry_at
            .map(|at| at.saturating_duration_since(tokio::time::Instant::now()))
    }

    /// Total media length once the player reported it.
    pub fn length(&self) -> Option<Duration> {
        self.length
    }

    /// Loads and plays the URL, then attaches the subtitle if one was given.
    ///
    /// # Errors
    ///
    /// Returns the player's error if loading or starting playback fails.
    /// Subtitle failures are only logged.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn open(&mut self) -> Result<(), PlaybackError> {
        self.player.load(&self.url).await?;
        self.player.play().await?;
        self.attach_subtitle().await;
        info!("playback started");
        Ok(())
    }

    /// Feeds a player event through the recovery machine.
    pub fn handle_event(&mut self, event: PlayerEvent) -> SessionNotice {
        let now = Instant::now();
        match event {
            PlayerEvent::Playing => {
                let was_recovering = matches!(self.machine.state(), RecoveryState::Recovering { .. });
                self.apply(RecoveryInput::StreamStarted, now);
                self.retry_at = None;
                if was_recovering {
                    SessionNotice::Reconnected
                } else {
                    SessionNotice::Playing
                }
            }
            PlayerEvent::Paused => SessionNotice::Paused,
            PlayerEvent::Stopped => {
                self.apply(RecoveryInput::Stopped, now);
                SessionNotice::Stopped
            }
            PlayerEvent::EndReached => {
                self.apply(RecoveryInput::Stopped, now);
                SessionNotice::Ended
            }
            PlayerEvent::Error => {
                let position = self.player.position();
                warn!(position_ms = position.as_millis(), "stream error");
                self.apply(RecoveryInput::StreamError { position }, now)
            }
            PlayerEvent::LengthKnown(length) => {
                self.length = Some(length);
                SessionNotice::Nothing
            }
        }
    }

    /// Performs the scheduled reconnect now.
    ///
    /// A reconnect that fails to load counts as another stream error.
    pub async fn retry_now(&mut self) -> SessionNotice {
        self.retry_at = None;
        match self.machine.handle(RecoveryInput::RetryTimerFired, Instant::now()) {
            RecoveryAction::Reconnect { resume_at } => self.reconnect(resume_at).await,
            _ => SessionNotice::Nothing,
        }
    }

    /// The user chose to keep trying after recovery gave up.
    pub async fn user_retry(&mut self) -> SessionNotice {
        match self.machine.handle(RecoveryInput::UserRetry, Instant::now()) {
            RecoveryAction::Reconnect { resume_at } => self.reconnect(resume_at).await,
            _ => SessionNotice::Nothing,
        }
    }

    /// The user gave up; stops the player.
    ///
    /// # Errors
    ///
    /// Returns the player's error if stopping fails.
    pub async fn user_abandon(&mut self) -> Result<(), PlaybackError> {
        self.retry_at = None;
        self.machine.handle(RecoveryInput::UserAbandon, Instant::now());
        self.player.stop().await
    }

    /// Processes player events until the stream ends, the source closes,
    /// recovery needs the user, or `cancel` fires.
    ///
    /// Owns the retry timer: while a retry is pending, the reconnect runs once
    /// its deadline passes. Events that do not settle the outage (pause,
    /// length updates) leave the deadline where it was.
    pub async fn run<F>(
        &mut self,
        events: &mut mpsc::Receiver<PlayerEvent>,
        cancel: &CancellationToken,
        mut on_notice: F,
    ) -> SessionEnd
    where
        F: FnMut(&SessionNotice),
    {
        loop {
            let notice = if let Some(retry_at) = self.retry_at {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return SessionEnd::Cancelled,
                    event = events.recv() => match event {
                        Some(event) => self.handle_event(event),
                        None => return SessionEnd::Closed,
                    },
                    () = tokio::time::sleep_until(retry_at) => self.retry_now().await,
                }
            } else {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return SessionEnd::Cancelled,
                    event = events.recv() => match event {
                        Some(event) => self.handle_event(event),
                        None => return SessionEnd::Closed,
                    },
                }
            };

            on_notice(&notice);
            match notice {
                SessionNotice::Ended => return SessionEnd::EndReached,
                SessionNotice::Stopped => return SessionEnd::Stopped,
                SessionNotice::NeedsUserDecision { reason } => {
                    return SessionEnd::NeedsUserDecision { reason };
                }
                _ => {}
            }
        }
    }

    fn apply(&mut self, input: RecoveryInput, now: Instant) -> SessionNotice {
        match self.machine.handle(input, now) {
            RecoveryAction::ScheduleRetry { attempt, delay } => {
                self.retry_at = Some(tokio::time::Instant::now() + delay);
                SessionNotice::Retrying {
                    attempt,
                    max: self.machine.policy().max_attempts(),
                    delay,
                }
            }
            RecoveryAction::PromptUser => {
                self.retry_at = None;
                SessionNotice::NeedsUserDecision {
                    reason: self
                        .machine
                        .failure_reason()
                        .unwrap_or("stream unavailable")
                        .to_string(),
                }
            }
            RecoveryAction::Reconnect { .. } | RecoveryAction::None => SessionNotice::Nothing,
        }
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn reconnect(&mut self, resume_at: Duration) -> SessionNotice {
        info!(resume_ms = resume_at.as_millis(), "reconnecting");
        if let Err(error) = self.reload(resume_at).await {
            warn!(error = %error, "reconnect failed");
            return self.apply(
                RecoveryInput::StreamError {
                    position: Duration::ZERO,
                },
                Instant::now(),
            );
        }
        SessionNotice::Nothing
    }

    async fn reload(&mut self, resume_at: Duration) -> Result<(), PlaybackError> {
        // Failing to stop a dead stream is expected.
        if let Err(error) = self.player.stop().await {
            debug!(error = %error, "stop before reconnect failed");
        }
        self.player.load(&self.url).await?;
        self.player.play().await?;
        if !resume_at.is_zero() {
            self.player.seek(resume_at).await?;
        }
        self.attach_subtitle().await;
        Ok(())
    }

    async fn attach_subtitle(&mut self) {
        let Some(path) = self.subtitle.clone() else {
            return;
        };
        if let Err(error) = self.player.add_subtitle_track(&path).await {
            warn!(path = %path.display(), error = %error, "could not attach subtitle");
        }
    }
}

/// Fetches a remote subtitle into `dir` for the player to load.
///
/// Returns `None` on any failure; playback goes on without subtitles.
#[instrument(skip(engine), fields(url = %url))]
pub async fn fetch_subtitle(engine: &DownloadEngine, url: &str, dir: &Path) -> Option<PathBuf> {
    let name = subtitle_file_name(url, None);
    let destination = dir.join(&name);
    let task = TransferTask::new(name, url, &destination);
    if engine
        .transfer(url, &destination, &task, &CancellationToken::new())
        .await
    {
        Some(destination)
    } else {
        warn!(error = %task.error_message(), "subtitle unavailable");
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;

    /// Records every command; `load` fails while `load_failures` is non-zero.
    #[derive(Clone, Default)]
    struct FakePlayer {
        log: Arc<Mutex<Vec<String>>>,
        position: Duration,
        load_failures: Arc<Mutex<u32>>,
        reject_subtitles: bool,
    }

    impl FakePlayer {
        fn commands(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        fn record(&self, command: String) {
            self.log.lock().unwrap().push(command);
        }
    }

    #[async_trait]
    impl MediaPlayer for FakePlayer {
        async fn load(&mut self, url: &str) -> Result<(), PlaybackError> {
            self.record(format!("load {url}"));
            let mut failures = self.load_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(PlaybackError::load(url, "unreachable"));
            }
            Ok(())
        }

        async fn play(&mut self) -> Result<(), PlaybackError> {
            self.record("play".to_string());
            Ok(())
        }

        async fn pause(&mut self) -> Result<(), PlaybackError> {
            self.record("pause".to_string());
            Ok(())
        }

        async fn stop(&mut self) -> Result<(), PlaybackError> {
            self.record("stop".to_string());
            Ok(())
        }

        async fn seek(&mut self, position: Duration) -> Result<(), PlaybackError> {
            self.record(format!("seek {}", position.as_secs()));
            Ok(())
        }

        async fn set_rate(&mut self, rate: f32) -> Result<(), PlaybackError> {
            self.record(format!("rate {rate}"));
            Ok(())
        }

        async fn set_volume(&mut self, volume: u8) -> Result<(), PlaybackError> {
            self.record(format!("volume {volume}"));
            Ok(())
        }

        async fn add_subtitle_track(&mut self, path: &Path) -> Result<(), PlaybackError> {
            self.record(format!("subtitle {}", path.display()));
            if self.reject_subtitles {
                return Err(PlaybackError::subtitle(path, "unsupported format"));
            }
            Ok(())
        }

        fn position(&self) -> Duration {
            self.position
        }
    }

    const URL: &str = "https://example.com/live.m3u8";

    fn session(policy: RecoveryPolicy) -> (PlaybackSession<FakePlayer>, FakePlayer) {
        let player = FakePlayer {
            position: Duration::from_secs(95),
            ..FakePlayer::default()
        };
        (PlaybackSession::new(player.clone(), URL, policy), player)
    }

    #[tokio::test]
    async fn test_open_loads_plays_and_attaches_subtitle() {
        let (session, player) = session(RecoveryPolicy::default());
        let mut session = session.with_subtitle("/tmp/talk.vtt");

        session.open().await.unwrap();

        assert_eq!(
            player.commands(),
            vec![format!("load {URL}"), "play".to_string(), "subtitle /tmp/talk.vtt".to_string()]
        );
    }

    #[tokio::test]
    async fn test_open_survives_rejected_subtitle() {
        let player = FakePlayer {
            reject_subtitles: true,
            ..FakePlayer::default()
        };
        let mut session = PlaybackSession::new(player.clone(), URL, RecoveryPolicy::default())
            .with_subtitle("/tmp/talk.vtt");

        session.open().await.unwrap();

        assert_eq!(
            player.commands(),
            vec![format!("load {URL}"), "play".to_string(), "subtitle /tmp/talk.vtt".to_string()]
        );
        assert_eq!(session.state(), RecoveryState::Idle);
    }

    #[tokio::test]
    async fn test_error_then_retry_reloads_and_seeks() {
        let (mut session, player) = session(RecoveryPolicy::default());
        session.open().await.unwrap();
        session.handle_event(PlayerEvent::Playing);

        let notice = session.handle_event(PlayerEvent::Error);
        assert_eq!(
            notice,
            SessionNotice::Retrying {
                attempt: 1,
                max: 5,
                delay: Duration::from_secs(3)
            }
        );
        let remaining = session.pending_retry().unwrap();
        assert!(
            remaining <= Duration::from_secs(3) && remaining > Duration::from_secs(2),
            "Unexpected retry delay: {remaining:?}"
        );

        assert_eq!(session.retry_now().await, SessionNotice::Nothing);
        let commands = player.commands();
        assert_eq!(
            commands[2..],
            [
                "stop".to_string(),
                format!("load {URL}"),
                "play".to_string(),
                "seek 95".to_string()
            ]
        );

        assert_eq!(session.handle_event(PlayerEvent::Playing), SessionNotice::Reconnected);
        assert_eq!(session.state(), RecoveryState::Playing);
    }

    #[tokio::test]
    async fn test_failed_reload_counts_as_next_attempt() {
        let (mut session, player) = session(RecoveryPolicy::default());
        session.handle_event(PlayerEvent::Playing);
        session.handle_event(PlayerEvent::Error);
        *player.load_failures.lock().unwrap() = 1;

        let notice = session.retry_now().await;

        assert!(matches!(notice, SessionNotice::Retrying { attempt: 2, .. }));
    }

    #[tokio::test]
    async fn test_exhausted_retries_need_user_then_user_retry_reconnects() {
        let (mut session, player) =
            session(RecoveryPolicy::new(1, Duration::from_millis(1), None));
        session.handle_event(PlayerEvent::Playing);
        session.handle_event(PlayerEvent::Error);
        *player.load_failures.lock().unwrap() = 1;

        let notice = session.retry_now().await;
        assert!(matches!(notice, SessionNotice::NeedsUserDecision { .. }));
        assert_eq!(session.pending_retry(), None);

        assert_eq!(session.user_retry().await, SessionNotice::Nothing);
        assert!(player.commands().ends_with(&["play".to_string(), "seek 95".to_string()]));
        assert_eq!(session.state(), RecoveryState::Recovering { attempt: 1 });
    }

    #[tokio::test]
    async fn test_user_abandon_stops_player() {
        let (mut session, player) = session(RecoveryPolicy::new(1, Duration::ZERO, None));
        session.handle_event(PlayerEvent::Error);
        session.handle_event(PlayerEvent::Error);

        session.user_abandon().await.unwrap();

        assert_eq!(session.state(), RecoveryState::Idle);
        assert_eq!(player.commands().last().map(String::as_str), Some("stop"));
    }

    #[tokio::test]
    async fn test_run_fires_retry_timer_and_reports_reconnect() {
        let (mut session, player) =
            session(RecoveryPolicy::new(5, Duration::from_millis(10), None));
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        tx.send(PlayerEvent::Playing).await.unwrap();
        tx.send(PlayerEvent::Error).await.unwrap();

        let feeder = {
            let player = player.clone();
            tokio::spawn(async move {
                // Wait for the reconnect, then report the stream as live and end it.
                loop {
                    if player.commands().iter().any(|c| c == "seek 95") {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                tx.send(PlayerEvent::Playing).await.unwrap();
                tx.send(PlayerEvent::EndReached).await.unwrap();
            })
        };

        let mut notices = Vec::new();
        let end = session
            .run(&mut rx, &cancel, |notice| notices.push(notice.clone()))
            .await;
        feeder.await.unwrap();

        assert_eq!(end, SessionEnd::EndReached);
        assert!(notices.contains(&SessionNotice::Reconnected));
        assert_eq!(notices.last(), Some(&SessionNotice::Ended));
    }

    #[tokio::test]
    async fn test_run_retry_deadline_survives_frequent_events() {
        let (mut session, player) =
            session(RecoveryPolicy::new(5, Duration::from_millis(200), None));
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        tx.send(PlayerEvent::Playing).await.unwrap();
        tx.send(PlayerEvent::Error).await.unwrap();

        // Pauses arrive twice per retry delay; the reconnect must still run.
        let feeder = {
            let player = player.clone();
            tokio::spawn(async move {
                for _ in 0..30 {
                    if player.commands().iter().any(|c| c == "seek 95") {
                        let _ = tx.send(PlayerEvent::Playing).await;
                        let _ = tx.send(PlayerEvent::EndReached).await;
                        return;
                    }
                    let _ = tx.send(PlayerEvent::Paused).await;
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            })
        };

        let mut reconnected = false;
        let end = session
            .run(&mut rx, &cancel, |notice| {
                reconnected |= *notice == SessionNotice::Reconnected;
            })
            .await;
        feeder.await.unwrap();

        assert_eq!(end, SessionEnd::EndReached);
        assert!(reconnected);
        let reloads = player
            .commands()
            .iter()
            .filter(|c| c.starts_with("load"))
            .count();
        assert_eq!(reloads, 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let (mut session, _player) = session(RecoveryPolicy::default());
        let (_tx, mut rx) = mpsc::channel::<PlayerEvent>(1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let end = session.run(&mut rx, &cancel, |_| {}).await;

        assert_eq!(end, SessionEnd::Cancelled);
    }

    #[tokio::test]
    async fn test_length_known_is_recorded() {
        let (mut session, _player) = session(RecoveryPolicy::default());
        session.handle_event(PlayerEvent::LengthKnown(Duration::from_secs(600)));
        assert_eq!(session.length(), Some(Duration::from_secs(600)));
    }
}
