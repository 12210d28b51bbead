/// PlaybackController — the single owner of playback state.
///
/// Every transition (from the menu, the remote socket, the lifecycle hooks)
/// runs under one async mutex, player calls included, so no two transitions
/// interleave and at most one station is ever active.
///
/// The controller never renders anything. It publishes `UiEvent`s on a
/// broadcast channel and the UI projection draws from those.
///
/// Each transition bumps `rev`. The now-playing tracker snapshots `rev`
/// before fetching metadata and its result is only committed if `rev` is
/// unchanged, so a fetch that raced a station change is dropped.
use std::sync::Arc;

use chrono::{DateTime, Local};
use radiobar_proto::catalog::{Station, StationCatalog};
use radiobar_proto::config::{PausePolicy, PlaybackConfig};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, Notify};
use tracing::{debug, info, warn};

use crate::player::Player;
use crate::ui::{Notification, UiEvent};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing(Station),
    Paused(Station),
}

impl PlaybackState {
    /// The active station, playing or paused.
    pub fn station(&self) -> Option<&Station> {
        match self {
            PlaybackState::Idle => None,
            PlaybackState::Playing(s) | PlaybackState::Paused(s) => Some(s),
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub raw_text: Option<String>,
    pub last_updated: DateTime<Local>,
}

impl NowPlaying {
    fn cleared() -> Self {
        Self {
            raw_text: None,
            last_updated: Local::now(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("station not found: {0}")]
    StationNotFound(String),
    #[error("nothing is playing")]
    NotPlaying,
    #[error("nothing is paused")]
    NotPaused,
    #[error("no active station")]
    NothingActive,
    #[error("player error: {0}")]
    Player(anyhow::Error),
}

/// A consistent read of state and revision, taken under the lock.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub rev: u64,
    pub state: PlaybackState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    Updated,
    Unchanged,
    /// State moved on while the value was being produced.
    Stale,
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    pub pause_policy: PausePolicy,
    pub notify_on_resume: bool,
}

impl From<&PlaybackConfig> for ControllerSettings {
    fn from(cfg: &PlaybackConfig) -> Self {
        Self {
            pause_policy: cfg.pause_policy,
            notify_on_resume: cfg.notify_on_resume,
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&PlaybackConfig::default())
    }
}

struct Inner {
    state: PlaybackState,
    now_playing: NowPlaying,
    rev: u64,
}

pub struct PlaybackController {
    catalog: Arc<StationCatalog>,
    player: Arc<dyn Player>,
    settings: ControllerSettings,
    inner: Mutex<Inner>,
    events: broadcast::Sender<UiEvent>,
    refresh: Arc<Notify>,
}

impl PlaybackController {
    pub fn new(
        catalog: Arc<StationCatalog>,
        player: Arc<dyn Player>,
        settings: ControllerSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            catalog,
            player,
            settings,
            inner: Mutex::new(Inner {
                state: PlaybackState::Idle,
                now_playing: NowPlaying::cleared(),
                rev: 1,
            }),
            events,
            refresh: Arc::new(Notify::new()),
        }
    }

    pub fn catalog(&self) -> &StationCatalog {
        &self.catalog
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.events.subscribe()
    }

    /// Signalled after every successful play; the tracker waits on it.
    pub fn refresh_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.refresh)
    }

    pub async fn current_state(&self) -> PlaybackState {
        self.inner.lock().await.state.clone()
    }

    pub async fn snapshot(&self) -> Snapshot {
        let inner = self.inner.lock().await;
        Snapshot {
            rev: inner.rev,
            state: inner.state.clone(),
        }
    }

    pub async fn now_playing(&self) -> NowPlaying {
        self.inner.lock().await.now_playing.clone()
    }

    // ── transitions ──────────────────────────────────────────────────────────

    pub async fn play(&self, title: &str) -> Result<Station, ControlError> {
        let station = self.lookup(title)?;
        let mut inner = self.inner.lock().await;
        self.start_locked(&mut inner, station).await
    }

    pub async fn pause(&self) -> Result<Station, ControlError> {
        let mut inner = self.inner.lock().await;
        self.pause_locked(&mut inner).await
    }

    pub async fn resume(&self) -> Result<Station, ControlError> {
        let mut inner = self.inner.lock().await;
        match inner.state.clone() {
            PlaybackState::Paused(station) => self.start_locked(&mut inner, station).await,
            _ => {
                debug!("resume ignored: nothing paused");
                Err(ControlError::NotPaused)
            }
        }
    }

    /// Returns false if already idle, in which case nothing happened.
    pub async fn stop(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.state == PlaybackState::Idle {
            debug!("stop ignored: already idle");
            return false;
        }
        self.release_locked(&mut inner).await;
        info!("Stopped");
        self.notify(None, "Stopped");
        true
    }

    /// Menu-click semantics: a different (or no) station starts `title`,
    /// the same station flips between playing and paused.
    pub async fn toggle(&self, title: &str) -> Result<PlaybackState, ControlError> {
        let station = self.lookup(title)?;
        let mut inner = self.inner.lock().await;
        self.toggle_locked(&mut inner, station).await?;
        Ok(inner.state.clone())
    }

    /// Toggle whichever station is active.
    pub async fn toggle_active(&self) -> Result<PlaybackState, ControlError> {
        let mut inner = self.inner.lock().await;
        let station = inner
            .state
            .station()
            .cloned()
            .ok_or(ControlError::NothingActive)?;
        self.toggle_locked(&mut inner, station).await?;
        Ok(inner.state.clone())
    }

    /// Store a resolved now-playing text produced against snapshot `rev`.
    pub async fn commit_now_playing(&self, rev: u64, text: &str) -> Commit {
        let mut inner = self.inner.lock().await;
        if inner.rev != rev || !inner.state.is_playing() {
            debug!(
                "discarding stale now-playing {:?} (rev {} != {})",
                text, rev, inner.rev
            );
            return Commit::Stale;
        }
        if inner.now_playing.raw_text.as_deref() == Some(text) {
            return Commit::Unchanged;
        }

        info!("Now playing: {}", text);
        inner.now_playing = NowPlaying {
            raw_text: Some(text.to_string()),
            last_updated: Local::now(),
        };
        let _ = self.events.send(UiEvent::NowPlaying(Some(text.to_string())));
        self.notify(inner.state.station(), text);
        Commit::Updated
    }

    pub async fn release_player(&self) {
        // Hold the lock so no transition can reach the player mid-teardown.
        let _inner = self.inner.lock().await;
        if let Err(e) = self.player.release().await {
            warn!("player release failed: {}", e);
        }
    }

    // ── locked helpers ───────────────────────────────────────────────────────

    fn lookup(&self, title: &str) -> Result<Station, ControlError> {
        self.catalog
            .get(title)
            .cloned()
            .ok_or_else(|| ControlError::StationNotFound(title.to_string()))
    }

    async fn toggle_locked(
        &self,
        inner: &mut Inner,
        station: Station,
    ) -> Result<Station, ControlError> {
        let playing_same = matches!(&inner.state, PlaybackState::Playing(s) if *s == station);
        if playing_same {
            self.pause_locked(inner).await
        } else {
            self.start_locked(inner, station).await
        }
    }

    async fn start_locked(
        &self,
        inner: &mut Inner,
        station: Station,
    ) -> Result<Station, ControlError> {
        let resuming = matches!(&inner.state, PlaybackState::Paused(s) if *s == station);
        let reload = !resuming || self.settings.pause_policy == PausePolicy::Reload;

        if !resuming && inner.state != PlaybackState::Idle {
            // Implicit stop of whatever was active, without the "Stopped" notice.
            self.release_locked(inner).await;
        }

        let started = if reload {
            info!("Playing URL {}", station.stream_url);
            match self.player.load(&station.stream_url).await {
                Ok(()) => self.player.play().await,
                Err(e) => Err(e),
            }
        } else {
            self.player.play().await
        };

        if let Err(e) = started {
            warn!("failed to start {}: {}", station.title, e);
            if inner.state != PlaybackState::Idle {
                self.release_locked(inner).await;
            }
            return Err(ControlError::Player(e));
        }

        self.transition(inner, PlaybackState::Playing(station.clone()));
        info!("Playing radio: {}", station.title);
        if !resuming || self.settings.notify_on_resume {
            self.notify(Some(&station), &format!("Playing radio: {}", station.title));
        }
        self.refresh.notify_one();
        Ok(station)
    }

    async fn pause_locked(&self, inner: &mut Inner) -> Result<Station, ControlError> {
        let PlaybackState::Playing(station) = inner.state.clone() else {
            debug!("pause ignored: nothing playing");
            return Err(ControlError::NotPlaying);
        };

        let result = match self.settings.pause_policy {
            PausePolicy::Reload => self.player.stop().await,
            PausePolicy::Suspend => self.player.pause().await,
        };
        if let Err(e) = result {
            warn!("player did not pause cleanly: {}", e);
        }

        self.transition(inner, PlaybackState::Paused(station.clone()));
        info!("Paused {}", station.title);
        Ok(station)
    }

    /// Stop the player and go idle. Callers decide whether to announce it.
    async fn release_locked(&self, inner: &mut Inner) {
        if let Err(e) = self.player.stop().await {
            warn!("player did not stop cleanly: {}", e);
        }
        self.transition(inner, PlaybackState::Idle);
    }

    fn transition(&self, inner: &mut Inner, next: PlaybackState) {
        debug!("state {:?} -> {:?}", inner.state, next);
        inner.state = next;
        inner.rev += 1;
        let had_text = inner.now_playing.raw_text.is_some();
        inner.now_playing = NowPlaying::cleared();

        let _ = self.events.send(UiEvent::StateChanged(inner.state.clone()));
        if had_text {
            let _ = self.events.send(UiEvent::NowPlaying(None));
        }
    }

    fn notify(&self, station: Option<&Station>, message: &str) {
        let _ = self.events.send(UiEvent::Notify(Notification {
            subtitle: station.map(|s| s.title.clone()),
            message: message.to_string(),
        }));
    }
}
