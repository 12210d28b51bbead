/// Now-playing tracker: turns stream metadata into one display line.
///
/// Runs on a fixed interval while a station is playing, and once more after
/// every successful play (after a short settle delay, since streams rarely
/// carry metadata in their first few hundred milliseconds).
///
/// A refresh snapshots the controller, fetches metadata without holding the
/// controller lock, then commits against the snapshot revision. If the
/// station changed meanwhile the result is dropped.
use std::sync::Arc;
use std::time::Duration;

use radiobar_proto::catalog::Station;
use radiobar_proto::config::NowPlayingConfig;
use radiobar_proto::protocol::IDLE_PLACEHOLDER;
use regex::{Regex, RegexBuilder};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::controller::{Commit, PlaybackController, PlaybackState};
use crate::player::{Player, PlayerStatus, StreamMetadata};

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Pick the display line. Precedence: "artist - title", then the stream's
/// free-text line, then the station title, then the idle placeholder.
///
/// Only the free-text line goes through the normalizer; structured fields
/// are shown as the stream reports them.
pub fn resolve_now_playing(
    station: Option<&Station>,
    metadata: &StreamMetadata,
    normalizer: Option<&Normalizer>,
) -> String {
    if let (Some(artist), Some(title)) = (non_blank(&metadata.artist), non_blank(&metadata.title)) {
        return format!("{} - {}", artist, title);
    }

    if let Some(text) = non_blank(&metadata.now_playing) {
        return match normalizer {
            Some(n) => n.normalize(text, station),
            None => text.to_string(),
        };
    }

    match station {
        Some(s) if !s.title.is_empty() => s.title.clone(),
        _ => IDLE_PLACEHOLDER.to_string(),
    }
}

/// Cosmetic cleanup of stream-provided text. Never returns an empty string
/// for non-empty input; if cleanup would erase everything the input is kept.
#[derive(Debug, Clone)]
pub struct Normalizer {
    noise_tokens: Vec<String>,
    station_suffix: Regex,
    whitespace: Regex,
}

impl Normalizer {
    pub fn new(noise_tokens: Vec<String>) -> Self {
        Self {
            noise_tokens,
            // " - KEXP", " - BBC RADIO 6" at the very end
            station_suffix: Regex::new(r"\s+-\s+[A-Z0-9][A-Z0-9&'.]+(?:\s+[A-Z0-9][A-Z0-9&'.]*)*\s*$")
                .expect("static regex"),
            whitespace: Regex::new(r"\s+").expect("static regex"),
        }
    }

    pub fn normalize(&self, text: &str, station: Option<&Station>) -> String {
        let mut out = text.trim().to_string();

        if let Some(station) = station {
            out = strip_station_prefix(&out, &station.title);
        }

        for token in &self.noise_tokens {
            if !token.is_empty() {
                out = out.replace(token.as_str(), " ");
            }
        }
        out = self.whitespace.replace_all(&out, " ").into_owned();
        out = out
            .trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '|' | ':' | '~'))
            .to_string();

        if is_all_uppercase(&out) {
            out = title_case(&out);
        } else {
            out = self.station_suffix.replace(&out, "").into_owned();
        }

        if out.is_empty() {
            text.trim().to_string()
        } else {
            out
        }
    }
}

fn strip_station_prefix(text: &str, station_title: &str) -> String {
    if station_title.trim().is_empty() {
        return text.to_string();
    }
    let pattern = format!(r"^\s*{}\s*[-:|~]\s*", regex::escape(station_title.trim()));
    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => re.replace(text, "").into_owned(),
        Err(_) => text.to_string(),
    }
}

fn is_all_uppercase(text: &str) -> bool {
    let mut letters = text.chars().filter(|c| c.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(|c| !c.is_lowercase())
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

// ── tracker ──────────────────────────────────────────────────────────────────

pub struct NowPlayingTracker {
    controller: Arc<PlaybackController>,
    player: Arc<dyn Player>,
    normalizer: Option<Normalizer>,
    poll_interval: Duration,
    settle_delay: Duration,
}

impl NowPlayingTracker {
    pub fn new(
        controller: Arc<PlaybackController>,
        player: Arc<dyn Player>,
        config: &NowPlayingConfig,
        settle_delay: Duration,
    ) -> Self {
        Self {
            controller,
            player,
            normalizer: config
                .normalize
                .then(|| Normalizer::new(config.noise_tokens.clone())),
            poll_interval: config.poll_interval(),
            settle_delay,
        }
    }

    /// Fetch, resolve and (if still current) commit the now-playing line.
    ///
    /// `None` when nothing is playing, when the player could not be queried,
    /// or when the station changed while the fetch was in flight.
    pub async fn refresh(&self) -> Option<String> {
        let snapshot = self.controller.snapshot().await;
        let PlaybackState::Playing(station) = snapshot.state else {
            return None;
        };

        match self.player.status().await {
            Ok(PlayerStatus::Idle) => {
                debug!("now playing: player idle while {} should play", station.title);
                return None;
            }
            Ok(_) => {}
            Err(e) => {
                debug!("now playing: status unavailable: {}", e);
                return None;
            }
        }

        let metadata = match self.player.metadata().await {
            Ok(m) => m,
            Err(e) => {
                debug!("now playing: metadata unavailable: {}", e);
                return None;
            }
        };

        let text = resolve_now_playing(Some(&station), &metadata, self.normalizer.as_ref());
        match self.controller.commit_now_playing(snapshot.rev, &text).await {
            Commit::Stale => None,
            Commit::Updated | Commit::Unchanged => Some(text),
        }
    }

    /// Poll until `shutdown` fires.
    pub async fn run(self, shutdown: CancellationToken) {
        let kick = self.controller.refresh_signal();
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("now playing tracker: polling every {:?}", self.poll_interval);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.refresh().await;
                }
                _ = kick.notified() => {
                    tokio::time::sleep(self.settle_delay).await;
                    self.refresh().await;
                    ticker.reset();
                }
            }
        }
        info!("now playing tracker stopped");
    }
}
