#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use radiobar_daemon::controller::{ControllerSettings, PlaybackController};
use radiobar_daemon::player::{Player, PlayerStatus, StreamMetadata};
use radiobar_proto::catalog::{Station, StationCatalog};
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Load(String),
    Play,
    Pause,
    Stop,
    Release,
}

/// Parks the next metadata fetch until released.
#[derive(Clone, Default)]
pub struct MetadataHold {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<Call>,
    loaded: Option<String>,
    /// Loads issued while another stream was still loaded.
    overlapping_loads: usize,
    status: Option<PlayerStatus>,
    metadata: StreamMetadata,
    fail_load: bool,
    fail_metadata: bool,
    hold: Option<MetadataHold>,
    metadata_fetches: usize,
}

/// Records every call; metadata and failures are scriptable.
#[derive(Default)]
pub struct FakePlayer {
    state: Mutex<FakeState>,
}

impl FakePlayer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn loaded(&self) -> Option<String> {
        self.state.lock().unwrap().loaded.clone()
    }

    pub fn overlapping_loads(&self) -> usize {
        self.state.lock().unwrap().overlapping_loads
    }

    pub fn metadata_fetches(&self) -> usize {
        self.state.lock().unwrap().metadata_fetches
    }

    pub fn set_metadata(&self, artist: Option<&str>, title: Option<&str>, now_playing: Option<&str>) {
        self.state.lock().unwrap().metadata = StreamMetadata {
            artist: artist.map(String::from),
            title: title.map(String::from),
            now_playing: now_playing.map(String::from),
        };
    }

    pub fn set_status(&self, status: PlayerStatus) {
        self.state.lock().unwrap().status = Some(status);
    }

    pub fn fail_load(&self, fail: bool) {
        self.state.lock().unwrap().fail_load = fail;
    }

    pub fn fail_metadata(&self, fail: bool) {
        self.state.lock().unwrap().fail_metadata = fail;
    }

    pub fn hold_next_metadata(&self) -> MetadataHold {
        let hold = MetadataHold::default();
        self.state.lock().unwrap().hold = Some(hold.clone());
        hold
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl Player for FakePlayer {
    async fn load(&self, url: &str) -> anyhow::Result<()> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(Call::Load(url.to_string()));
        if st.fail_load {
            anyhow::bail!("connection refused: {}", url);
        }
        if st.loaded.is_some() {
            st.overlapping_loads += 1;
        }
        st.loaded = Some(url.to_string());
        Ok(())
    }

    async fn play(&self) -> anyhow::Result<()> {
        self.record(Call::Play);
        Ok(())
    }

    async fn pause(&self) -> anyhow::Result<()> {
        self.record(Call::Pause);
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(Call::Stop);
        st.loaded = None;
        Ok(())
    }

    async fn status(&self) -> anyhow::Result<PlayerStatus> {
        let st = self.state.lock().unwrap();
        Ok(st.status.unwrap_or(if st.loaded.is_some() {
            PlayerStatus::Playing
        } else {
            PlayerStatus::Idle
        }))
    }

    async fn metadata(&self) -> anyhow::Result<StreamMetadata> {
        let (hold, result) = {
            let mut st = self.state.lock().unwrap();
            st.metadata_fetches += 1;
            let result = if st.fail_metadata {
                Err(anyhow::anyhow!("metadata parse failed"))
            } else {
                Ok(st.metadata.clone())
            };
            (st.hold.take(), result)
        };
        if let Some(hold) = hold {
            hold.entered.notify_one();
            hold.release.notified().await;
        }
        result
    }

    async fn release(&self) -> anyhow::Result<()> {
        self.record(Call::Release);
        Ok(())
    }
}

pub fn fip() -> Station {
    Station::new("FIP", "https://icecast.radiofrance.fr/fip-hifi.aac")
}

pub fn nts() -> Station {
    Station::new("NTS 1", "https://stream-relay-geo.ntslive.net/stream")
}

pub fn two_station_catalog() -> Arc<StationCatalog> {
    Arc::new(StationCatalog::new(vec![fip(), nts()]).unwrap())
}

pub fn controller(player: &Arc<FakePlayer>) -> Arc<PlaybackController> {
    controller_with(player, ControllerSettings::default())
}

pub fn controller_with(
    player: &Arc<FakePlayer>,
    settings: ControllerSettings,
) -> Arc<PlaybackController> {
    let player: Arc<dyn Player> = player.clone();
    Arc::new(PlaybackController::new(two_station_catalog(), player, settings))
}
