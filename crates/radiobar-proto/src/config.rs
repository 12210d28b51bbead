use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub nowplaying: NowPlayingConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub stations: StationsConfig,
}

/// Loopback control socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// How long a connected client may stay silent before it is dropped.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Longest command accepted; longer input is truncated at this many bytes.
    #[serde(default = "default_max_command_len")]
    pub max_command_len: usize,
}

/// What pausing a live stream does to the player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PausePolicy {
    /// Stop the stream on pause and fetch it fresh on resume.
    #[default]
    Reload,
    /// Keep the stream loaded and only suspend output.
    Suspend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default)]
    pub pause_policy: PausePolicy,
    /// Also announce "Playing radio: ..." when resuming a paused station.
    #[serde(default)]
    pub notify_on_resume: bool,
    /// Wait after starting a stream before the first metadata read.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NowPlayingConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_normalize")]
    pub normalize: bool,
    #[serde(default = "default_noise_tokens")]
    pub noise_tokens: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_true")]
    pub show_notifications: bool,
    #[serde(default = "default_true")]
    pub show_station: bool,
}

/// Station list source. `.json` uses the `{"channels": [...]}` layout,
/// `.toml` uses `[[station]]` tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationsConfig {
    #[serde(default = "default_stations_path")]
    pub path: PathBuf,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            read_timeout_ms: default_read_timeout_ms(),
            max_command_len: default_max_command_len(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            pause_policy: PausePolicy::default(),
            notify_on_resume: false,
            settle_delay_ms: default_settle_delay_ms(),
            volume: default_volume(),
        }
    }
}

impl Default for NowPlayingConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            normalize: default_normalize(),
            noise_tokens: default_noise_tokens(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_notifications: true,
            show_station: true,
        }
    }
}

impl Default for StationsConfig {
    fn default() -> Self {
        Self {
            path: default_stations_path(),
        }
    }
}

/// Shortest read timeout honoured; 0 would fail every connection.
const MIN_READ_TIMEOUT_MS: u64 = 100;

impl RemoteConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.max(MIN_READ_TIMEOUT_MS))
    }
}

impl PlaybackConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl NowPlayingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

fn default_bind_address() -> String {
    platform::default_remote_host().to_string()
}

fn default_port() -> u16 {
    platform::DEFAULT_REMOTE_PORT
}

fn default_read_timeout_ms() -> u64 {
    2000
}

fn default_max_command_len() -> usize {
    1024
}

fn default_settle_delay_ms() -> u64 {
    300
}

fn default_volume() -> f32 {
    0.5
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_normalize() -> bool {
    true
}

fn default_true() -> bool {
    true
}

fn default_noise_tokens() -> Vec<String> {
    ["Now Playing:", "NOW PLAYING:", "On Air:", "ON AIR:", "[LIVE]", "(LIVE)", "(Live)"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_stations_path() -> PathBuf {
    platform::config_dir().join("stations.json")
}

impl Config {
    /// Load `config.toml` from the config dir, writing defaults on first run.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config at {:?}, writing defaults", config_path);
            let config = Self::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
