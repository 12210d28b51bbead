//! The media player capability the playback core drives.

use async_trait::async_trait;

/// What the player reports about itself, independent of what the controller
/// believes it asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    /// Nothing loaded, or the stream ended.
    Idle,
    /// Stream requested, no audio yet.
    Buffering,
    Playing,
    Paused,
}

/// Stream-embedded metadata. Every field may be absent; blank strings are
/// treated the same as absent by the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamMetadata {
    pub artist: Option<String>,
    pub title: Option<String>,
    /// Free-text "now playing" line (ICY `StreamTitle` for shoutcast/icecast).
    pub now_playing: Option<String>,
}

#[async_trait]
pub trait Player: Send + Sync {
    /// Replace whatever is loaded with `url`, without starting output.
    async fn load(&self, url: &str) -> anyhow::Result<()>;
    async fn play(&self) -> anyhow::Result<()>;
    async fn pause(&self) -> anyhow::Result<()>;
    async fn stop(&self) -> anyhow::Result<()>;
    async fn status(&self) -> anyhow::Result<PlayerStatus>;
    async fn metadata(&self) -> anyhow::Result<StreamMetadata>;
    /// Tear the player down. No other call is expected afterwards.
    async fn release(&self) -> anyhow::Result<()>;
}
