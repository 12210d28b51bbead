/// `Player` backed by an mpv child process, driven over its JSON IPC socket.
///
/// ```text
///   MpvPlayer ──(lazy)──► MpvDriver::spawn_and_connect()
///                               │
///                               ├── writer_task  ← MpvRequest via mpsc → socket
///                               └── reader_task  ← JSON lines from socket
///                                      ├── reply (request_id) → matching oneshot
///                                      └── event              → event channel
/// ```
///
/// mpv is spawned on first use and re-spawned if the process has died since
/// the last call.
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

use crate::player::{Player, PlayerStatus, StreamMetadata};

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

const IPC_TIMEOUT: tokio::time::Duration = tokio::time::Duration::from_secs(5);

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<anyhow::Result<Value>>>>>;

struct MpvRequest {
    req_id: u64,
    payload: String, // serialised JSON line, '\n' included
    reply: oneshot::Sender<anyhow::Result<Value>>,
}

/// Unsolicited mpv message (no request_id).
#[derive(Debug, Clone)]
pub struct MpvEvent {
    pub raw: Value,
}

impl MpvEvent {
    /// e.g. "end-file", "start-file", "file-loaded".
    pub fn event_name(&self) -> Option<&str> {
        self.raw.get("event")?.as_str()
    }

    /// `end-file` carries a reason; "error" means the stream failed.
    pub fn is_stream_error(&self) -> bool {
        self.event_name() == Some("end-file") && self.raw["reason"].as_str() == Some("error")
    }
}

// ── handle ───────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MpvHandle {
    tx: mpsc::Sender<MpvRequest>,
}

impl MpvHandle {
    pub async fn send(&self, command: Value) -> anyhow::Result<Value> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let msg = json!({ "command": command, "request_id": req_id });
        let mut raw = serde_json::to_string(&msg)?;
        raw.push('\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(MpvRequest {
                req_id,
                payload: raw,
                reply: reply_tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("mpv writer task gone"))?;

        tokio::time::timeout(IPC_TIMEOUT, reply_rx)
            .await
            .map_err(|_| anyhow::anyhow!("mpv IPC timeout for req={}", req_id))?
            .map_err(|_| anyhow::anyhow!("mpv reply channel dropped req={}", req_id))?
    }

    async fn set_property(&self, name: &str, value: Value) -> anyhow::Result<()> {
        self.send(json!(["set_property", name, value])).await?;
        Ok(())
    }

    async fn get_property(&self, name: &str) -> anyhow::Result<Value> {
        let resp = self.send(json!(["get_property", name])).await?;
        Ok(resp["data"].clone())
    }
}

// ── driver ───────────────────────────────────────────────────────────────────

/// Owns the mpv child process.
pub struct MpvDriver {
    socket_name: String,
    process: Option<tokio::process::Child>,
    volume: f32,
}

impl MpvDriver {
    pub fn new(volume: f32) -> Self {
        Self {
            socket_name: radiobar_proto::platform::mpv_socket_name(),
            process: None,
            volume,
        }
    }

    pub fn process_alive(&mut self) -> bool {
        if let Some(ref mut child) = self.process {
            child.try_wait().ok().flatten().is_none()
        } else {
            false
        }
    }

    pub async fn kill(&mut self) {
        if let Some(mut p) = self.process.take() {
            let _ = p.kill().await;
        }
        let _ = tokio::fs::remove_file(&self.socket_name).await;
    }

    pub async fn spawn_and_connect(
        &mut self,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        self.kill().await;

        let socket_path = std::path::PathBuf::from(&self.socket_name);

        info!("mpv: spawning new process");
        let mpv_binary = radiobar_proto::platform::find_mpv_binary()
            .ok_or_else(|| anyhow::anyhow!("mpv binary not found"))?;

        let vol_arg = format!(
            "--volume={}",
            (self.volume * 100.0).clamp(0.0, 100.0).round() as i64
        );

        let child = tokio::process::Command::new(mpv_binary)
            .arg("--no-video")
            .arg("--idle=yes")
            .arg("--no-terminal")
            .arg(radiobar_proto::platform::mpv_socket_arg(&self.socket_name))
            .arg(vol_arg)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        self.process = Some(child);

        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            if socket_path.exists() {
                break;
            }
        }
        if !socket_path.exists() {
            anyhow::bail!("mpv IPC socket did not appear");
        }

        let stream = UnixStream::connect(&socket_path).await?;
        info!("mpv: connected to IPC socket {}", self.socket_name);
        Ok(Self::start_io_tasks(stream, event_tx))
    }

    fn start_io_tasks(stream: UnixStream, event_tx: mpsc::Sender<MpvEvent>) -> MpvHandle {
        let (read_half, write_half) = stream.into_split();
        let reader = BufReader::new(read_half);

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (cmd_tx, cmd_rx) = mpsc::channel::<MpvRequest>(64);

        tokio::spawn(writer_task(write_half, cmd_rx, pending.clone()));
        tokio::spawn(reader_task(reader, pending, event_tx));

        MpvHandle { tx: cmd_tx }
    }
}

async fn reader_task<R>(
    mut reader: BufReader<R>,
    pending: PendingMap,
    event_tx: mpsc::Sender<MpvEvent>,
) where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                fail_pending(&pending, "mpv IPC connection closed").await;
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let val: Value = match serde_json::from_str(trimmed) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!("mpv reader: invalid json '{}': {}", trimmed, e);
                        continue;
                    }
                };

                if let Some(req_id) = val.get("request_id").and_then(|v| v.as_u64()) {
                    let mut map = pending.lock().await;
                    if let Some(tx) = map.remove(&req_id) {
                        let result = if val["error"].as_str() == Some("success") {
                            Ok(val)
                        } else {
                            let err = val["error"].as_str().unwrap_or("unknown error");
                            debug!("mpv reader: req={} err={}", req_id, err);
                            Err(anyhow::anyhow!("mpv error: {}", err))
                        };
                        let _ = tx.send(result);
                    } else {
                        debug!("mpv reader: response for unknown req={}", req_id);
                    }
                } else {
                    let _ = event_tx.send(MpvEvent { raw: val }).await;
                }
            }
            Err(e) => {
                warn!("mpv reader: read error: {}", e);
                fail_pending(&pending, "mpv IPC read error").await;
                break;
            }
        }
    }
}

async fn fail_pending(pending: &PendingMap, reason: &'static str) {
    let mut map = pending.lock().await;
    for (_, tx) in map.drain() {
        let _ = tx.send(Err(anyhow::anyhow!(reason)));
    }
}

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<MpvRequest>, pending: PendingMap)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(req) = rx.recv().await {
        // Register before writing so the reader can always match the reply.
        pending.lock().await.insert(req.req_id, req.reply);
        debug!("mpv writer: req={} {}", req.req_id, req.payload.trim());
        if let Err(e) = writer.write_all(req.payload.as_bytes()).await {
            warn!("mpv writer: write error: {}", e);
            if let Some(tx) = pending.lock().await.remove(&req.req_id) {
                let _ = tx.send(Err(anyhow::anyhow!("mpv write error: {}", e)));
            }
            break;
        }
    }
    debug!("mpv writer: task exiting");
}

// ── Player implementation ────────────────────────────────────────────────────

struct MpvSession {
    driver: MpvDriver,
    handle: Option<MpvHandle>,
}

pub struct MpvPlayer {
    session: Mutex<MpvSession>,
}

impl MpvPlayer {
    pub fn new(volume: f32) -> Self {
        Self {
            session: Mutex::new(MpvSession {
                driver: MpvDriver::new(volume),
                handle: None,
            }),
        }
    }

    /// Handle to a live mpv, spawning one if needed.
    async fn connect(&self) -> anyhow::Result<MpvHandle> {
        let mut session = self.session.lock().await;
        if let Some(handle) = session.handle.clone() {
            if session.driver.process_alive() {
                return Ok(handle);
            }
            warn!("mpv: process died, respawning");
            session.handle = None;
        }

        let (event_tx, event_rx) = mpsc::channel::<MpvEvent>(64);
        tokio::spawn(log_events(event_rx));

        let handle = session.driver.spawn_and_connect(event_tx).await?;
        session.handle = Some(handle.clone());
        Ok(handle)
    }

    /// Handle to mpv only if it is already running.
    async fn existing(&self) -> Option<MpvHandle> {
        let mut session = self.session.lock().await;
        if session.handle.is_some() && session.driver.process_alive() {
            session.handle.clone()
        } else {
            None
        }
    }
}

async fn log_events(mut rx: mpsc::Receiver<MpvEvent>) {
    while let Some(evt) = rx.recv().await {
        if evt.is_stream_error() {
            warn!("mpv: stream ended with error: {}", evt.raw);
        } else if let Some(name) = evt.event_name() {
            debug!("mpv: event {}", name);
        }
    }
}

#[async_trait]
impl Player for MpvPlayer {
    async fn load(&self, url: &str) -> anyhow::Result<()> {
        let handle = self.connect().await?;
        handle.set_property("pause", json!(true)).await?;
        handle.send(json!(["loadfile", url, "replace"])).await?;
        Ok(())
    }

    async fn play(&self) -> anyhow::Result<()> {
        let handle = self.connect().await?;
        handle.set_property("pause", json!(false)).await
    }

    async fn pause(&self) -> anyhow::Result<()> {
        match self.existing().await {
            Some(handle) => handle.set_property("pause", json!(true)).await,
            None => Ok(()),
        }
    }

    async fn stop(&self) -> anyhow::Result<()> {
        if let Some(handle) = self.existing().await {
            handle.send(json!(["stop"])).await?;
        }
        Ok(())
    }

    async fn status(&self) -> anyhow::Result<PlayerStatus> {
        let Some(handle) = self.existing().await else {
            return Ok(PlayerStatus::Idle);
        };
        if handle.get_property("idle-active").await?.as_bool() == Some(true) {
            return Ok(PlayerStatus::Idle);
        }
        if handle.get_property("pause").await?.as_bool() == Some(true) {
            return Ok(PlayerStatus::Paused);
        }
        let core_idle = handle.get_property("core-idle").await?.as_bool();
        Ok(if core_idle == Some(true) {
            PlayerStatus::Buffering
        } else {
            PlayerStatus::Playing
        })
    }

    async fn metadata(&self) -> anyhow::Result<StreamMetadata> {
        let handle = self
            .existing()
            .await
            .ok_or_else(|| anyhow::anyhow!("mpv not running"))?;
        let data = handle.get_property("metadata").await?;
        Ok(metadata_from_value(&data))
    }

    async fn release(&self) -> anyhow::Result<()> {
        let mut session = self.session.lock().await;
        if let Some(handle) = session.handle.take() {
            let _ = handle.send(json!(["quit"])).await;
        }
        session.driver.kill().await;
        info!("mpv: released");
        Ok(())
    }
}

/// mpv reports tags with whatever case the stream used (`TITLE`, `Artist`,
/// `icy-title`).
fn metadata_from_value(data: &Value) -> StreamMetadata {
    let Some(map) = data.as_object() else {
        return StreamMetadata::default();
    };
    let lookup = |key: &str| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .and_then(|(_, v)| v.as_str())
            .map(|s| s.to_string())
    };
    StreamMetadata {
        artist: lookup("artist"),
        title: lookup("title"),
        now_playing: lookup("icy-title"),
    }
}
