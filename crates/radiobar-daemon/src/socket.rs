use std::sync::Arc;
use std::time::Duration;

use radiobar_proto::config::RemoteConfig;
use radiobar_proto::protocol::{response, RemoteCommand, IDLE_PLACEHOLDER, UNKNOWN_INPUT};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::controller::{ControlError, PlaybackController};
use crate::lifecycle::LifecycleCoordinator;

#[derive(Debug, Clone, Copy)]
pub struct ServerLimits {
    pub max_command_len: usize,
    pub read_timeout: Duration,
}

impl From<&RemoteConfig> for ServerLimits {
    fn from(cfg: &RemoteConfig) -> Self {
        Self {
            max_command_len: cfg.max_command_len.max(1),
            read_timeout: cfg.read_timeout(),
        }
    }
}

/// Maps remote commands onto controller and lifecycle operations.
pub struct CommandDispatcher {
    controller: Arc<PlaybackController>,
    lifecycle: Arc<LifecycleCoordinator>,
}

impl CommandDispatcher {
    pub fn new(controller: Arc<PlaybackController>, lifecycle: Arc<LifecycleCoordinator>) -> Self {
        Self {
            controller,
            lifecycle,
        }
    }

    pub async fn dispatch(&self, cmd: RemoteCommand) -> String {
        match cmd {
            RemoteCommand::Play(n) => {
                let catalog = self.controller.catalog();
                let Some(station) = catalog.by_number(n) else {
                    return response::no_station(n, catalog.len());
                };
                match self.controller.play(&station.title).await {
                    Ok(s) => response::listening_to(&s.title),
                    Err(e) => response::error(e),
                }
            }
            RemoteCommand::Off => {
                self.controller.stop().await;
                response::OFF.to_string()
            }
            RemoteCommand::Resume => match self.controller.resume().await {
                Ok(_) => response::ON.to_string(),
                Err(e) => quiet_error(e),
            },
            RemoteCommand::Pause => match self.controller.pause().await {
                Ok(_) => response::PAUSE.to_string(),
                Err(e) => quiet_error(e),
            },
            RemoteCommand::Toggle => match self.controller.toggle_active().await {
                Ok(state) => state
                    .station()
                    .map(|s| response::toggle(&s.title))
                    .unwrap_or_default(),
                Err(e) => quiet_error(e),
            },
            RemoteCommand::Info => self.now_playing_text().await,
            RemoteCommand::Sleep => {
                self.lifecycle.sleep().await;
                response::SLEEP.to_string()
            }
            RemoteCommand::Wake => {
                self.lifecycle.wake();
                response::WAKE.to_string()
            }
            RemoteCommand::Unknown(_) => UNKNOWN_INPUT.to_string(),
        }
    }

    async fn now_playing_text(&self) -> String {
        if let Some(text) = self.controller.now_playing().await.raw_text {
            return text;
        }
        match self.controller.current_state().await.station() {
            Some(s) => s.title.clone(),
            None => IDLE_PLACEHOLDER.to_string(),
        }
    }
}

/// Nothing to act on gets an empty answer; a failing player is reported.
fn quiet_error(e: ControlError) -> String {
    match e {
        ControlError::Player(_) => response::error(e),
        _ => response::NONE.to_string(),
    }
}

pub async fn bind(bind_address: &str, port: u16) -> anyhow::Result<TcpListener> {
    let addr = format!("{}:{}", bind_address, port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Remote control listening at {}", listener.local_addr()?);
    Ok(listener)
}

/// Serve connections one at a time until `shutdown` fires. A connection in
/// progress is finished before the loop exits; the listener is closed on return.
pub fn start_server(
    listener: TcpListener,
    dispatcher: Arc<CommandDispatcher>,
    limits: ServerLimits,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut client_id = 0usize;

        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    client_id += 1;
                    if let Err(e) = handle_client(stream, &dispatcher, limits, client_id).await {
                        warn!("Remote client {} ({}) dropped: {}", client_id, peer, e);
                    }
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }

        info!("Remote control server stopped");
    })
}

async fn handle_client(
    mut stream: TcpStream,
    dispatcher: &CommandDispatcher,
    limits: ServerLimits,
    client_id: usize,
) -> anyhow::Result<()> {
    let mut buf = vec![0u8; limits.max_command_len];

    // One read, like the clients expect: they send and then wait for the reply.
    let n = tokio::time::timeout(limits.read_timeout, stream.read(&mut buf))
        .await
        .map_err(|_| anyhow::anyhow!("no command within {:?}", limits.read_timeout))??;

    // Port checks connect and close without a byte. The empty command arrives as "\n".
    if n == 0 {
        debug!("Remote client {} closed without a command", client_id);
        return Ok(());
    }

    let msg = String::from_utf8_lossy(&buf[..n]);
    info!("Remote client {} sent {:?}", client_id, msg);

    let reply = dispatcher.dispatch(RemoteCommand::parse(&msg)).await;
    stream.write_all(reply.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}
