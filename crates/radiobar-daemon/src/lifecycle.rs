use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::controller::PlaybackController;

/// Reacts to system sleep/wake and quit.
pub struct LifecycleCoordinator {
    controller: Arc<PlaybackController>,
    /// Cleared by the first sleep; later sleeps without a wake do nothing.
    awake: AtomicBool,
    shutdown: CancellationToken,
    server: Mutex<Option<JoinHandle<()>>>,
}

impl LifecycleCoordinator {
    pub fn new(controller: Arc<PlaybackController>, shutdown: CancellationToken) -> Self {
        Self {
            controller,
            awake: AtomicBool::new(true),
            shutdown,
            server: Mutex::new(None),
        }
    }

    /// Hand over the remote server task so `quit` can wait for it.
    pub async fn attach_server(&self, handle: JoinHandle<()>) {
        *self.server.lock().await = Some(handle);
    }

    /// Returns true if this call paused playback.
    pub async fn sleep(&self) -> bool {
        if !self.awake.swap(false, Ordering::SeqCst) {
            info!("Sleep ignored: already asleep");
            return false;
        }
        info!("Going to sleep");
        self.controller.pause().await.is_ok()
    }

    /// Playback is not resumed on wake.
    pub fn wake(&self) {
        self.awake.store(true, Ordering::SeqCst);
        info!("Waking up");
    }

    pub fn is_awake(&self) -> bool {
        self.awake.load(Ordering::SeqCst)
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop listeners, go idle, release the player. The caller exits afterwards.
    ///
    /// A remote command already being served finishes before playback is
    /// stopped, so nothing can start between the stop and the release.
    pub async fn quit(&self) {
        info!("Quitting");
        self.shutdown.cancel();
        let server = self.server.lock().await.take();
        if let Some(handle) = server {
            if let Err(e) = handle.await {
                warn!("remote server task ended abnormally: {}", e);
            }
        }
        self.controller.stop().await;
        self.controller.release_player().await;
    }
}

/// SIGUSR1/SIGUSR2 stand in for the system sleep/wake notifications;
/// SIGINT and SIGTERM quit.
///
/// Every handler is registered in `new`, so a signal that lands while the
/// loop is busy with another one is still delivered on the next turn.
#[cfg(unix)]
pub struct SignalListener {
    sleep: tokio::signal::unix::Signal,
    wake: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
    interrupt: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl SignalListener {
    pub fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            sleep: signal(SignalKind::user_defined1())?,
            wake: signal(SignalKind::user_defined2())?,
            terminate: signal(SignalKind::terminate())?,
            interrupt: signal(SignalKind::interrupt())?,
        })
    }

    /// Returns once a quit signal arrives or shutdown was requested elsewhere.
    pub async fn run(mut self, lifecycle: &LifecycleCoordinator) {
        let shutdown = lifecycle.shutdown_token();
        loop {
            tokio::select! {
                _ = self.sleep.recv() => {
                    lifecycle.sleep().await;
                }
                _ = self.wake.recv() => lifecycle.wake(),
                _ = self.terminate.recv() => {
                    info!("SIGTERM received");
                    break;
                }
                _ = self.interrupt.recv() => {
                    info!("SIGINT received");
                    break;
                }
                _ = shutdown.cancelled() => break,
            }
        }
    }
}
