use std::sync::Arc;

use radiobar_daemon::controller::{ControllerSettings, PlaybackController};
use radiobar_daemon::lifecycle::{LifecycleCoordinator, SignalListener};
use radiobar_daemon::mpv::MpvPlayer;
use radiobar_daemon::nowplaying::NowPlayingTracker;
use radiobar_daemon::player::Player;
use radiobar_daemon::socket::{self, CommandDispatcher, ServerLimits};
use radiobar_daemon::ui::{self, LogUi, Ui};
use radiobar_proto::catalog::StationCatalog;
use radiobar_proto::config::Config;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = radiobar_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("radiobar.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,radiobar_daemon=debug")),
        )
        .init();

    eprintln!("radiobar log: {}", log_path.display());
    info!("RadioBar starting");

    let config = Config::load()?;
    info!("Config loaded from: {:?}", Config::config_path());

    let mut ui = LogUi;
    let catalog = match StationCatalog::load(&config.stations.path) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("Station list unusable: {}", e);
            ui.alert(&format!("No stations loaded: {}", e));
            StationCatalog::empty()
        }
    };

    let player: Arc<dyn Player> = Arc::new(MpvPlayer::new(config.playback.volume));
    let controller = Arc::new(PlaybackController::new(
        Arc::new(catalog),
        Arc::clone(&player),
        ControllerSettings::from(&config.playback),
    ));

    let shutdown = CancellationToken::new();
    let lifecycle = Arc::new(LifecycleCoordinator::new(
        Arc::clone(&controller),
        shutdown.clone(),
    ));

    tokio::spawn(ui::run_projection(
        Box::new(ui),
        Arc::clone(&controller),
        config.ui.clone(),
    ));

    let tracker = NowPlayingTracker::new(
        Arc::clone(&controller),
        Arc::clone(&player),
        &config.nowplaying,
        config.playback.settle_delay(),
    );
    let tracker_handle = tokio::spawn(tracker.run(shutdown.clone()));

    // Without the socket the menu still works, so a bind failure is not fatal.
    match socket::bind(&config.remote.bind_address, config.remote.port).await {
        Ok(listener) => {
            let handle = socket::start_server(
                listener,
                Arc::new(CommandDispatcher::new(
                    Arc::clone(&controller),
                    Arc::clone(&lifecycle),
                )),
                ServerLimits::from(&config.remote),
                shutdown.clone(),
            );
            lifecycle.attach_server(handle).await;
        }
        Err(e) => {
            error!(
                "Remote control unavailable on {}:{}: {}",
                config.remote.bind_address, config.remote.port, e
            );
        }
    }

    SignalListener::new()?.run(&lifecycle).await;

    // Joins the remote server before stopping playback.
    lifecycle.quit().await;
    let _ = tracker_handle.await;

    info!("RadioBar exited");
    Ok(())
}
