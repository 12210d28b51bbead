//! UI capability and the one-way projection that drives it.
//!
//! The UI never holds authoritative state. `run_projection` subscribes to the
//! controller's events and replays them onto a `Ui` implementation.

use std::sync::Arc;

use radiobar_proto::catalog::Station;
use radiobar_proto::config::UiConfig;
use radiobar_proto::protocol::IDLE_PLACEHOLDER;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::controller::{PlaybackController, PlaybackState};

pub const APP_NAME: &str = "RadioBar";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveMark {
    Playing,
    Paused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Active station title, when there is one.
    pub subtitle: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    StateChanged(PlaybackState),
    /// `None` clears the line back to the idle placeholder.
    NowPlaying(Option<String>),
    Notify(Notification),
}

pub trait Ui: Send {
    fn render_stations(&mut self, stations: &[Station]);
    fn set_active(&mut self, active: Option<(&Station, ActiveMark)>);
    /// Status-bar title next to the icon.
    fn set_title(&mut self, title: Option<&str>);
    fn set_now_playing(&mut self, text: &str);
    fn notify(&mut self, notification: &Notification);
    fn alert(&mut self, message: &str);
}

/// Headless UI that renders into the log.
#[derive(Debug, Default)]
pub struct LogUi;

impl Ui for LogUi {
    fn render_stations(&mut self, stations: &[Station]) {
        info!("{} stations loaded", stations.len());
        for (i, s) in stations.iter().enumerate() {
            info!("  {:>2}. {}", i + 1, s.title);
        }
    }

    fn set_active(&mut self, active: Option<(&Station, ActiveMark)>) {
        match active {
            Some((s, mark)) => info!("[ui] {} marked {:?}", s.title, mark),
            None => info!("[ui] no active station"),
        }
    }

    fn set_title(&mut self, title: Option<&str>) {
        info!("[ui] title: {}", title.unwrap_or(APP_NAME));
    }

    fn set_now_playing(&mut self, text: &str) {
        info!("[ui] now playing: {}", text);
    }

    fn notify(&mut self, n: &Notification) {
        match &n.subtitle {
            Some(sub) => info!("[notification] {} | {} | {}", APP_NAME, sub, n.message),
            None => info!("[notification] {} | {}", APP_NAME, n.message),
        }
    }

    fn alert(&mut self, message: &str) {
        error!("[alert] {}", message);
    }
}

/// Render the station list once, then follow controller events until the
/// controller goes away.
pub async fn run_projection(
    mut ui: Box<dyn Ui>,
    controller: Arc<PlaybackController>,
    settings: UiConfig,
) {
    let mut rx = controller.subscribe();
    ui.render_stations(controller.catalog().as_slice());
    render_state(ui.as_mut(), &controller.current_state().await, &settings);

    loop {
        match rx.recv().await {
            Ok(event) => apply(ui.as_mut(), event, &settings),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("UI projection missed {} events, re-rendering", n);
                render_state(ui.as_mut(), &controller.current_state().await, &settings);
                let text = controller.now_playing().await.raw_text;
                ui.set_now_playing(text.as_deref().unwrap_or(IDLE_PLACEHOLDER));
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

pub fn apply(ui: &mut dyn Ui, event: UiEvent, settings: &UiConfig) {
    match event {
        UiEvent::StateChanged(state) => render_state(ui, &state, settings),
        UiEvent::NowPlaying(text) => ui.set_now_playing(text.as_deref().unwrap_or(IDLE_PLACEHOLDER)),
        UiEvent::Notify(n) => {
            if settings.show_notifications {
                ui.notify(&n);
            }
        }
    }
}

fn render_state(ui: &mut dyn Ui, state: &PlaybackState, settings: &UiConfig) {
    let active = match state {
        PlaybackState::Idle => None,
        PlaybackState::Playing(s) => Some((s, ActiveMark::Playing)),
        PlaybackState::Paused(s) => Some((s, ActiveMark::Paused)),
    };
    ui.set_active(active);

    let title = state
        .station()
        .filter(|_| settings.show_station)
        .map(|s| s.title.as_str());
    ui.set_title(title);

    if matches!(state, PlaybackState::Idle) {
        ui.set_now_playing(IDLE_PLACEHOLDER);
    }
}
