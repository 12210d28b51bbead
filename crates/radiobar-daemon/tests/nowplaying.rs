mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{controller, FakePlayer};
use radiobar_daemon::controller::PlaybackController;
use radiobar_daemon::nowplaying::NowPlayingTracker;
use radiobar_daemon::player::{Player, PlayerStatus};
use radiobar_daemon::ui::UiEvent;
use radiobar_proto::config::NowPlayingConfig;
use tokio_util::sync::CancellationToken;

fn tracker(ctrl: &Arc<PlaybackController>, player: &Arc<FakePlayer>) -> NowPlayingTracker {
    let player: Arc<dyn Player> = player.clone();
    NowPlayingTracker::new(
        ctrl.clone(),
        player,
        &NowPlayingConfig::default(),
        Duration::ZERO,
    )
}

#[tokio::test]
async fn refresh_resolves_artist_and_title() {
    let player = FakePlayer::new();
    let ctrl = controller(&player);
    let tracker = tracker(&ctrl, &player);

    ctrl.play("FIP").await.unwrap();
    player.set_metadata(Some("Daft Punk"), Some("One More Time"), Some("ignored"));

    assert_eq!(
        tracker.refresh().await.as_deref(),
        Some("Daft Punk - One More Time")
    );
    assert_eq!(
        ctrl.now_playing().await.raw_text.as_deref(),
        Some("Daft Punk - One More Time")
    );
}

#[tokio::test]
async fn refresh_keeps_uppercase_titles_with_default_config() {
    let player = FakePlayer::new();
    let ctrl = controller(&player);
    let tracker = tracker(&ctrl, &player);

    ctrl.play("FIP").await.unwrap();
    player.set_metadata(Some("Jackson 5"), Some("ABC"), None);
    assert_eq!(tracker.refresh().await.as_deref(), Some("Jackson 5 - ABC"));

    player.set_metadata(Some("Kendrick Lamar"), Some("DNA."), None);
    assert_eq!(tracker.refresh().await.as_deref(), Some("Kendrick Lamar - DNA."));
    assert_eq!(
        ctrl.now_playing().await.raw_text.as_deref(),
        Some("Kendrick Lamar - DNA.")
    );
}

#[tokio::test]
async fn refresh_falls_back_to_station_title() {
    let player = FakePlayer::new();
    let ctrl = controller(&player);
    let tracker = tracker(&ctrl, &player);

    ctrl.play("NTS 1").await.unwrap();
    assert_eq!(tracker.refresh().await.as_deref(), Some("NTS 1"));

    player.set_metadata(None, None, Some("Show X"));
    assert_eq!(tracker.refresh().await.as_deref(), Some("Show X"));
}

#[tokio::test]
async fn refresh_is_suppressed_while_idle_or_paused() {
    let player = FakePlayer::new();
    let ctrl = controller(&player);
    let tracker = tracker(&ctrl, &player);

    assert_eq!(tracker.refresh().await, None);

    ctrl.play("FIP").await.unwrap();
    ctrl.pause().await.unwrap();
    assert_eq!(tracker.refresh().await, None);
    assert_eq!(player.metadata_fetches(), 0);
}

#[tokio::test]
async fn metadata_failure_is_transient() {
    let player = FakePlayer::new();
    let ctrl = controller(&player);
    let tracker = tracker(&ctrl, &player);

    ctrl.play("FIP").await.unwrap();
    player.set_metadata(Some("Nina Simone"), Some("Sinnerman"), None);
    player.fail_metadata(true);
    assert_eq!(tracker.refresh().await, None);
    assert_eq!(ctrl.now_playing().await.raw_text, None);

    player.fail_metadata(false);
    assert_eq!(
        tracker.refresh().await.as_deref(),
        Some("Nina Simone - Sinnerman")
    );
}

#[tokio::test]
async fn idle_player_skips_fetch() {
    let player = FakePlayer::new();
    let ctrl = controller(&player);
    let tracker = tracker(&ctrl, &player);

    ctrl.play("FIP").await.unwrap();
    player.set_status(PlayerStatus::Idle);
    assert_eq!(tracker.refresh().await, None);
    assert_eq!(player.metadata_fetches(), 0);
}

#[tokio::test]
async fn unchanged_text_is_pushed_once() {
    let player = FakePlayer::new();
    let ctrl = controller(&player);
    let tracker = tracker(&ctrl, &player);

    ctrl.play("FIP").await.unwrap();
    let mut rx = ctrl.subscribe();
    player.set_metadata(Some("Air"), Some("La Femme d'Argent"), None);

    tracker.refresh().await;
    let first_update = ctrl.now_playing().await.last_updated;
    tracker.refresh().await;
    tracker.refresh().await;

    let mut pushes = 0;
    while let Ok(evt) = rx.try_recv() {
        if let UiEvent::NowPlaying(Some(_)) = evt {
            pushes += 1;
        }
    }
    assert_eq!(pushes, 1);
    assert_eq!(ctrl.now_playing().await.last_updated, first_update);
}

#[tokio::test]
async fn pause_clears_now_playing() {
    let player = FakePlayer::new();
    let ctrl = controller(&player);
    let tracker = tracker(&ctrl, &player);

    ctrl.play("FIP").await.unwrap();
    player.set_metadata(None, None, Some("Club Jazzafip"));
    tracker.refresh().await;
    assert!(ctrl.now_playing().await.raw_text.is_some());

    ctrl.pause().await.unwrap();
    assert_eq!(ctrl.now_playing().await.raw_text, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stale_fetch_does_not_overwrite_new_station() {
    let player = FakePlayer::new();
    let ctrl = controller(&player);
    let tracker = Arc::new(tracker(&ctrl, &player));

    ctrl.play("FIP").await.unwrap();
    player.set_metadata(Some("Old Artist"), Some("Old Song"), None);

    let hold = player.hold_next_metadata();
    let in_flight = {
        let tracker = tracker.clone();
        tokio::spawn(async move { tracker.refresh().await })
    };
    hold.entered.notified().await;

    ctrl.play("NTS 1").await.unwrap();
    hold.release.notify_one();

    assert_eq!(in_flight.await.unwrap(), None);
    assert_eq!(ctrl.now_playing().await.raw_text, None);

    player.set_metadata(None, None, Some("Floating Points"));
    assert_eq!(tracker.refresh().await.as_deref(), Some("Floating Points"));
}

#[tokio::test]
async fn run_refreshes_after_play_and_stops_on_shutdown() {
    let player = FakePlayer::new();
    let ctrl = controller(&player);
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(tracker(&ctrl, &player).run(shutdown.clone()));

    player.set_metadata(Some("Bonobo"), Some("Kerala"), None);
    ctrl.play("FIP").await.unwrap();

    let mut text = None;
    for _ in 0..50 {
        text = ctrl.now_playing().await.raw_text;
        if text.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(text.as_deref(), Some("Bonobo - Kerala"));

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("tracker did not stop")
        .unwrap();
}
