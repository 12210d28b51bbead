mod common;

use common::{controller, fip, Call, FakePlayer};
use radiobar_daemon::controller::PlaybackState;
use radiobar_daemon::lifecycle::LifecycleCoordinator;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn double_sleep_pauses_once() {
    let player = FakePlayer::new();
    let ctrl = controller(&player);
    let lifecycle = LifecycleCoordinator::new(ctrl.clone(), CancellationToken::new());

    ctrl.play("FIP").await.unwrap();
    player.clear_calls();

    assert!(lifecycle.sleep().await);
    // Even if something resumed in between, a second sleep without wake is ignored.
    ctrl.resume().await.unwrap();
    player.clear_calls();
    assert!(!lifecycle.sleep().await);

    assert_eq!(ctrl.current_state().await, PlaybackState::Playing(fip()));
    assert!(player.calls().is_empty());
}

#[tokio::test]
async fn sleep_while_idle_only_clears_flag() {
    let player = FakePlayer::new();
    let ctrl = controller(&player);
    let lifecycle = LifecycleCoordinator::new(ctrl.clone(), CancellationToken::new());

    assert!(!lifecycle.sleep().await);
    assert!(!lifecycle.is_awake());
    assert!(player.calls().is_empty());
}

#[tokio::test]
async fn wake_rearms_without_resuming() {
    let player = FakePlayer::new();
    let ctrl = controller(&player);
    let lifecycle = LifecycleCoordinator::new(ctrl.clone(), CancellationToken::new());

    ctrl.play("FIP").await.unwrap();
    lifecycle.sleep().await;
    lifecycle.wake();

    assert!(lifecycle.is_awake());
    assert_eq!(ctrl.current_state().await, PlaybackState::Paused(fip()));

    ctrl.resume().await.unwrap();
    assert!(lifecycle.sleep().await);
    assert_eq!(ctrl.current_state().await, PlaybackState::Paused(fip()));
}

#[tokio::test]
async fn quit_stops_playback_and_releases_player() {
    let player = FakePlayer::new();
    let ctrl = controller(&player);
    let shutdown = CancellationToken::new();
    let lifecycle = LifecycleCoordinator::new(ctrl.clone(), shutdown.clone());

    ctrl.play("FIP").await.unwrap();
    player.clear_calls();
    lifecycle.quit().await;

    assert!(shutdown.is_cancelled());
    assert!(lifecycle.shutdown_token().is_cancelled());
    assert_eq!(ctrl.current_state().await, PlaybackState::Idle);
    assert_eq!(player.calls(), [Call::Stop, Call::Release]);
}
