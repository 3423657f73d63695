//! End-to-end control session lifecycle over an in-process transport.

use std::sync::Arc;
use std::time::Duration;

use mediaport::remote::element::MediaElement;
use mediaport::{
    channel_pair, ControllerError, FetchProxy, MediaController, MessagePort, PlayerSession,
    PortError, PortState, SimulatedPlayer,
};

fn video_player(duration: f64) -> Arc<dyn MediaElement> {
    Arc::new(SimulatedPlayer::video("https://example.com/clip.mp4").with_duration(duration))
}

#[tokio::test]
async fn full_session_lifecycle() {
    let (near, far) = channel_pair(16);
    let controller = MediaController::new(MessagePort::open(near));
    assert_eq!(controller.port().state(), PortState::Opening);

    let session = PlayerSession::attach(
        MessagePort::open(far),
        video_player(120.0),
        Arc::new(FetchProxy::new().unwrap()),
    )
    .await
    .unwrap();

    controller.ready_within(Duration::from_secs(1)).await.unwrap();
    assert_eq!(controller.port().state(), PortState::Ready);

    controller.play().await.unwrap();
    assert!(!controller.paused().await.unwrap());

    controller.seek(42.5).await.unwrap();
    assert_eq!(controller.current_time().await.unwrap(), 42.5);
    let marker = session.last_seek().await.unwrap();
    assert_eq!(marker.from, 0.0);

    let shot = controller.screenshot("image/png", None).await.unwrap();
    assert_eq!(shot.time, 42.5);
    assert!(!shot.data.is_empty());

    controller.close().await;
    session.port().closed().await;
    assert_eq!(controller.port().state(), PortState::Closed);
    assert!(matches!(
        controller.play().await,
        Err(ControllerError::Port(PortError::Closed))
    ));
}

#[tokio::test]
async fn concurrent_calls_share_one_port() {
    let (near, far) = channel_pair(16);
    let controller = MediaController::new(MessagePort::open(near));
    let _session = PlayerSession::attach(
        MessagePort::open(far),
        video_player(60.0),
        Arc::new(FetchProxy::new().unwrap()),
    )
    .await
    .unwrap();
    controller.ready_within(Duration::from_secs(1)).await.unwrap();

    let (duration, paused, src) = tokio::join!(
        controller.duration(),
        controller.paused(),
        controller.current_src(),
    );
    assert_eq!(duration.unwrap(), 60.0);
    assert!(paused.unwrap());
    assert_eq!(src.unwrap(), "https://example.com/clip.mp4");
}

#[tokio::test]
async fn ready_gate_times_out_when_player_never_attaches() {
    let (near, _far) = channel_pair(4);
    let controller = MediaController::new(MessagePort::open(near));
    let err = controller
        .ready_within(Duration::from_millis(30))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ControllerError::Port(PortError::ReadyTimeout)
    ));
}
