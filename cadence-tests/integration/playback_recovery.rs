//! Stream error classification and recovery through the whole viewer.

use cadence_core::playback::{EngineEvent, PlaybackEvent, StreamErrorKind};
use cadence_core::schedule::LessonStatus;
use cadence_core::viewer::{EntryMode, ViewerStage};

use crate::support::{date, platform, viewer};

fn error(kind: StreamErrorKind) -> EngineEvent {
    EngineEvent::Error {
        kind,
        detail: format!("scripted {kind}"),
    }
}

#[tokio::test]
async fn transient_noise_never_reaches_the_viewer() {
    let platform = platform(date(2024, 1, 10), date(2024, 1, 10));
    platform.engines.set_script(vec![
        EngineEvent::LoadingStarted,
        error(StreamErrorKind::BufferStall),
        EngineEvent::Ready,
        error(StreamErrorKind::SeekOverHole),
        error(StreamErrorKind::FragmentTimeout),
        EngineEvent::Ended,
    ]);

    let mut viewer = viewer(&platform, EntryMode::QuickStart);
    viewer.load(platform.user_id).await.unwrap();

    let mut seen = Vec::new();
    while let Some(event) = viewer.pump_playback().await {
        let done = matches!(event, PlaybackEvent::Ended | PlaybackEvent::Fatal { .. });
        seen.push(event);
        if done {
            break;
        }
    }

    assert_eq!(
        seen,
        vec![
            PlaybackEvent::LoadingStarted,
            PlaybackEvent::Ready,
            PlaybackEvent::Ended,
        ]
    );
    assert_eq!(viewer.stage(), ViewerStage::Progress);
}

#[tokio::test]
async fn network_fatal_recovers_and_the_lesson_still_completes() {
    let platform = platform(date(2024, 1, 10), date(2024, 1, 10));
    platform.engines.set_script(vec![
        EngineEvent::LoadingStarted,
        error(StreamErrorKind::NetworkFatal),
        EngineEvent::Ended,
    ]);

    let mut viewer = viewer(&platform, EntryMode::QuickStart);
    viewer.load(platform.user_id).await.unwrap();

    // The bounded reload turns the fatal error into a Ready.
    assert_eq!(
        viewer.pump_playback().await,
        Some(PlaybackEvent::LoadingStarted)
    );
    assert_eq!(viewer.pump_playback().await, Some(PlaybackEvent::Ready));
    assert_eq!(viewer.pump_playback().await, Some(PlaybackEvent::Ended));

    assert_eq!(viewer.status_list()[0], LessonStatus::Completed);
}

#[tokio::test]
async fn exhausted_recovery_shows_terminal_state_with_a_way_back() {
    let platform = platform(date(2024, 1, 10), date(2024, 1, 10));
    platform.engines.set_script(vec![error(StreamErrorKind::MediaFatal)]);
    platform.engines.set_fail_recovery(true);

    let mut viewer = viewer(&platform, EntryMode::QuickStart);
    viewer.load(platform.user_id).await.unwrap();

    let event = viewer.pump_playback().await;
    assert!(matches!(event, Some(PlaybackEvent::Fatal { .. })));

    // Terminal for this attempt, but not a dead end: the sequence landed
    // on progress, the engine is gone and the lesson stays selectable.
    assert_eq!(viewer.stage(), ViewerStage::Progress);
    assert_eq!(platform.engines.live_engines(), 0);
    assert_eq!(viewer.status_list()[0], LessonStatus::Available);

    platform.engines.set_fail_recovery(false);
    platform.engines.set_script(vec![EngineEvent::Ready, EngineEvent::Ended]);
    assert!(viewer.select_lesson(0).await);

    assert_eq!(viewer.pump_playback().await, Some(PlaybackEvent::Ready));
    assert_eq!(viewer.pump_playback().await, Some(PlaybackEvent::Ended));
    assert_eq!(viewer.status_list()[0], LessonStatus::Completed);
}
