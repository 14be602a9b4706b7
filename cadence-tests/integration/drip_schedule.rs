//! Multi-day drip progression driven through the viewer.

use cadence_core::schedule::LessonStatus;
use cadence_core::viewer::{EntryMode, LoadOutcome};

use crate::support::{date, platform, viewer};

#[tokio::test]
async fn schedule_advances_one_lesson_per_day() {
    let platform = platform(date(2024, 1, 10), date(2024, 1, 10));
    let mut viewer = viewer(&platform, EntryMode::Standard);
    viewer.load(platform.user_id).await.unwrap();

    assert_eq!(viewer.available_index(), Some(0));

    for day in 1..=3u32 {
        platform.clock.advance_days(1);
        assert_eq!(viewer.available_index(), Some(day as usize));
    }

    // Far past the course end the last lesson stays "today's".
    platform.clock.advance_days(365);
    assert_eq!(viewer.available_index(), Some(4));
}

#[tokio::test]
async fn statuses_recompute_across_day_rollover_without_reload() {
    let platform = platform(date(2024, 1, 10), date(2024, 1, 10));
    let mut viewer = viewer(&platform, EntryMode::Standard);
    viewer.load(platform.user_id).await.unwrap();

    assert_eq!(viewer.status_list()[0], LessonStatus::Available);
    assert_eq!(viewer.status_list()[1], LessonStatus::Locked);

    platform.clock.advance_days(1);

    // No reload happened; the derivation is pure over the injected clock.
    assert_eq!(viewer.status_list()[0], LessonStatus::Completed);
    assert_eq!(viewer.status_list()[1], LessonStatus::Available);
}

#[tokio::test]
async fn purchase_not_started_yet_locks_the_course() {
    let platform = platform(date(2024, 3, 1), date(2024, 2, 20));
    let mut viewer = viewer(&platform, EntryMode::Standard);

    let outcome = viewer.load(platform.user_id).await.unwrap();

    assert_eq!(outcome, LoadOutcome::Ready { selected: None });
    assert!(
        viewer
            .status_list()
            .iter()
            .all(|status| status.is_locked())
    );
    assert!(viewer.selected_lesson().is_none());
}
