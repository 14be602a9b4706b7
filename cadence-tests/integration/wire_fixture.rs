//! Decoding platform wire records and driving the viewer from them.

use std::sync::Arc;

use cadence_core::catalog::{Course, InMemoryCatalog, Purchase};
use cadence_core::clock::FixedClock;
use cadence_core::config::CadenceConfig;
use cadence_core::playback::{PlaybackTarget, SimulationEngineFactory};
use cadence_core::viewer::{CourseViewer, EntryMode, LoadOutcome};

use crate::support::date;

const PURCHASE_JSON: &str = r#"{
    "id": "7f4df8f0-5d21-4dcb-a2a3-68c80181d1bb",
    "userId": "0a0a8f60-ddcd-4b80-bb3f-3ac19f8d9cbc",
    "courseId": "41b6d44a-0572-47cc-9bb5-6706b1d2c3a5",
    "startDate": "2024-01-10T06:00:00Z",
    "createdAt": "2024-01-08T15:30:00Z",
    "completedLessonIds": ["9bfe5e9f-12a4-4c8e-aef1-6c1b8f7f0001"],
    "isActive": true
}"#;

const COURSE_JSON: &str = r#"{
    "id": "41b6d44a-0572-47cc-9bb5-6706b1d2c3a5",
    "title": "Foundations",
    "lessons": [
        {
            "id": "9bfe5e9f-12a4-4c8e-aef1-6c1b8f7f0002",
            "title": "Bracing",
            "durationMinutes": 18,
            "videoReference": "https://stream.example.com/player/brace01.m3u8?v=2",
            "lessonOrder": 2
        },
        {
            "id": "9bfe5e9f-12a4-4c8e-aef1-6c1b8f7f0001",
            "title": "Breathing",
            "description": "Diaphragmatic basics",
            "durationMinutes": 12,
            "videoReference": "breathe01",
            "lessonOrder": 1
        }
    ]
}"#;

#[tokio::test]
async fn wire_records_drive_the_viewer() {
    let purchase: Purchase = serde_json::from_str(PURCHASE_JSON).unwrap();
    let course: Course = serde_json::from_str(COURSE_JSON).unwrap();
    let user_id = purchase.user_id;

    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.insert_purchase(purchase);
    catalog.insert_course(course);

    let mut viewer = CourseViewer::new(
        catalog,
        // Start date is 06:00Z on Jan 10; the pinned date keeps the
        // assertion timezone-independent as long as offsets stay within
        // a calendar day of UTC.
        Arc::new(FixedClock::at(date(2024, 1, 11))),
        Arc::new(SimulationEngineFactory::new()),
        PlaybackTarget::native(),
        CadenceConfig::for_testing(),
        EntryMode::Standard,
    );

    let outcome = viewer.load(user_id).await.unwrap();

    let LoadOutcome::Ready { selected } = outcome else {
        panic!("expected a loaded course");
    };
    let course = viewer.course().unwrap();

    // lessonOrder sorted the wire payload: Breathing first.
    assert_eq!(course.lessons[0].title, "Breathing");
    assert_eq!(course.lessons[1].title, "Bracing");
    // The explicitly completed lesson came from the purchase record.
    assert!(viewer.status_list()[0].is_completed());
    // One day in, clamped to the two-lesson course.
    assert_eq!(selected, Some(1));
    assert_eq!(selected, viewer.available_index());
}
