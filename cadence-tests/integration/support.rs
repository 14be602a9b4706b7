//! Shared fixtures for integration tests.

use std::sync::Arc;

use cadence_core::catalog::{
    Course, CourseId, InMemoryCatalog, Lesson, LessonId, Purchase, PurchaseId, UserId,
};
use cadence_core::clock::FixedClock;
use cadence_core::config::CadenceConfig;
use cadence_core::playback::{PlaybackTarget, SimulationEngineFactory};
use cadence_core::viewer::{CourseViewer, EntryMode};
use chrono::{NaiveDate, TimeZone, Utc};
use uuid::Uuid;

pub const COURSE_LESSONS: u32 = 5;

pub struct Platform {
    pub catalog: Arc<InMemoryCatalog>,
    pub clock: Arc<FixedClock>,
    pub engines: Arc<SimulationEngineFactory>,
    pub user_id: UserId,
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn lesson_id(day: u32) -> LessonId {
    LessonId::new(Uuid::from_u128(100 + u128::from(day)))
}

/// Catalog with one five-lesson course purchased on `start`, evaluated
/// on `today`.
pub fn platform(start: NaiveDate, today: NaiveDate) -> Platform {
    let catalog = Arc::new(InMemoryCatalog::new());
    let user_id = UserId::new(Uuid::from_u128(1));
    let course_id = CourseId::new(Uuid::from_u128(2));
    let purchase_id = PurchaseId::new(Uuid::from_u128(3));

    catalog.insert_course(Course {
        id: course_id,
        title: "Strength Basics".to_string(),
        lessons: (0..COURSE_LESSONS)
            .map(|day| Lesson {
                id: lesson_id(day),
                title: format!("Day {}", day + 1),
                description: String::new(),
                duration_minutes: 30,
                video_reference: Some(format!("sb-{day}")),
                preview_image: None,
                lesson_order: day,
            })
            .collect(),
    });

    // Local-time anchored so calendar normalization lands on `start` on
    // any host timezone.
    let started_at = chrono::Local
        .from_local_datetime(&start.and_hms_opt(9, 30, 0).unwrap())
        .single()
        .unwrap()
        .with_timezone(&Utc);

    catalog.insert_purchase(Purchase {
        id: purchase_id,
        user_id,
        course_id,
        start_date: Some(started_at),
        created_at: started_at,
        completed_lesson_ids: Vec::new(),
        is_active: true,
    });

    Platform {
        catalog,
        clock: Arc::new(FixedClock::at(today)),
        engines: Arc::new(SimulationEngineFactory::new()),
        user_id,
    }
}

pub fn viewer(platform: &Platform, entry: EntryMode) -> CourseViewer {
    CourseViewer::new(
        platform.catalog.clone(),
        platform.clock.clone(),
        platform.engines.clone(),
        PlaybackTarget::native(),
        CadenceConfig::for_testing(),
        entry,
    )
}
