//! Catalog records for purchases, courses and lessons.
//!
//! These are the read-side records the platform API serves. Lessons are
//! immutable once fetched for a session; their order is authoritative for
//! drip-day mapping (position 0 unlocks on day 0).

pub mod client;
pub mod memory;
pub mod resolver;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use client::{CatalogClient, CatalogError, CompletionRecord, HttpCatalogClient};
pub use memory::InMemoryCatalog;
pub use resolver::effective_purchase;

/// Identifies a purchase of a course by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseId(Uuid);

/// Identifies a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(Uuid);

/// Identifies a lesson within a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LessonId(Uuid);

/// Identifies a platform user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

macro_rules! id_impls {
    ($($name:ident),+) => {
        $(
            impl $name {
                /// Wraps an existing uuid.
                pub fn new(id: Uuid) -> Self {
                    Self(id)
                }

                /// Generates a fresh random id.
                pub fn generate() -> Self {
                    Self(Uuid::new_v4())
                }

                /// Returns the underlying uuid.
                pub fn as_uuid(&self) -> Uuid {
                    self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    self.0.fmt(f)
                }
            }
        )+
    };
}

id_impls!(PurchaseId, CourseId, LessonId, UserId);

/// A single lesson of a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub duration_minutes: u32,
    /// Opaque playback reference: a bare stream id, a full player URL, or a
    /// manifest-suffixed path. Normalized by the playback module.
    #[serde(default)]
    pub video_reference: Option<String>,
    #[serde(default)]
    pub preview_image: Option<String>,
    /// Ascending ordering key; unique but gap-tolerant.
    pub lesson_order: u32,
}

/// A course with its ordered lesson sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub lessons: Vec<Lesson>,
}

impl Course {
    /// Sorts lessons by their ordering key. Called once after decoding;
    /// every position-based computation assumes this order.
    pub fn sort_lessons(&mut self) {
        self.lessons.sort_by_key(|lesson| lesson.lesson_order);
    }

    pub fn lesson_count(&self) -> usize {
        self.lessons.len()
    }

    pub fn lesson_at(&self, position: usize) -> Option<&Lesson> {
        self.lessons.get(position)
    }

    /// Position of a lesson in drip order.
    pub fn position_of(&self, lesson_id: LessonId) -> Option<usize> {
        self.lessons.iter().position(|lesson| lesson.id == lesson_id)
    }
}

/// A user's purchase of a course.
///
/// `completed_lesson_ids` grows monotonically on the wire; locally it seeds
/// the completion tracker's set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: PurchaseId,
    pub user_id: UserId,
    pub course_id: CourseId,
    /// Drip anchor date; may be set after checkout via a separate flow.
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_lesson_ids: Vec<LessonId>,
    pub is_active: bool,
}

impl Purchase {
    /// Anchor timestamp for drip scheduling.
    ///
    /// A purchase without an explicit start date falls back to its creation
    /// timestamp; both paths go through the same calendar-date truncation
    /// in the scheduler.
    pub fn effective_start(&self) -> DateTime<Utc> {
        self.start_date.unwrap_or(self.created_at)
    }
}
