//! Drip schedule computation.
//!
//! Pure calendar-day math deciding which lesson of a purchased course is
//! unlockable today, and the derived status of every lesson. Nothing here
//! performs I/O or reads the system clock; callers pass dates taken from an
//! injected [`Clock`](crate::clock::Clock) once per render pass.
//!
//! Two functions share the same inputs on purpose: the initially-selected
//! lesson always comes from [`available_lesson_index`]; [`course_status_list`]
//! is only for list rendering and click gating. Deriving the selection by
//! scanning the rendered list diverges for one tick around day rollover.

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;

use crate::catalog::{Lesson, LessonId, Purchase};
use crate::clock::local_calendar_date;

/// Derived, never persisted status of a lesson. Recomputed from the current
/// date on every pass, so it is inherently time-varying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonStatus {
    Locked,
    Available,
    Completed,
}

impl LessonStatus {
    pub fn is_locked(&self) -> bool {
        matches!(self, LessonStatus::Locked)
    }

    pub fn is_available(&self) -> bool {
        matches!(self, LessonStatus::Available)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, LessonStatus::Completed)
    }
}

impl fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LessonStatus::Locked => write!(f, "locked"),
            LessonStatus::Available => write!(f, "available"),
            LessonStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Local calendar date the purchase's drip schedule is anchored to.
///
/// Falls back to the purchase creation timestamp when no explicit start date
/// was set; both paths share the same time-of-day truncation.
pub fn purchase_start_date(purchase: &Purchase) -> NaiveDate {
    local_calendar_date(purchase.effective_start())
}

/// Whole days elapsed between the start date and today.
///
/// The explicit same-calendar-day check pins the result to zero whenever the
/// two normalized dates are identical, independent of any partial-day
/// arithmetic upstream.
pub fn days_since_start(start: NaiveDate, today: NaiveDate) -> i64 {
    if today == start {
        return 0;
    }
    (today - start).num_days()
}

/// Index of the lesson that is unlockable today, or `None` when the course
/// has not started yet or has no lessons.
///
/// Lesson 0 unlocks the same day the purchase starts (day offset 0). The
/// index clamps to the last lesson: a viewer who started long ago sees the
/// final lesson as "today's", never something out of bounds.
pub fn available_lesson_index(
    start: NaiveDate,
    today: NaiveDate,
    lesson_count: usize,
) -> Option<usize> {
    if lesson_count == 0 {
        return None;
    }

    let days = days_since_start(start, today);
    if days < 0 {
        return None;
    }

    Some((days as usize).min(lesson_count - 1))
}

/// Status of the lesson at `position`, given today's day offset and the
/// completed-lesson set.
///
/// Explicit completion always wins. A lesson whose scheduled day has already
/// passed is treated as consumed even if never explicitly finished, so the
/// list never shows a "missed" state. Completion is never un-set by
/// recomputation.
pub fn lesson_status(
    position: usize,
    days_diff: i64,
    lesson_id: LessonId,
    completed: &HashSet<LessonId>,
) -> LessonStatus {
    if completed.contains(&lesson_id) {
        return LessonStatus::Completed;
    }

    let position = position as i64;
    if position < days_diff {
        LessonStatus::Completed
    } else if position == days_diff {
        LessonStatus::Available
    } else {
        LessonStatus::Locked
    }
}

/// Per-lesson statuses for list rendering and click gating.
///
/// The initially-selected lesson must come from [`available_lesson_index`],
/// not from scanning this list.
pub fn course_status_list(
    days_diff: i64,
    lessons: &[Lesson],
    completed: &HashSet<LessonId>,
) -> Vec<LessonStatus> {
    lessons
        .iter()
        .enumerate()
        .map(|(position, lesson)| lesson_status(position, days_diff, lesson.id, completed))
        .collect()
}
