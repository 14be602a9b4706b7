//! In-memory catalog for tests and headless demo runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::client::{CatalogClient, CatalogError, CompletionRecord};
use super::{Course, CourseId, Purchase, UserId};

/// Catalog backed by process memory instead of the platform API.
///
/// Completion writes are applied to the stored purchase record, so a
/// subsequent `fetch_purchases` observes them the way the real store would.
/// Writes can be scripted to fail for recovery tests.
#[derive(Default)]
pub struct InMemoryCatalog {
    purchases: RwLock<Vec<Purchase>>,
    courses: RwLock<HashMap<CourseId, Course>>,
    recorded: RwLock<Vec<CompletionRecord>>,
    fail_completion_writes: AtomicBool,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_purchase(&self, purchase: Purchase) {
        self.purchases.write().push(purchase);
    }

    pub fn insert_course(&self, course: Course) {
        let mut course = course;
        course.sort_lessons();
        self.courses.write().insert(course.id, course);
    }

    /// Makes every subsequent completion write fail with a server error.
    pub fn fail_completion_writes(&self, fail: bool) {
        self.fail_completion_writes.store(fail, Ordering::SeqCst);
    }

    /// Completion writes received so far, in arrival order.
    pub fn recorded_completions(&self) -> Vec<CompletionRecord> {
        self.recorded.read().clone()
    }
}

#[async_trait]
impl CatalogClient for InMemoryCatalog {
    async fn fetch_purchases(&self, user_id: UserId) -> Result<Vec<Purchase>, CatalogError> {
        Ok(self
            .purchases
            .read()
            .iter()
            .filter(|purchase| purchase.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn fetch_course(&self, course_id: CourseId) -> Result<Course, CatalogError> {
        self.courses
            .read()
            .get(&course_id)
            .cloned()
            .ok_or(CatalogError::CourseNotFound { course_id })
    }

    async fn record_completion(&self, record: &CompletionRecord) -> Result<(), CatalogError> {
        if self.fail_completion_writes.load(Ordering::SeqCst) {
            return Err(CatalogError::UnexpectedStatus {
                status: 503,
                endpoint: format!("lessons/{}/completions", record.lesson_id),
            });
        }

        self.recorded.write().push(record.clone());

        let mut purchases = self.purchases.write();
        if let Some(purchase) = purchases
            .iter_mut()
            .find(|purchase| purchase.id == record.purchase_id)
        {
            if !purchase.completed_lesson_ids.contains(&record.lesson_id) {
                purchase.completed_lesson_ids.push(record.lesson_id);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono::Utc;
    use uuid::Uuid;

    use super::super::{Lesson, LessonId, PurchaseId};
    use super::*;

    fn sample_purchase(user_id: UserId) -> Purchase {
        Purchase {
            id: PurchaseId::new(Uuid::from_u128(10)),
            user_id,
            course_id: CourseId::new(Uuid::from_u128(20)),
            start_date: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap(),
            completed_lesson_ids: Vec::new(),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_fetch_purchases_filters_by_user() {
        let catalog = InMemoryCatalog::new();
        let user = UserId::new(Uuid::from_u128(1));
        let other = UserId::new(Uuid::from_u128(2));
        catalog.insert_purchase(sample_purchase(user));
        catalog.insert_purchase(Purchase {
            id: PurchaseId::generate(),
            ..sample_purchase(other)
        });

        let purchases = catalog.fetch_purchases(user).await.unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].user_id, user);
    }

    #[tokio::test]
    async fn test_completion_write_lands_on_purchase() {
        let catalog = InMemoryCatalog::new();
        let user = UserId::new(Uuid::from_u128(1));
        let purchase = sample_purchase(user);
        let record = CompletionRecord {
            lesson_id: LessonId::new(Uuid::from_u128(99)),
            course_id: purchase.course_id,
            purchase_id: purchase.id,
            duration_watched_minutes: 15,
        };
        catalog.insert_purchase(purchase);

        catalog.record_completion(&record).await.unwrap();
        catalog.record_completion(&record).await.unwrap();

        let purchases = catalog.fetch_purchases(user).await.unwrap();
        assert_eq!(purchases[0].completed_lesson_ids, vec![record.lesson_id]);
        assert_eq!(catalog.recorded_completions().len(), 2);
    }

    #[tokio::test]
    async fn test_scripted_write_failure() {
        let catalog = InMemoryCatalog::new();
        let purchase = sample_purchase(UserId::new(Uuid::from_u128(1)));
        let record = CompletionRecord {
            lesson_id: LessonId::generate(),
            course_id: purchase.course_id,
            purchase_id: purchase.id,
            duration_watched_minutes: 5,
        };
        catalog.insert_purchase(purchase);
        catalog.fail_completion_writes(true);

        let result = catalog.record_completion(&record).await;
        assert!(matches!(
            result,
            Err(CatalogError::UnexpectedStatus { status: 503, .. })
        ));
        assert!(catalog.recorded_completions().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_course_sorts_lessons() {
        let catalog = InMemoryCatalog::new();
        let course_id = CourseId::new(Uuid::from_u128(20));
        catalog.insert_course(Course {
            id: course_id,
            title: "Strength Basics".to_string(),
            lessons: vec![
                Lesson {
                    id: LessonId::new(Uuid::from_u128(2)),
                    title: "Second".to_string(),
                    description: String::new(),
                    duration_minutes: 10,
                    video_reference: None,
                    preview_image: None,
                    lesson_order: 20,
                },
                Lesson {
                    id: LessonId::new(Uuid::from_u128(1)),
                    title: "First".to_string(),
                    description: String::new(),
                    duration_minutes: 10,
                    video_reference: None,
                    preview_image: None,
                    lesson_order: 10,
                },
            ],
        });

        let course = catalog.fetch_course(course_id).await.unwrap();
        assert_eq!(course.lessons[0].title, "First");
    }
}
