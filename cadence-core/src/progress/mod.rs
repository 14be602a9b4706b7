//! Per-lesson completion tracking.
//!
//! The completed-lesson set is the only state shared between components:
//! this tracker is its single writer, status derivation reads atomic
//! snapshots. Updates replace or extend the set under one lock guard, never
//! element-by-element visible mid-update.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::catalog::{
    CatalogClient, CatalogError, CompletionRecord, CourseId, LessonId, Purchase, PurchaseId,
    UserId,
};

/// Aggregate progress for the progress view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSummary {
    pub completed: usize,
    pub total: usize,
}

impl ProgressSummary {
    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        (self.completed as f32 / self.total as f32) * 100.0
    }
}

/// Records lesson completions durably and keeps the local completed-set
/// convergent with the remote record.
pub struct CompletionTracker {
    catalog: Arc<dyn CatalogClient>,
    purchase_id: PurchaseId,
    course_id: CourseId,
    user_id: UserId,
    completed: RwLock<HashSet<LessonId>>,
}

impl CompletionTracker {
    /// Creates a tracker seeded from the purchase's remote completed list.
    pub fn new(catalog: Arc<dyn CatalogClient>, purchase: &Purchase) -> Self {
        Self {
            catalog,
            purchase_id: purchase.id,
            course_id: purchase.course_id,
            user_id: purchase.user_id,
            completed: RwLock::new(purchase.completed_lesson_ids.iter().copied().collect()),
        }
    }

    /// Snapshot of the completed-set for status derivation.
    pub fn snapshot(&self) -> HashSet<LessonId> {
        self.completed.read().clone()
    }

    pub fn is_completed(&self, lesson_id: LessonId) -> bool {
        self.completed.read().contains(&lesson_id)
    }

    /// Marks a lesson completed. Returns whether the durable write succeeded.
    ///
    /// The local append is applied before the remote write resolves, so the
    /// view never regresses after a finished video and any status
    /// recomputation issued from the same event handler already observes it.
    /// Calling this for an already-completed lesson is a no-op.
    pub async fn mark_completed(&self, lesson_id: LessonId, duration_watched_minutes: u32) -> bool {
        let newly_completed = self.completed.write().insert(lesson_id);
        if !newly_completed {
            debug!(%lesson_id, "completion already recorded, skipping write");
            return true;
        }

        let record = CompletionRecord {
            lesson_id,
            course_id: self.course_id,
            purchase_id: self.purchase_id,
            duration_watched_minutes,
        };

        match self.catalog.record_completion(&record).await {
            Ok(()) => {
                debug!(%lesson_id, "completion recorded");
                true
            }
            Err(error) => {
                // The optimistic local append stands; drift is bounded by
                // the next reconcile pass.
                warn!(%lesson_id, %error, "completion write failed, keeping local state");
                false
            }
        }
    }

    /// Replaces local state from a freshly loaded purchase record.
    ///
    /// The remote list is the source of truth on (re)load.
    pub fn replace_from_remote(&self, purchase: &Purchase) {
        let remote: HashSet<LessonId> = purchase.completed_lesson_ids.iter().copied().collect();
        *self.completed.write() = remote;
    }

    /// Refetches the purchase and merges its completed list into local state.
    ///
    /// Remote entries are authoritative; optimistic local entries whose
    /// durable write failed are retained so a finished video never flips
    /// back mid-session. The merged set replaces the old one atomically.
    ///
    /// # Errors
    ///
    /// - `CatalogError::PurchaseNotFound` - purchase vanished remotely
    /// - `CatalogError::Http` / `CatalogError::UnexpectedStatus` - fetch failed
    pub async fn reconcile(&self) -> Result<(), CatalogError> {
        let purchases = self.catalog.fetch_purchases(self.user_id).await?;
        let purchase = purchases
            .iter()
            .find(|purchase| purchase.id == self.purchase_id)
            .ok_or(CatalogError::PurchaseNotFound {
                purchase_id: self.purchase_id,
            })?;

        let mut merged: HashSet<LessonId> =
            purchase.completed_lesson_ids.iter().copied().collect();
        {
            let mut completed = self.completed.write();
            merged.extend(completed.iter().copied());
            *completed = merged;
        }

        debug!(purchase_id = %self.purchase_id, "completed-set reconciled with remote");
        Ok(())
    }

    /// Aggregate progress over a course of `total` lessons.
    pub fn summary(&self, total: usize) -> ProgressSummary {
        ProgressSummary {
            completed: self.completed.read().len().min(total),
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::catalog::InMemoryCatalog;

    fn purchase() -> Purchase {
        Purchase {
            id: PurchaseId::new(Uuid::from_u128(10)),
            user_id: UserId::new(Uuid::from_u128(1)),
            course_id: CourseId::new(Uuid::from_u128(2)),
            start_date: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap(),
            completed_lesson_ids: Vec::new(),
            is_active: true,
        }
    }

    fn tracker_with_catalog() -> (Arc<InMemoryCatalog>, CompletionTracker) {
        let catalog = Arc::new(InMemoryCatalog::new());
        let purchase = purchase();
        catalog.insert_purchase(purchase.clone());
        let tracker = CompletionTracker::new(catalog.clone(), &purchase);
        (catalog, tracker)
    }

    #[tokio::test]
    async fn test_mark_completed_is_idempotent() {
        let (catalog, tracker) = tracker_with_catalog();
        let lesson = LessonId::new(Uuid::from_u128(5));

        assert!(tracker.mark_completed(lesson, 20).await);
        assert!(tracker.mark_completed(lesson, 20).await);

        assert_eq!(tracker.snapshot().len(), 1);
        // The duplicate call never reached the catalog.
        assert_eq!(catalog.recorded_completions().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_optimistic_state() {
        let (catalog, tracker) = tracker_with_catalog();
        let lesson = LessonId::new(Uuid::from_u128(5));
        catalog.fail_completion_writes(true);

        let durable = tracker.mark_completed(lesson, 20).await;

        assert!(!durable);
        assert!(tracker.is_completed(lesson));
    }

    #[tokio::test]
    async fn test_reconcile_merges_remote_and_optimistic() {
        let (catalog, tracker) = tracker_with_catalog();
        let acked = LessonId::new(Uuid::from_u128(5));
        let orphaned = LessonId::new(Uuid::from_u128(6));

        assert!(tracker.mark_completed(acked, 20).await);
        catalog.fail_completion_writes(true);
        assert!(!tracker.mark_completed(orphaned, 20).await);

        tracker.reconcile().await.unwrap();

        assert!(tracker.is_completed(acked));
        assert!(tracker.is_completed(orphaned));
    }

    #[tokio::test]
    async fn test_reconcile_picks_up_remote_completions() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let mut purchase = purchase();
        catalog.insert_purchase(purchase.clone());
        let tracker = CompletionTracker::new(catalog.clone(), &purchase);

        // Another device completes a lesson; our record is stale.
        let remote_lesson = LessonId::new(Uuid::from_u128(9));
        catalog
            .record_completion(&CompletionRecord {
                lesson_id: remote_lesson,
                course_id: purchase.course_id,
                purchase_id: purchase.id,
                duration_watched_minutes: 12,
            })
            .await
            .unwrap();
        purchase.completed_lesson_ids.push(remote_lesson);

        assert!(!tracker.is_completed(remote_lesson));
        tracker.reconcile().await.unwrap();
        assert!(tracker.is_completed(remote_lesson));
    }

    #[tokio::test]
    async fn test_replace_from_remote_is_authoritative() {
        let (_catalog, tracker) = tracker_with_catalog();
        let local_only = LessonId::new(Uuid::from_u128(7));
        tracker.mark_completed(local_only, 20).await;

        let mut reloaded = purchase();
        reloaded.completed_lesson_ids = vec![LessonId::new(Uuid::from_u128(8))];
        tracker.replace_from_remote(&reloaded);

        assert!(!tracker.is_completed(local_only));
        assert!(tracker.is_completed(LessonId::new(Uuid::from_u128(8))));
    }

    #[test]
    fn test_summary_percent() {
        let summary = ProgressSummary {
            completed: 2,
            total: 5,
        };
        assert!((summary.percent() - 40.0).abs() < f32::EPSILON);

        let empty = ProgressSummary {
            completed: 0,
            total: 0,
        };
        assert_eq!(empty.percent(), 0.0);
    }
}
