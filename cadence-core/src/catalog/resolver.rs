//! Effective purchase resolution.

use tracing::debug;

use super::Purchase;

/// Returns the single purchase that drives drip scheduling.
///
/// A user may hold several purchase records (renewals, refunds, inactive
/// plans); scheduling only ever follows the first active one. `None` means
/// nothing is unlockable.
pub fn effective_purchase(purchases: &[Purchase]) -> Option<&Purchase> {
    let effective = purchases.iter().find(|purchase| purchase.is_active);

    match effective {
        Some(purchase) => debug!(purchase_id = %purchase.id, "resolved effective purchase"),
        None => debug!(candidates = purchases.len(), "no active purchase"),
    }

    effective
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::super::{CourseId, PurchaseId, UserId};
    use super::*;

    fn purchase(id: u128, is_active: bool) -> Purchase {
        Purchase {
            id: PurchaseId::new(Uuid::from_u128(id)),
            user_id: UserId::new(Uuid::from_u128(1)),
            course_id: CourseId::new(Uuid::from_u128(2)),
            start_date: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            completed_lesson_ids: Vec::new(),
            is_active,
        }
    }

    #[test]
    fn test_no_purchases_resolves_to_none() {
        assert!(effective_purchase(&[]).is_none());
    }

    #[test]
    fn test_inactive_purchases_are_skipped() {
        let purchases = vec![purchase(1, false), purchase(2, false)];
        assert!(effective_purchase(&purchases).is_none());
    }

    #[test]
    fn test_first_active_purchase_wins() {
        let purchases = vec![purchase(1, false), purchase(2, true), purchase(3, true)];

        let effective = effective_purchase(&purchases).unwrap();
        assert_eq!(effective.id, PurchaseId::new(Uuid::from_u128(2)));
    }
}
