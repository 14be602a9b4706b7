//! Time source abstraction for schedule computation.
//!
//! Drip day math reads "today" once per render pass through an injected
//! clock, so scheduling stays deterministic under test without patching
//! the system clock.

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use parking_lot::Mutex;

/// Source of the current time for all schedule and reconcile decisions.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Current calendar date in the viewer's local timezone.
    fn today(&self) -> NaiveDate {
        local_calendar_date(self.now_utc())
    }
}

/// Normalizes a timestamp to the local calendar date, stripping time-of-day.
///
/// All day-difference math operates on local calendar dates rather than UTC
/// offsets, so a lesson never unlocks a day early or late for viewers near
/// midnight in another zone.
pub fn local_calendar_date(instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&Local).date_naive()
}

/// Wall-clock implementation backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Controllable clock for tests and headless demo runs.
///
/// Time can only move forward, mirroring the wall clock it stands in for.
/// The calendar date is pinned explicitly rather than derived from the
/// host timezone, so assertions hold on any machine.
#[derive(Debug)]
pub struct FixedClock {
    state: Mutex<FixedClockState>,
}

#[derive(Debug, Clone, Copy)]
struct FixedClockState {
    now: DateTime<Utc>,
    today: NaiveDate,
}

impl FixedClock {
    /// Creates a clock pinned to noon UTC of the given calendar date.
    pub fn at(today: NaiveDate) -> Self {
        let now = today
            .and_hms_opt(12, 0, 0)
            .expect("noon is always a valid time")
            .and_utc();
        Self {
            state: Mutex::new(FixedClockState { now, today }),
        }
    }

    /// Advances the clock by a duration without changing the pinned date.
    ///
    /// # Panics
    ///
    /// Panics if the duration is negative; the clock never moves backwards.
    pub fn advance(&self, duration: Duration) {
        assert!(
            duration >= Duration::zero(),
            "clock cannot move backwards"
        );
        let mut state = self.state.lock();
        state.now = state.now + duration;
    }

    /// Advances both the instant and the pinned calendar date by whole days.
    pub fn advance_days(&self, days: u32) {
        let mut state = self.state.lock();
        state.now = state.now + Duration::days(i64::from(days));
        state.today = state.today + Duration::days(i64::from(days));
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.state.lock().now
    }

    fn today(&self) -> NaiveDate {
        self.state.lock().today
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_fixed_clock_pins_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let clock = FixedClock::at(date);

        assert_eq!(clock.today(), date);
        assert_eq!(clock.now_utc().date_naive(), date);
    }

    #[test]
    fn test_fixed_clock_advances_days() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let clock = FixedClock::at(date);

        clock.advance_days(3);

        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 1, 13).unwrap());
    }

    #[test]
    #[should_panic(expected = "clock cannot move backwards")]
    fn test_fixed_clock_rejects_negative_advance() {
        let clock = FixedClock::at(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        clock.advance(Duration::seconds(-1));
    }

    #[test]
    fn test_local_calendar_date_strips_time_of_day() {
        // 23:50 local stays on the same local calendar day regardless of
        // what UTC offset the host is running under.
        let late_evening = Local
            .with_ymd_and_hms(2024, 2, 1, 23, 50, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(
            local_calendar_date(late_evening),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
    }
}
