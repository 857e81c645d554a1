//! Day-boundary streak policy
//!
//! Days are UTC calendar dates. Several reports on one day count once; a
//! missed day resets the streak to 1. A report dated before the previous one
//! (clock skew) is streak-neutral.

use chrono::{DateTime, Utc};

use crate::time::utc_day;

/// Streak after a report at `now`, given the streak and timestamp of the
/// previous report
pub fn next_streak(
    streak_days: u32,
    last_report_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> u32 {
    let Some(last) = last_report_at else {
        return 1;
    };

    let day_diff = (utc_day(now) - utc_day(last)).num_days();
    match day_diff {
        d if d <= 0 => streak_days,
        1 => streak_days.saturating_add(1),
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_first_report_starts_streak() {
        assert_eq!(next_streak(0, None, at(1, 9)), 1);
    }

    #[test]
    fn test_same_day_is_neutral() {
        assert_eq!(next_streak(3, Some(at(10, 0)), at(10, 23)), 3);
    }

    #[test]
    fn test_next_day_extends() {
        assert_eq!(next_streak(3, Some(at(10, 23)), at(11, 0)), 4);
    }

    #[test]
    fn test_gap_resets() {
        assert_eq!(next_streak(9, Some(at(10, 12)), at(12, 12)), 1);
        assert_eq!(next_streak(9, Some(at(1, 12)), at(20, 12)), 1);
    }

    #[test]
    fn test_clock_skew_is_neutral() {
        assert_eq!(next_streak(5, Some(at(12, 8)), at(11, 8)), 5);
    }

    #[test]
    fn test_day_boundary_uses_calendar_not_elapsed_hours() {
        // 2 minutes apart but across midnight: next day
        let before = Utc.with_ymd_and_hms(2024, 5, 10, 23, 59, 0).unwrap();
        assert_eq!(next_streak(1, Some(before), before + Duration::minutes(2)), 2);

        // 47 hours apart but still on the next date: extends
        let early = Utc.with_ymd_and_hms(2024, 5, 10, 0, 30, 0).unwrap();
        assert_eq!(next_streak(4, Some(early), early + Duration::hours(47)), 5);

        // 25 hours apart landing two dates later: reset
        let late = Utc.with_ymd_and_hms(2024, 5, 10, 23, 30, 0).unwrap();
        assert_eq!(next_streak(4, Some(late), late + Duration::hours(25)), 1);
    }

    #[test]
    fn test_streak_saturates() {
        assert_eq!(next_streak(u32::MAX, Some(at(1, 0)), at(2, 0)), u32::MAX);
    }
}
