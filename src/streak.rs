//! Habit derived views
//!
//! Pure reads over materialized habit logs. Days are calendar dates; the
//! backward walk steps with `NaiveDate::pred_opt`, so DST shifts cannot skip
//! or repeat a day.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::domain::HabitLog;

/// Longest streak the backward walk will count
pub const DEFAULT_LOOKBACK_DAYS: u32 = 365;

/// True iff `habit_id` has a log dated `today`
pub fn is_done_today(logs: &[HabitLog], habit_id: &str, today: NaiveDate) -> bool {
    logs.iter().any(|log| log.is_for(habit_id, today))
}

/// Consecutive logged days ending at `today`, at most `lookback`.
///
/// A habit not logged today has a streak of 0, even if yesterday was logged.
pub fn streak(logs: &[HabitLog], habit_id: &str, today: NaiveDate, lookback: u32) -> u32 {
    let days: HashSet<NaiveDate> = logs
        .iter()
        .filter(|log| log.habit_id == habit_id)
        .map(|log| log.log_date)
        .collect();

    let mut count = 0;
    let mut day = today;
    while count < lookback && days.contains(&day) {
        count += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn log(habit_id: &str, date: NaiveDate) -> HabitLog {
        HabitLog {
            id: format!("{}-{}", habit_id, date),
            habit_id: habit_id.to_string(),
            log_date: date,
            user_id: None,
        }
    }

    fn back(today: NaiveDate, n: i64) -> NaiveDate {
        today - chrono::Duration::days(n)
    }

    #[test]
    fn test_streak_stops_at_first_gap() {
        let today = day(2026, 10, 19);
        let logs = vec![log("h", today), log("h", back(today, 1)), log("h", back(today, 3))];
        assert_eq!(streak(&logs, "h", today, DEFAULT_LOOKBACK_DAYS), 2);
    }

    #[test]
    fn test_done_today_ignores_yesterday() {
        let today = day(2026, 10, 19);
        let logs = vec![log("h", back(today, 1))];
        assert!(!is_done_today(&logs, "h", today));
        assert_eq!(streak(&logs, "h", today, DEFAULT_LOOKBACK_DAYS), 0);
    }

    #[test]
    fn test_streak_only_counts_matching_habit() {
        let today = day(2026, 10, 19);
        let logs = vec![log("h", today), log("other", back(today, 1)), log("h", back(today, 2))];
        assert_eq!(streak(&logs, "h", today, DEFAULT_LOOKBACK_DAYS), 1);
        assert!(is_done_today(&logs, "h", today));
        assert!(!is_done_today(&logs, "missing", today));
    }

    #[test]
    fn test_streak_capped_by_lookback() {
        let today = day(2026, 10, 19);
        let logs: Vec<_> = (0..400).map(|n| log("h", back(today, n))).collect();
        assert_eq!(streak(&logs, "h", today, DEFAULT_LOOKBACK_DAYS), 365);
        assert_eq!(streak(&logs, "h", today, 7), 7);
    }

    #[test]
    fn test_streak_crosses_dst_and_month_boundaries() {
        // Spans the end of DST in Europe and the US and a month change
        let today = day(2026, 11, 3);
        let logs: Vec<_> = (0..10).map(|n| log("h", back(today, n))).collect();
        assert_eq!(streak(&logs, "h", today, DEFAULT_LOOKBACK_DAYS), 10);
    }

    #[test]
    fn test_duplicate_logs_count_once() {
        let today = day(2026, 10, 19);
        let logs = vec![log("h", today), log("h", today)];
        assert_eq!(streak(&logs, "h", today, DEFAULT_LOOKBACK_DAYS), 1);
    }
}
