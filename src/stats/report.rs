use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::models::daily_log::DailyLog;
use crate::stats::aggregate::{
    food_frequency, meal_breakdown, mood_frequency, symptom_frequency, FoodCategory,
    FrequencyEntry,
};

/// Source of "today" for week-offset resolution. Injected so report math
/// is deterministic under test.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Snapshot of one ISO week of diary activity. Derived on demand, never
/// persisted; a missing report means "not computed", not zero activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyReport {
    /// ISO week key, e.g. "2025-W23".
    pub week_key: String,
    pub start: NaiveDate,
    /// Exclusive.
    pub end: NaiveDate,
    pub total_days_logged: usize,
    pub total_trigger: u32,
    pub total_safe: u32,
    pub top_triggers: Vec<FrequencyEntry>,
    pub top_safe: Vec<FrequencyEntry>,
    pub top_symptoms: Vec<FrequencyEntry>,
    pub mood_frequency: Vec<FrequencyEntry>,
    pub meal_breakdown: BTreeMap<String, u32>,
    /// 0-100; weighted blend of safe ratio and logging coverage.
    pub score: u8,
}

/// `[start, end)` of the ISO-8601 week (Monday start) containing
/// `today + week_offset` weeks.
pub fn week_bounds(today: NaiveDate, week_offset: i64) -> (NaiveDate, NaiveDate) {
    let reference = today + Duration::weeks(week_offset);
    let start = reference - Duration::days(reference.weekday().num_days_from_monday() as i64);
    (start, start + Duration::days(7))
}

fn week_key(start: NaiveDate) -> String {
    let iso = start.iso_week();
    format!("{:04}-W{:02}", iso.year(), iso.week())
}

fn health_score(total_safe: u32, total_trigger: u32, days_logged: usize) -> u8 {
    let total = (total_safe + total_trigger).max(1);
    let safe_ratio = f64::from(total_safe) / f64::from(total);
    let days_factor = (days_logged as f64 / 7.0).min(1.0);
    ((safe_ratio * 0.8 + days_factor * 0.2) * 100.0).round() as u8
}

/// Assemble the weekly report for `week_offset` ISO weeks relative to the
/// clock's today (0 = current week, -1 = previous). Pure over the given
/// snapshot; callers fetch records first and propagate fetch failures
/// instead of handing in a partial snapshot.
pub fn build_weekly_report(
    records: &[DailyLog],
    week_offset: i64,
    clock: &dyn Clock,
) -> WeeklyReport {
    let (start, end) = week_bounds(clock.today(), week_offset);

    let week_records: Vec<DailyLog> = records
        .iter()
        .filter(|r| r.log_date >= start && r.log_date < end)
        .cloned()
        .collect();

    let days_logged: HashSet<NaiveDate> = week_records.iter().map(|r| r.log_date).collect();
    let total_trigger: u32 = week_records
        .iter()
        .map(|r| r.trigger_foods.len() as u32)
        .sum();
    let total_safe: u32 = week_records.iter().map(|r| r.safe_foods.len() as u32).sum();

    let mut top_triggers = food_frequency(&week_records, FoodCategory::Trigger);
    top_triggers.truncate(5);
    let mut top_safe = food_frequency(&week_records, FoodCategory::Safe);
    top_safe.truncate(5);
    let mut top_symptoms = symptom_frequency(&week_records);
    top_symptoms.truncate(5);

    WeeklyReport {
        week_key: week_key(start),
        start,
        end,
        total_days_logged: days_logged.len(),
        total_trigger,
        total_safe,
        top_triggers,
        top_safe,
        top_symptoms,
        mood_frequency: mood_frequency(&week_records),
        meal_breakdown: meal_breakdown(&week_records),
        score: health_score(total_safe, total_trigger, days_logged.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    struct FixedClock(NaiveDate);

    impl Clock for FixedClock {
        fn today(&self) -> NaiveDate {
            self.0
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn record(log_date: &str, trigger: &[&str], safe: &[&str]) -> DailyLog {
        let now = Utc::now();
        DailyLog {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            log_date: date(log_date),
            foods: Vec::new(),
            trigger_foods: trigger.iter().map(|s| s.to_string()).collect(),
            safe_foods: safe.iter().map(|s| s.to_string()).collect(),
            meals: json!({}),
            symptoms: Vec::new(),
            mood: None,
            comment: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn week_bounds_start_on_monday() {
        // 2025-06-05 is a Thursday.
        let (start, end) = week_bounds(date("2025-06-05"), 0);
        assert_eq!(start, date("2025-06-02"));
        assert_eq!(end, date("2025-06-09"));
    }

    #[test]
    fn week_bounds_identity_on_monday() {
        let (start, _) = week_bounds(date("2025-06-02"), 0);
        assert_eq!(start, date("2025-06-02"));
    }

    #[test]
    fn week_bounds_offset_shifts_whole_weeks() {
        let (prev_start, prev_end) = week_bounds(date("2025-06-05"), -1);
        assert_eq!(prev_start, date("2025-05-26"));
        assert_eq!(prev_end, date("2025-06-02"));
    }

    #[test]
    fn week_key_uses_iso_week_year() {
        // 2024-12-30 is a Monday belonging to ISO week 1 of 2025.
        let report = build_weekly_report(&[], 0, &FixedClock(date("2024-12-30")));
        assert_eq!(report.week_key, "2025-W01");
    }

    #[test]
    fn empty_week_reports_zeroes_not_errors() {
        let clock = FixedClock(date("2025-06-05"));
        let report = build_weekly_report(&[], 0, &clock);
        assert_eq!(report.total_days_logged, 0);
        assert_eq!(report.total_trigger, 0);
        assert_eq!(report.total_safe, 0);
        assert!(report.top_triggers.is_empty());
        assert!(report.top_safe.is_empty());
        assert!(report.top_symptoms.is_empty());
        assert!(report.mood_frequency.is_empty());
        assert_eq!(report.score, 0);
    }

    #[test]
    fn report_filters_to_requested_week() {
        let clock = FixedClock(date("2025-06-05"));
        let records = vec![
            record("2025-06-03", &["milk"], &["rice"]),
            // Previous week, must not count.
            record("2025-05-28", &["egg"], &[]),
            // Next Monday is outside the exclusive end.
            record("2025-06-09", &["soy"], &[]),
        ];
        let report = build_weekly_report(&records, 0, &clock);
        assert_eq!(report.total_days_logged, 1);
        assert_eq!(report.total_trigger, 1);
        assert_eq!(report.total_safe, 1);
        assert_eq!(report.top_triggers[0].name, "milk");
    }

    #[test]
    fn score_blends_safe_ratio_and_coverage() {
        let clock = FixedClock(date("2025-06-05"));
        // One day logged, 3 safe of 4 foods: 0.75*0.8 + (1/7)*0.2 = 0.6286 -> 63.
        let records = vec![record("2025-06-03", &["milk"], &["rice", "bread", "apple"])];
        let report = build_weekly_report(&records, 0, &clock);
        assert_eq!(report.score, 63);
    }

    #[test]
    fn score_stays_within_bounds() {
        let clock = FixedClock(date("2025-06-05"));
        let full_week: Vec<DailyLog> = (2..9)
            .map(|d| record(&format!("2025-06-{:02}", d), &[], &["rice"]))
            .collect();
        // All-safe, all seven days logged: the maximum.
        let report = build_weekly_report(&full_week, 0, &clock);
        assert_eq!(report.score, 100);

        let all_trigger = vec![record("2025-06-03", &["milk"], &[])];
        let report = build_weekly_report(&all_trigger, 0, &clock);
        // Ratio 0, one day of coverage: round(0.2/7 * 100) = 3.
        assert_eq!(report.score, 3);
    }

    #[test]
    fn offset_minus_one_reads_previous_week() {
        let clock = FixedClock(date("2025-06-05"));
        let records = vec![record("2025-05-28", &["egg"], &[])];
        let report = build_weekly_report(&records, -1, &clock);
        assert_eq!(report.total_trigger, 1);
        assert_eq!(report.week_key, "2025-W22");
    }
}
