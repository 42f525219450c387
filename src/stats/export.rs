use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::models::daily_log::DailyLog;
use crate::stats::aggregate::{
    daily_trend, distinct_food_counts, food_frequency, mood_frequency, stats_linked_to_food,
    symptom_frequency, symptom_top_foods, DistinctFoodCounts, FoodCategory, FoodLinkedStats,
    FrequencyEntry, SymptomFoods, TrendPoint,
};
use crate::stats::report::Clock;

/// Everything the report renderer needs, assembled verbatim from the
/// aggregation functions. The renderer must not re-derive any number, so
/// the export can never disagree with the on-screen charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsExport {
    pub generated_on: NaiveDate,
    pub distinct_foods: DistinctFoodCounts,
    pub most_trigger_foods: Vec<FrequencyEntry>,
    pub most_safe_foods: Vec<FrequencyEntry>,
    pub symptom_frequency: Vec<FrequencyEntry>,
    pub mood_frequency: Vec<FrequencyEntry>,
    pub selected_food: Option<String>,
    pub selected_food_stats: Option<FoodLinkedStats>,
    /// Trailing seven days, today inclusive.
    pub weekly_trend: Vec<TrendPoint>,
    pub symptom_top_foods: Vec<SymptomFoods>,
    pub total_days_tracked: usize,
    pub average_trigger_per_day: f64,
    pub average_safe_per_day: f64,
}

impl StatsExport {
    pub fn assemble(records: &[DailyLog], selected_food: Option<&str>, clock: &dyn Clock) -> Self {
        let today = clock.today();
        let distinct = distinct_food_counts(records);

        let tracked_days: HashSet<NaiveDate> = records.iter().map(|r| r.log_date).collect();
        let total_days_tracked = tracked_days.len();
        let (average_trigger_per_day, average_safe_per_day) = if total_days_tracked > 0 {
            (
                distinct.trigger as f64 / total_days_tracked as f64,
                distinct.safe as f64 / total_days_tracked as f64,
            )
        } else {
            (0.0, 0.0)
        };

        let selected_food_stats =
            selected_food.map(|food| stats_linked_to_food(records, food));

        Self {
            generated_on: today,
            distinct_foods: distinct,
            most_trigger_foods: food_frequency(records, FoodCategory::Trigger),
            most_safe_foods: food_frequency(records, FoodCategory::Safe),
            symptom_frequency: symptom_frequency(records),
            mood_frequency: mood_frequency(records),
            selected_food: selected_food.map(|f| f.to_string()),
            selected_food_stats,
            weekly_trend: daily_trend(records, today - Duration::days(6), today + Duration::days(1)),
            symptom_top_foods: symptom_top_foods(records),
            total_days_tracked,
            average_trigger_per_day,
            average_safe_per_day,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
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
    fn export_matches_aggregator_outputs_verbatim() {
        let records = vec![
            record("2025-06-03", &["milk"], &["rice"]),
            record("2025-06-04", &["milk", "egg"], &[]),
        ];
        let clock = FixedClock(date("2025-06-05"));
        let export = StatsExport::assemble(&records, Some("milk"), &clock);

        assert_eq!(export.distinct_foods, distinct_food_counts(&records));
        assert_eq!(
            export.most_trigger_foods,
            food_frequency(&records, FoodCategory::Trigger)
        );
        assert_eq!(export.symptom_frequency, symptom_frequency(&records));
        assert_eq!(
            export.selected_food_stats,
            Some(stats_linked_to_food(&records, "milk"))
        );
    }

    #[test]
    fn export_trend_covers_trailing_seven_days() {
        let clock = FixedClock(date("2025-06-05"));
        let export = StatsExport::assemble(&[], None, &clock);
        assert_eq!(export.weekly_trend.len(), 7);
        assert_eq!(export.weekly_trend[0].date, date("2025-05-30"));
        assert_eq!(export.weekly_trend[6].date, date("2025-06-05"));
    }

    #[test]
    fn export_averages_zero_without_data() {
        let clock = FixedClock(date("2025-06-05"));
        let export = StatsExport::assemble(&[], None, &clock);
        assert_eq!(export.total_days_tracked, 0);
        assert_eq!(export.average_trigger_per_day, 0.0);
        assert_eq!(export.average_safe_per_day, 0.0);
    }

    #[test]
    fn export_averages_use_distinct_counts() {
        let records = vec![
            record("2025-06-03", &["milk"], &["rice", "bread"]),
            record("2025-06-04", &["milk"], &[]),
        ];
        let clock = FixedClock(date("2025-06-05"));
        let export = StatsExport::assemble(&records, None, &clock);
        assert_eq!(export.total_days_tracked, 2);
        assert_eq!(export.average_trigger_per_day, 0.5);
        assert_eq!(export.average_safe_per_day, 1.0);
    }
}
