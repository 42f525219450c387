use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::models::daily_log::{normalize_name, DailyLog, MEAL_SLOTS};

/// Which of the two intent-tagged food sets an operation reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoodCategory {
    Trigger,
    Safe,
}

impl FoodCategory {
    fn names<'a>(&self, record: &'a DailyLog) -> &'a [String] {
        match self {
            FoodCategory::Trigger => &record.trigger_foods,
            FoodCategory::Safe => &record.safe_foods,
        }
    }
}

/// One row of a frequency table. `name` keeps the first stored casing
/// encountered; grouping is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrequencyEntry {
    pub name: String,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DistinctFoodCounts {
    pub trigger: usize,
    pub safe: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub trigger: u32,
    pub safe: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FoodLinkedStats {
    pub symptoms: Vec<FrequencyEntry>,
    pub moods: Vec<FrequencyEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymptomFoods {
    pub symptom: String,
    pub top_foods: Vec<FrequencyEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatedComment {
    pub date: NaiveDate,
    pub text: String,
}

/// Occurrence counter with case-insensitive keys. Output order: count
/// descending, ties by first-encountered name.
#[derive(Default)]
struct FrequencyTable {
    entries: HashMap<String, (String, u32, usize)>,
}

impl FrequencyTable {
    fn bump(&mut self, raw: &str) {
        let key = normalize_name(raw);
        if key.is_empty() {
            return;
        }
        match self.entries.get_mut(&key) {
            Some((_, count, _)) => *count += 1,
            None => {
                let order = self.entries.len();
                self.entries.insert(key, (raw.trim().to_string(), 1, order));
            }
        }
    }

    fn into_sorted(self) -> Vec<FrequencyEntry> {
        let mut rows: Vec<_> = self.entries.into_values().collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        rows.into_iter()
            .map(|(name, count, _)| FrequencyEntry { name, count })
            .collect()
    }
}

/// Distinct food names per category across the whole snapshot
/// (dedup-by-set semantics, unlike [`food_frequency`] which counts
/// every occurrence).
pub fn distinct_food_counts(records: &[DailyLog]) -> DistinctFoodCounts {
    let mut trigger: HashSet<String> = HashSet::new();
    let mut safe: HashSet<String> = HashSet::new();
    for record in records {
        trigger.extend(record.trigger_foods.iter().map(|f| normalize_name(f)));
        safe.extend(record.safe_foods.iter().map(|f| normalize_name(f)));
    }
    trigger.remove("");
    safe.remove("");
    DistinctFoodCounts {
        trigger: trigger.len(),
        safe: safe.len(),
    }
}

/// Raw occurrence counts for one food category: one increment per record
/// listing the food, sorted descending.
pub fn food_frequency(records: &[DailyLog], category: FoodCategory) -> Vec<FrequencyEntry> {
    let mut table = FrequencyTable::default();
    for record in records {
        for food in category.names(record) {
            table.bump(food);
        }
    }
    table.into_sorted()
}

pub fn symptom_frequency(records: &[DailyLog]) -> Vec<FrequencyEntry> {
    let mut table = FrequencyTable::default();
    for record in records {
        for symptom in &record.symptoms {
            table.bump(symptom);
        }
    }
    table.into_sorted()
}

/// Mood occurrence counts; records with no mood contribute nothing here
/// while still counting toward every other dimension.
pub fn mood_frequency(records: &[DailyLog]) -> Vec<FrequencyEntry> {
    let mut table = FrequencyTable::default();
    for record in records {
        if let Some(mood) = &record.mood {
            table.bump(mood);
        }
    }
    table.into_sorted()
}

/// Per-day (trigger, safe) counts over `[start, end)`: exactly one entry
/// per calendar day, missing days zero-filled, ascending by date.
pub fn daily_trend(records: &[DailyLog], start: NaiveDate, end: NaiveDate) -> Vec<TrendPoint> {
    let mut by_date: HashMap<NaiveDate, (u32, u32)> = HashMap::new();
    for record in records {
        if record.log_date >= start && record.log_date < end {
            by_date.insert(
                record.log_date,
                (
                    record.trigger_foods.len() as u32,
                    record.safe_foods.len() as u32,
                ),
            );
        }
    }

    let mut points = Vec::new();
    let mut date = start;
    while date < end {
        let (trigger, safe) = by_date.get(&date).copied().unwrap_or((0, 0));
        points.push(TrendPoint {
            date,
            trigger,
            safe,
        });
        date += Duration::days(1);
    }
    points
}

/// Symptom and mood frequencies restricted to records where `food_name`
/// appears (case-insensitively) in either the trigger or safe set.
pub fn stats_linked_to_food(records: &[DailyLog], food_name: &str) -> FoodLinkedStats {
    let wanted = normalize_name(food_name);
    if wanted.is_empty() {
        return FoodLinkedStats::default();
    }

    let mut symptoms = FrequencyTable::default();
    let mut moods = FrequencyTable::default();
    for record in records {
        let mentions = record
            .trigger_foods
            .iter()
            .chain(record.safe_foods.iter())
            .any(|f| normalize_name(f) == wanted);
        if !mentions {
            continue;
        }
        for symptom in &record.symptoms {
            symptoms.bump(symptom);
        }
        if let Some(mood) = &record.mood {
            moods.bump(mood);
        }
    }

    FoodLinkedStats {
        symptoms: symptoms.into_sorted(),
        moods: moods.into_sorted(),
    }
}

/// For every symptom, the five foods it most often co-occurs with
/// (trigger and safe sets combined). Symptoms sorted by name for a
/// stable output.
pub fn symptom_top_foods(records: &[DailyLog]) -> Vec<SymptomFoods> {
    let mut per_symptom: BTreeMap<String, FrequencyTable> = BTreeMap::new();
    for record in records {
        if record.symptoms.is_empty() {
            continue;
        }
        let foods: Vec<&String> = record
            .trigger_foods
            .iter()
            .chain(record.safe_foods.iter())
            .collect();
        if foods.is_empty() {
            continue;
        }
        for symptom in &record.symptoms {
            let key = normalize_name(symptom);
            if key.is_empty() {
                continue;
            }
            let table = per_symptom.entry(key).or_default();
            for food in &foods {
                table.bump(food);
            }
        }
    }

    per_symptom
        .into_iter()
        .map(|(symptom, table)| {
            let mut top_foods = table.into_sorted();
            top_foods.truncate(5);
            SymptomFoods { symptom, top_foods }
        })
        .collect()
}

/// Food occurrences per meal slot across the snapshot. The four known
/// slots are always present; unknown slots recorded by older clients are
/// tallied under their stored name.
pub fn meal_breakdown(records: &[DailyLog]) -> BTreeMap<String, u32> {
    let mut breakdown: BTreeMap<String, u32> = MEAL_SLOTS
        .iter()
        .map(|slot| (slot.to_string(), 0))
        .collect();
    for record in records {
        for (slot, count) in record.meal_counts() {
            *breakdown.entry(slot.to_string()).or_insert(0) += count as u32;
        }
    }
    breakdown
}

/// Non-empty diary comments within `[start, end)`, ascending by date.
pub fn comments_in_window(records: &[DailyLog], start: NaiveDate, end: NaiveDate) -> Vec<DatedComment> {
    let mut comments: Vec<DatedComment> = records
        .iter()
        .filter(|r| r.log_date >= start && r.log_date < end)
        .filter_map(|r| {
            let text = r.comment.as_deref()?.trim();
            if text.is_empty() {
                return None;
            }
            Some(DatedComment {
                date: r.log_date,
                text: text.to_string(),
            })
        })
        .collect();
    comments.sort_by_key(|c| c.date);
    comments
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn record(log_date: &str, trigger: &[&str], safe: &[&str]) -> DailyLog {
        let now = Utc::now();
        DailyLog {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            log_date: date(log_date),
            foods: trigger
                .iter()
                .chain(safe.iter())
                .map(|s| s.to_string())
                .collect(),
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
    fn distinct_counts_dedupe_across_records() {
        // Mon: trigger [milk], safe [rice]; Tue: trigger [milk, egg].
        let records = vec![
            record("2025-06-02", &["milk"], &["rice"]),
            record("2025-06-03", &["milk", "egg"], &[]),
        ];
        let counts = distinct_food_counts(&records);
        assert_eq!(counts.trigger, 2);
        assert_eq!(counts.safe, 1);
    }

    #[test]
    fn distinct_counts_invariant_under_reordering() {
        let mut records = vec![
            record("2025-06-02", &["milk"], &["rice"]),
            record("2025-06-03", &["milk", "egg"], &[]),
            record("2025-06-04", &["egg"], &["rice", "bread"]),
        ];
        let forward = distinct_food_counts(&records);
        records.reverse();
        assert_eq!(distinct_food_counts(&records), forward);
    }

    #[test]
    fn food_frequency_counts_occurrences_descending() {
        let records = vec![
            record("2025-06-02", &["milk"], &["rice"]),
            record("2025-06-03", &["milk", "egg"], &[]),
        ];
        let freq = food_frequency(&records, FoodCategory::Trigger);
        assert_eq!(
            freq,
            vec![
                FrequencyEntry { name: "milk".into(), count: 2 },
                FrequencyEntry { name: "egg".into(), count: 1 },
            ]
        );
        let total: u32 = freq.iter().map(|e| e.count).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn food_frequency_ties_keep_first_encountered_order() {
        let records = vec![
            record("2025-06-02", &["bread", "apple"], &[]),
            record("2025-06-03", &["apple", "bread"], &[]),
        ];
        let freq = food_frequency(&records, FoodCategory::Trigger);
        assert_eq!(freq[0].name, "bread");
        assert_eq!(freq[1].name, "apple");
        assert_eq!(freq[0].count, 2);
        assert_eq!(freq[1].count, 2);
    }

    #[test]
    fn food_frequency_groups_case_insensitively() {
        let records = vec![
            record("2025-06-02", &["Milk"], &[]),
            record("2025-06-03", &["milk"], &[]),
        ];
        let freq = food_frequency(&records, FoodCategory::Trigger);
        assert_eq!(freq.len(), 1);
        // Display casing is the first stored form.
        assert_eq!(freq[0].name, "Milk");
        assert_eq!(freq[0].count, 2);
    }

    #[test]
    fn empty_records_yield_empty_results() {
        let records: Vec<DailyLog> = Vec::new();
        assert_eq!(distinct_food_counts(&records), DistinctFoodCounts::default());
        assert!(food_frequency(&records, FoodCategory::Safe).is_empty());
        assert!(symptom_frequency(&records).is_empty());
        assert!(mood_frequency(&records).is_empty());
        assert!(stats_linked_to_food(&records, "milk").symptoms.is_empty());
        assert!(symptom_top_foods(&records).is_empty());
    }

    #[test]
    fn mood_frequency_skips_missing_and_empty() {
        let mut a = record("2025-06-02", &["milk"], &[]);
        a.mood = Some("Happy".into());
        let mut b = record("2025-06-03", &[], &["rice"]);
        b.mood = Some("  ".into());
        let c = record("2025-06-04", &[], &[]);
        let freq = mood_frequency(&[a, b, c]);
        assert_eq!(freq.len(), 1);
        assert_eq!(freq[0].name, "Happy");
    }

    #[test]
    fn daily_trend_fills_every_day_in_window() {
        let records = vec![record("2025-06-03", &["milk", "egg"], &["rice"])];
        let start = date("2025-06-02");
        let end = date("2025-06-09");
        let trend = daily_trend(&records, start, end);
        assert_eq!(trend.len(), 7);
        assert!(trend.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(trend[0], TrendPoint { date: start, trigger: 0, safe: 0 });
        assert_eq!(
            trend[1],
            TrendPoint { date: date("2025-06-03"), trigger: 2, safe: 1 }
        );
    }

    #[test]
    fn daily_trend_excludes_end_date() {
        let records = vec![record("2025-06-09", &["milk"], &[])];
        let trend = daily_trend(&records, date("2025-06-02"), date("2025-06-09"));
        assert!(trend.iter().all(|p| p.trigger == 0 && p.safe == 0));
    }

    #[test]
    fn daily_trend_empty_window_is_empty() {
        let d = date("2025-06-02");
        assert!(daily_trend(&[], d, d).is_empty());
    }

    #[test]
    fn linked_stats_filter_by_food_case_insensitively() {
        let mut with_milk = record("2025-06-02", &["Milk"], &[]);
        with_milk.symptoms = vec!["bloating".into(), "nausea".into()];
        with_milk.mood = Some("Tired".into());
        let mut without = record("2025-06-03", &["egg"], &[]);
        without.symptoms = vec!["headache".into()];
        without.mood = Some("Happy".into());

        let linked = stats_linked_to_food(&[with_milk, without], "milk");
        let names: Vec<_> = linked.symptoms.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["bloating", "nausea"]);
        assert_eq!(linked.moods.len(), 1);
        assert_eq!(linked.moods[0].name, "Tired");
    }

    #[test]
    fn symptom_top_foods_caps_at_five() {
        let mut r = record(
            "2025-06-02",
            &["a", "b", "c", "d"],
            &["e", "f", "g"],
        );
        r.symptoms = vec!["bloating".into()];
        let out = symptom_top_foods(&[r]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].symptom, "bloating");
        assert_eq!(out[0].top_foods.len(), 5);
    }

    #[test]
    fn meal_breakdown_seeds_known_slots() {
        let mut r = record("2025-06-02", &[], &[]);
        r.meals = json!({"breakfast": ["bread", "egg"], "dinner": ["soup"]});
        let breakdown = meal_breakdown(&[r]);
        assert_eq!(breakdown["breakfast"], 2);
        assert_eq!(breakdown["dinner"], 1);
        assert_eq!(breakdown["snack"], 0);
        assert_eq!(breakdown["additional"], 0);
    }

    #[test]
    fn comments_sorted_and_trimmed() {
        let mut late = record("2025-06-04", &[], &[]);
        late.comment = Some("  felt better  ".into());
        let mut early = record("2025-06-02", &[], &[]);
        early.comment = Some("rough day".into());
        let mut blank = record("2025-06-03", &[], &[]);
        blank.comment = Some("   ".into());

        let comments =
            comments_in_window(&[late, early, blank], date("2025-06-01"), date("2025-06-08"));
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "rough day");
        assert_eq!(comments[1].text, "felt better");
    }

    #[test]
    fn aggregation_is_referentially_transparent() {
        let mut r = record("2025-06-02", &["milk", "egg"], &["rice"]);
        r.symptoms = vec!["bloating".into()];
        r.mood = Some("Calm".into());
        let records = vec![r];

        assert_eq!(distinct_food_counts(&records), distinct_food_counts(&records));
        assert_eq!(
            food_frequency(&records, FoodCategory::Trigger),
            food_frequency(&records, FoodCategory::Trigger)
        );
        assert_eq!(
            stats_linked_to_food(&records, "milk"),
            stats_linked_to_food(&records, "milk")
        );
        assert_eq!(symptom_top_foods(&records), symptom_top_foods(&records));
    }
}
