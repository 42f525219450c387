use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Meal slots recognized in the `meals` map. Unknown slots are rejected at
/// the API boundary but tolerated by the aggregation core.
pub const MEAL_SLOTS: [&str; 4] = ["breakfast", "snack", "dinner", "additional"];

/// One diary record per user per calendar day. `log_date` is the record's
/// identity and never changes after creation; everything else is mutated
/// in place by later edits on the same day.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub log_date: NaiveDate,
    pub foods: Vec<String>,
    pub trigger_foods: Vec<String>,
    pub safe_foods: Vec<String>,
    /// Meal-slot name → list of food names, stored as JSONB.
    pub meals: serde_json::Value,
    pub symptoms: Vec<String>,
    pub mood: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DailyLog {
    /// Food occurrences per meal slot, reading only well-formed entries.
    pub fn meal_counts(&self) -> Vec<(&str, usize)> {
        let Some(map) = self.meals.as_object() else {
            return Vec::new();
        };
        map.iter()
            .filter_map(|(slot, foods)| {
                foods.as_array().map(|a| (slot.as_str(), a.len()))
            })
            .collect()
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertDailyLogRequest {
    /// Defaults to today (server date) when absent.
    pub log_date: Option<NaiveDate>,
    pub foods: Option<Vec<String>>,
    pub trigger_foods: Option<Vec<String>>,
    pub safe_foods: Option<Vec<String>>,
    pub meals: Option<serde_json::Value>,
    pub symptoms: Option<Vec<String>>,
    #[validate(length(max = 64, message = "Mood label too long"))]
    pub mood: Option<String>,
    #[validate(length(max = 5000, message = "Comment must be under 5000 characters"))]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DailyLogQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Trim and lower-case a food/symptom name, the canonical stored form.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalize a list, dropping entries that are empty after trimming and
/// collapsing duplicates while keeping first-seen order.
pub fn normalize_names(raw: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(raw.len());
    for name in raw {
        let cleaned = normalize_name(&name);
        if cleaned.is_empty() {
            continue;
        }
        if seen.insert(cleaned.clone()) {
            out.push(cleaned);
        }
    }
    out
}

/// Validate a `meals` map: object of known slot → array of strings.
pub fn validate_meals(meals: &serde_json::Value) -> Result<(), String> {
    let Some(map) = meals.as_object() else {
        return Err("meals must be an object of meal slot to food list".into());
    };
    for (slot, foods) in map {
        if !MEAL_SLOTS.contains(&slot.as_str()) {
            return Err(format!(
                "Unknown meal slot '{}'; expected one of {:?}",
                slot, MEAL_SLOTS
            ));
        }
        let Some(items) = foods.as_array() else {
            return Err(format!("Meal slot '{}' must hold a list of foods", slot));
        };
        if items.iter().any(|f| !f.is_string()) {
            return Err(format!("Meal slot '{}' contains a non-string entry", slot));
        }
    }
    Ok(())
}
