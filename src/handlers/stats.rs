use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::daily_log::normalize_name;
use crate::models::user::SubscriptionTier;
use crate::stats::{
    daily_trend, distinct_food_counts, food_frequency, mood_frequency, stats_linked_to_food,
    symptom_frequency, symptom_top_foods, DistinctFoodCounts, FoodCategory, FoodLinkedStats,
    FrequencyEntry, StatsExport, SymptomFoods, TrendPoint,
};
use crate::store::DailyLogStore;
use crate::AppState;

const MAX_TREND_WINDOW_DAYS: i64 = 366;

/// Everything the main stats screen shows, computed from one snapshot so
/// the numbers agree with each other.
#[derive(Debug, Serialize)]
pub struct StatsOverview {
    pub distinct_foods: DistinctFoodCounts,
    pub most_trigger_foods: Vec<FrequencyEntry>,
    pub most_safe_foods: Vec<FrequencyEntry>,
    pub symptom_frequency: Vec<FrequencyEntry>,
    pub mood_frequency: Vec<FrequencyEntry>,
    /// Union of trigger and safe names, sorted, for the food picker.
    pub all_foods: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub food: Option<String>,
}

pub async fn get_overview(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<StatsOverview>> {
    let records = state.log_store().list_records(auth_user.id).await?;

    let mut all_foods: BTreeSet<String> = BTreeSet::new();
    for record in &records {
        all_foods.extend(record.trigger_foods.iter().map(|f| normalize_name(f)));
        all_foods.extend(record.safe_foods.iter().map(|f| normalize_name(f)));
    }
    all_foods.remove("");

    Ok(Json(StatsOverview {
        distinct_foods: distinct_food_counts(&records),
        most_trigger_foods: food_frequency(&records, FoodCategory::Trigger),
        most_safe_foods: food_frequency(&records, FoodCategory::Safe),
        symptom_frequency: symptom_frequency(&records),
        mood_frequency: mood_frequency(&records),
        all_foods: all_foods.into_iter().collect(),
    }))
}

/// Per-day trigger/safe counts. Defaults to the trailing seven days,
/// today inclusive; every day in the window is present in the response.
pub async fn get_trend(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<TrendQuery>,
) -> AppResult<Json<Vec<TrendPoint>>> {
    let today = state.clock.today();
    let end = query
        .end_date
        .map(|d| d + Duration::days(1))
        .unwrap_or(today + Duration::days(1));
    let start = query.start_date.unwrap_or(end - Duration::days(7));

    if start >= end {
        return Err(AppError::Validation(
            "start_date must be before end_date".into(),
        ));
    }
    if (end - start).num_days() > MAX_TREND_WINDOW_DAYS {
        return Err(AppError::Validation(format!(
            "Trend window is capped at {} days",
            MAX_TREND_WINDOW_DAYS
        )));
    }

    let records = state
        .log_store()
        .list_records_in(auth_user.id, start, end)
        .await?;

    Ok(Json(daily_trend(&records, start, end)))
}

/// Symptoms and moods recorded on days the given food was logged,
/// matched case-insensitively.
pub async fn get_food_links(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(food_name): Path<String>,
) -> AppResult<Json<FoodLinkedStats>> {
    if normalize_name(&food_name).is_empty() {
        return Err(AppError::Validation("Food name must not be blank".into()));
    }

    let records = state.log_store().list_records(auth_user.id).await?;
    Ok(Json(stats_linked_to_food(&records, &food_name)))
}

pub async fn get_symptom_foods(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<SymptomFoods>>> {
    let records = state.log_store().list_records(auth_user.id).await?;
    Ok(Json(symptom_top_foods(&records)))
}

/// The export document for the client-side report renderer. Premium
/// only; the tier flag is maintained by the store platform.
pub async fn export_stats(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ExportQuery>,
) -> AppResult<Json<StatsExport>> {
    let tier = sqlx::query_scalar::<_, SubscriptionTier>(
        "SELECT subscription_tier FROM users WHERE id = $1",
    )
    .bind(auth_user.id)
    .fetch_one(&state.db)
    .await?;

    if !tier.can_export_reports() {
        return Err(AppError::Forbidden);
    }

    let records = state.log_store().list_records(auth_user.id).await?;
    let export = StatsExport::assemble(&records, query.food.as_deref(), state.clock.as_ref());
    Ok(Json(export))
}
