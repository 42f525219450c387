use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::daily_log::{
    normalize_names, validate_meals, DailyLog, DailyLogQuery, UpsertDailyLogRequest,
};
use crate::AppState;

/// Create or update the record for one calendar day. The date is the
/// record's identity: first write creates it, every later write merges
/// into it. Absent fields keep their current value.
pub async fn upsert_daily_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpsertDailyLogRequest>,
) -> AppResult<Json<DailyLog>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let log_date = body.log_date.unwrap_or_else(|| Utc::now().date_naive());

    if let Some(meals) = &body.meals {
        validate_meals(meals).map_err(AppError::Validation)?;
    }

    let foods = body.foods.map(normalize_names);
    let trigger_foods = body.trigger_foods.map(normalize_names);
    let safe_foods = body.safe_foods.map(normalize_names);
    let symptoms = body.symptoms.map(normalize_names);
    let mood = body
        .mood
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());

    let log = sqlx::query_as::<_, DailyLog>(
        r#"
        INSERT INTO daily_logs
            (id, user_id, log_date, foods, trigger_foods, safe_foods, meals, symptoms, mood, comment)
        VALUES
            ($1, $2, $3, COALESCE($4, '{}'), COALESCE($5, '{}'), COALESCE($6, '{}'),
             COALESCE($7, '{}'::jsonb), COALESCE($8, '{}'), $9, $10)
        ON CONFLICT (user_id, log_date) DO UPDATE SET
            foods = COALESCE($4, daily_logs.foods),
            trigger_foods = COALESCE($5, daily_logs.trigger_foods),
            safe_foods = COALESCE($6, daily_logs.safe_foods),
            meals = COALESCE($7, daily_logs.meals),
            symptoms = COALESCE($8, daily_logs.symptoms),
            mood = COALESCE($9, daily_logs.mood),
            comment = COALESCE($10, daily_logs.comment),
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(log_date)
    .bind(&foods)
    .bind(&trigger_foods)
    .bind(&safe_foods)
    .bind(&body.meals)
    .bind(&symptoms)
    .bind(&mood)
    .bind(&body.comment)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(log))
}

pub async fn list_daily_logs(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<DailyLogQuery>,
) -> AppResult<Json<Vec<DailyLog>>> {
    let end = query.end_date.unwrap_or_else(|| Utc::now().date_naive());
    let start = query.start_date.unwrap_or(end - chrono::Duration::days(30));

    if start > end {
        return Err(AppError::Validation("start_date must not be after end_date".into()));
    }

    let logs = sqlx::query_as::<_, DailyLog>(
        r#"
        SELECT * FROM daily_logs
        WHERE user_id = $1 AND log_date BETWEEN $2 AND $3
        ORDER BY log_date DESC
        "#,
    )
    .bind(auth_user.id)
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(logs))
}

pub async fn get_daily_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(log_date): Path<NaiveDate>,
) -> AppResult<Json<DailyLog>> {
    let log = sqlx::query_as::<_, DailyLog>(
        "SELECT * FROM daily_logs WHERE user_id = $1 AND log_date = $2",
    )
    .bind(auth_user.id)
    .bind(log_date)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("No log for that date".into()))?;

    Ok(Json(log))
}
