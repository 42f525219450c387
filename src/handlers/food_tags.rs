use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::daily_log::normalize_name;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct AddTagRequest {
    #[validate(length(min = 1, max = 100, message = "Tag must be 1-100 characters"))]
    pub tag: String,
}

/// The user's personal food vocabulary, used by the client for
/// autocomplete when logging meals.
pub async fn list_tags(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<String>>> {
    let tags = sqlx::query_scalar::<_, Vec<String>>(
        "SELECT food_tags FROM users WHERE id = $1",
    )
    .bind(auth_user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("User not found".into()))?;

    Ok(Json(tags))
}

/// Add a tag if it is new; normalized to trimmed lower-case like every
/// stored food name. Adding an existing tag is a no-op.
pub async fn add_tag(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<AddTagRequest>,
) -> AppResult<Json<Vec<String>>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let cleaned = normalize_name(&body.tag);
    if cleaned.is_empty() {
        return Err(AppError::Validation("Tag must not be blank".into()));
    }

    let tags = sqlx::query_scalar::<_, Vec<String>>(
        r#"
        UPDATE users
        SET food_tags = CASE
                WHEN $2 = ANY(food_tags) THEN food_tags
                ELSE array_append(food_tags, $2)
            END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING food_tags
        "#,
    )
    .bind(auth_user.id)
    .bind(&cleaned)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("User not found".into()))?;

    Ok(Json(tags))
}
