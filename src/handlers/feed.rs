use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::post::{
    Comment, CreateCommentRequest, CreatePostRequest, FeedComment, FeedPost, Post,
};
use crate::AppState;

const FEED_PAGE_SIZE: i64 = 50;

fn broadcast_feed_event(state: &AppState, event: serde_json::Value) {
    if let Some(tx) = state.ws_tx.as_ref() {
        let _ = tx.send(event.to_string());
    }
}

async fn author_name(state: &AppState, user_id: Uuid) -> AppResult<String> {
    sqlx::query_scalar::<_, String>("SELECT name FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))
}

/// Newest-first feed page with denormalized counters, so the feed screen
/// renders from a single read.
pub async fn list_posts(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<FeedPost>>> {
    let posts = sqlx::query_as::<_, FeedPost>(
        r#"
        SELECT
            p.id, p.user_id, p.author_name, p.content, p.created_at,
            (SELECT COUNT(*) FROM post_likes pl WHERE pl.post_id = p.id) AS like_count,
            (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count,
            EXISTS(
                SELECT 1 FROM post_likes pl
                WHERE pl.post_id = p.id AND pl.user_id = $1
            ) AS liked_by_me
        FROM posts p
        ORDER BY p.created_at DESC
        LIMIT $2
        "#,
    )
    .bind(auth_user.id)
    .bind(FEED_PAGE_SIZE)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(posts))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreatePostRequest>,
) -> AppResult<Json<Post>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let name = author_name(&state, auth_user.id).await?;

    let post = sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (id, user_id, author_name, content)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(&name)
    .bind(body.content.trim())
    .fetch_one(&state.db)
    .await?;

    broadcast_feed_event(
        &state,
        serde_json::json!({
            "type": "post_created",
            "post_id": post.id,
        }),
    );

    Ok(Json(post))
}

/// Deleting a post takes its comments and likes with it (FK cascade).
pub async fn delete_post(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(post_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND user_id = $2")
        .bind(post_id)
        .bind(auth_user.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Post not found".into()));
    }

    broadcast_feed_event(
        &state,
        serde_json::json!({
            "type": "post_deleted",
            "post_id": post_id,
        }),
    );

    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// Toggle the caller's like on a post.
pub async fn toggle_post_like(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(post_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_one(&state.db)
        .await?;
    if exists == 0 {
        return Err(AppError::NotFound("Post not found".into()));
    }

    let inserted = sqlx::query(
        "INSERT INTO post_likes (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(post_id)
    .bind(auth_user.id)
    .execute(&state.db)
    .await?;

    let action = if inserted.rows_affected() == 0 {
        sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(auth_user.id)
            .execute(&state.db)
            .await?;
        "unliked"
    } else {
        "liked"
    };

    let like_count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM post_likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&state.db)
            .await?;

    Ok(Json(serde_json::json!({
        "action": action,
        "post_id": post_id,
        "like_count": like_count,
    })))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(post_id): Path<Uuid>,
) -> AppResult<Json<Vec<FeedComment>>> {
    let comments = sqlx::query_as::<_, FeedComment>(
        r#"
        SELECT
            c.id, c.post_id, c.user_id, c.author_name, c.content, c.created_at,
            (SELECT COUNT(*) FROM comment_likes cl WHERE cl.comment_id = c.id) AS like_count,
            EXISTS(
                SELECT 1 FROM comment_likes cl
                WHERE cl.comment_id = c.id AND cl.user_id = $2
            ) AS liked_by_me
        FROM comments c
        WHERE c.post_id = $1
        ORDER BY c.created_at ASC
        "#,
    )
    .bind(post_id)
    .bind(auth_user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(comments))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(post_id): Path<Uuid>,
    Json(body): Json<CreateCommentRequest>,
) -> AppResult<Json<Comment>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_one(&state.db)
        .await?;
    if exists == 0 {
        return Err(AppError::NotFound("Post not found".into()));
    }

    let name = author_name(&state, auth_user.id).await?;

    let comment = sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (id, post_id, user_id, author_name, content)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(post_id)
    .bind(auth_user.id)
    .bind(&name)
    .bind(body.content.trim())
    .fetch_one(&state.db)
    .await?;

    broadcast_feed_event(
        &state,
        serde_json::json!({
            "type": "comment_added",
            "post_id": post_id,
            "comment_id": comment.id,
        }),
    );

    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(comment_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM comments WHERE id = $1 AND user_id = $2")
        .bind(comment_id)
        .bind(auth_user.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Comment not found".into()));
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub async fn toggle_comment_like(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(comment_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments WHERE id = $1")
        .bind(comment_id)
        .fetch_one(&state.db)
        .await?;
    if exists == 0 {
        return Err(AppError::NotFound("Comment not found".into()));
    }

    let inserted = sqlx::query(
        "INSERT INTO comment_likes (comment_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(comment_id)
    .bind(auth_user.id)
    .execute(&state.db)
    .await?;

    let action = if inserted.rows_affected() == 0 {
        sqlx::query("DELETE FROM comment_likes WHERE comment_id = $1 AND user_id = $2")
            .bind(comment_id)
            .bind(auth_user.id)
            .execute(&state.db)
            .await?;
        "unliked"
    } else {
        "liked"
    };

    let like_count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM comment_likes WHERE comment_id = $1",
    )
    .bind(comment_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(serde_json::json!({
        "action": action,
        "comment_id": comment_id,
        "like_count": like_count,
    })))
}
