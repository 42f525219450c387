use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::stats::{build_weekly_report, comments_in_window, week_bounds, WeeklyReport};
use crate::store::DailyLogStore;
use crate::AppState;

/// Weeks back the report can reach; two years of history is plenty for
/// the report screen's week picker.
const MIN_WEEK_OFFSET: i64 = -104;

#[derive(Debug, Deserialize)]
pub struct WeeklyReportQuery {
    /// 0 = current ISO week, -1 = previous, and so on.
    pub offset: Option<i64>,
}

#[derive(Debug, serde::Serialize)]
pub struct WeeklyReportResponse {
    #[serde(flatten)]
    pub report: WeeklyReport,
    /// Diary notes written inside the report week, oldest first.
    pub comments: Vec<crate::stats::DatedComment>,
}

/// Build the weekly health report. A store failure propagates as an
/// error — the client shows "report unavailable", never a zeroed report.
pub async fn get_weekly_report(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<WeeklyReportQuery>,
) -> AppResult<Json<WeeklyReportResponse>> {
    let offset = query.offset.unwrap_or(0);
    if offset > 0 || offset < MIN_WEEK_OFFSET {
        return Err(AppError::Validation(format!(
            "offset must be between {} and 0",
            MIN_WEEK_OFFSET
        )));
    }

    let (start, end) = week_bounds(state.clock.today(), offset);
    let records = state
        .log_store()
        .list_records_in(auth_user.id, start, end)
        .await?;

    let report = build_weekly_report(&records, offset, state.clock.as_ref());
    let comments = comments_in_window(&records, start, end);

    Ok(Json(WeeklyReportResponse { report, comments }))
}
