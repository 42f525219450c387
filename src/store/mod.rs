//! Daily-log store boundary.
//!
//! The statistics core never talks to the database; handlers fetch a
//! snapshot through this trait and pass it on. Fetch failures propagate
//! unchanged — no retries here, and never an empty snapshot in place of
//! an error.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::daily_log::DailyLog;

#[async_trait]
pub trait DailyLogStore: Send + Sync {
    /// All records for one user, ascending by date. Dates are unique per
    /// user (enforced by the schema).
    async fn list_records(&self, user_id: Uuid) -> Result<Vec<DailyLog>, sqlx::Error>;

    /// Records with `start <= log_date < end`, ascending by date.
    async fn list_records_in(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyLog>, sqlx::Error>;
}

#[derive(Clone)]
pub struct PgDailyLogStore {
    pool: PgPool,
}

impl PgDailyLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DailyLogStore for PgDailyLogStore {
    async fn list_records(&self, user_id: Uuid) -> Result<Vec<DailyLog>, sqlx::Error> {
        sqlx::query_as::<_, DailyLog>(
            r#"
            SELECT * FROM daily_logs
            WHERE user_id = $1
            ORDER BY log_date ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn list_records_in(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyLog>, sqlx::Error> {
        sqlx::query_as::<_, DailyLog>(
            r#"
            SELECT * FROM daily_logs
            WHERE user_id = $1 AND log_date >= $2 AND log_date < $3
            ORDER BY log_date ASC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
    }
}
