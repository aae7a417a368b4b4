//! Runs and Attempts — the Record activity's persisted output.

pub mod body;
pub mod status;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;

use crate::common::{AttemptId, RunId, ScheduleId};

pub use body::JsonOrText;
pub use status::ProbeStatus;

/// One redirect hop captured during a probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectHop {
    pub url: String,
    pub status_code: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Run {
    pub id: RunId,
    pub schedule_id: ScheduleId,
    pub run_number: i64,
    pub started_at: DateTime<Utc>,
    pub status: ProbeStatus,
    pub status_code: Option<i32>,
    pub latency_ms: Option<f64>,
    pub response_size_bytes: Option<i64>,
    pub request_headers: sqlx::types::Json<HashMap<String, String>>,
    pub request_body: Option<Value>,
    pub response_headers: Option<sqlx::types::Json<HashMap<String, String>>>,
    pub response_body: Option<sqlx::types::Json<JsonOrText>>,
    pub error_message: Option<String>,
    pub redirected: bool,
    pub redirect_count: i32,
    pub redirect_history: sqlx::types::Json<Vec<RedirectHop>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// The owning schedule's name, joined in by `list_for_schedule` and
    /// `list_all`. Absent (not merely `None`) from plain `SELECT *`
    /// lookups such as `find_by_id`, so it defaults to `None` there.
    #[sqlx(default)]
    pub schedule_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attempt {
    pub id: AttemptId,
    pub job_id: RunId,
    pub attempt_number: i32,
    pub started_at: DateTime<Utc>,
    pub status: ProbeStatus,
    pub status_code: Option<i32>,
    pub latency_ms: Option<f64>,
    pub response_size_bytes: Option<i64>,
    pub response_headers: Option<sqlx::types::Json<HashMap<String, String>>>,
    pub response_body: Option<sqlx::types::Json<JsonOrText>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A Run together with its ordered Attempts, as returned by `GET /runs/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunWithAttempts {
    #[serde(flatten)]
    pub run: Run,
    pub attempts: Vec<Attempt>,
}

/// Filters accepted by `GET /runs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunFilter {
    pub schedule_id: Option<ScheduleId>,
    pub status: Option<ProbeStatus>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Run {
    pub async fn find_by_id(id: RunId, pool: &PgPool) -> anyhow::Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }

    /// Lists Runs for a single schedule, most recent `run_number` first,
    /// joined through whichever schedule table owns it to surface the
    /// schedule's name alongside each row.
    pub async fn list_for_schedule(
        schedule_id: ScheduleId,
        filter: &RunFilter,
        pool: &PgPool,
    ) -> anyhow::Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT j.*, COALESCE(isch.name, wsch.name) AS schedule_name FROM jobs j
            LEFT JOIN interval_schedules isch ON isch.id = j.schedule_id
            LEFT JOIN window_schedules wsch ON wsch.id = j.schedule_id
            WHERE j.schedule_id = $1
                AND ($2::text IS NULL OR j.status = $2::jobstatus)
                AND ($3::timestamptz IS NULL OR j.started_at >= $3)
                AND ($4::timestamptz IS NULL OR j.started_at <= $4)
            ORDER BY j.run_number DESC
            "#,
        )
        .bind(schedule_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.start_time)
        .bind(filter.end_time)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Lists Runs across every schedule, joined through both the Interval
    /// and Window schedule tables to surface the schedule name.
    pub async fn list_all(filter: &RunFilter, pool: &PgPool) -> anyhow::Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT j.*, COALESCE(isch.name, wsch.name) AS schedule_name FROM jobs j
            LEFT JOIN interval_schedules isch ON isch.id = j.schedule_id
            LEFT JOIN window_schedules wsch ON wsch.id = j.schedule_id
            WHERE (isch.id IS NOT NULL OR wsch.id IS NOT NULL)
                AND ($1::text IS NULL OR j.status = $1::jobstatus)
                AND ($2::timestamptz IS NULL OR j.started_at >= $2)
                AND ($3::timestamptz IS NULL OR j.started_at <= $3)
            ORDER BY j.started_at DESC
            "#,
        )
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.start_time)
        .bind(filter.end_time)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}

impl Attempt {
    pub async fn list_for_run(job_id: RunId, pool: &PgPool) -> anyhow::Result<Vec<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM attempts WHERE job_id = $1 ORDER BY attempt_number ASC")
            .bind(job_id)
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }
}
