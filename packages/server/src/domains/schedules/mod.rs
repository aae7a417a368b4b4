//! Schedules — the Interval and Window variants, stored in disjoint tables.
//!
//! Dynamic dispatch over the two variants is encoded as a tagged Rust enum
//! (`ScheduleVariant`) at the application boundary; storage keeps them in
//! separate tables (`interval_schedules`, `window_schedules`) so each can
//! carry its own columns (`duration_seconds` only exists on Window).

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{ScheduleId, TargetId};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IntervalSchedule {
    pub id: ScheduleId,
    pub name: String,
    pub target_id: TargetId,
    pub interval_seconds: i64,
    pub paused: bool,
    pub workflow_handle: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WindowSchedule {
    pub id: ScheduleId,
    pub name: String,
    pub target_id: TargetId,
    pub interval_seconds: i64,
    pub duration_seconds: i64,
    pub paused: bool,
    pub workflow_handle: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The result of a "get schedule by id" lookup, which probes both tables in
/// parallel and returns whichever matches, tagged with its variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum ScheduleVariant {
    Interval(IntervalSchedule),
    Window(WindowSchedule),
}

impl ScheduleVariant {
    pub fn id(&self) -> ScheduleId {
        match self {
            ScheduleVariant::Interval(s) => s.id,
            ScheduleVariant::Window(s) => s.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ScheduleVariant::Interval(s) => &s.name,
            ScheduleVariant::Window(s) => &s.name,
        }
    }

    pub fn target_id(&self) -> TargetId {
        match self {
            ScheduleVariant::Interval(s) => s.target_id,
            ScheduleVariant::Window(s) => s.target_id,
        }
    }

    pub fn interval_seconds(&self) -> i64 {
        match self {
            ScheduleVariant::Interval(s) => s.interval_seconds,
            ScheduleVariant::Window(s) => s.interval_seconds,
        }
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        match self {
            ScheduleVariant::Interval(_) => None,
            ScheduleVariant::Window(s) => Some(s.duration_seconds),
        }
    }

    pub fn paused(&self) -> bool {
        match self {
            ScheduleVariant::Interval(s) => s.paused,
            ScheduleVariant::Window(s) => s.paused,
        }
    }

    pub fn workflow_handle(&self) -> Option<&str> {
        match self {
            ScheduleVariant::Interval(s) => s.workflow_handle.as_deref(),
            ScheduleVariant::Window(s) => s.workflow_handle.as_deref(),
        }
    }

    pub fn workflow_service_name(&self) -> &'static str {
        match self {
            ScheduleVariant::Interval(_) => "IntervalScheduleWorkflow",
            ScheduleVariant::Window(_) => "WindowScheduleWorkflow",
        }
    }
}

/// Parameters for creating either variant; presence of `duration_seconds`
/// selects Window over Interval.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateScheduleParams {
    pub name: String,
    pub target_id: TargetId,
    pub interval_seconds: i64,
    pub duration_seconds: Option<i64>,
    #[serde(default)]
    pub paused: bool,
}

impl CreateScheduleParams {
    pub fn validate(&self) -> Result<()> {
        if self.interval_seconds <= 0 {
            anyhow::bail!("interval_seconds must be > 0");
        }
        if let Some(duration) = self.duration_seconds {
            if duration <= 0 {
                anyhow::bail!("duration_seconds must be > 0");
            }
        }
        Ok(())
    }
}

/// Workflow handle format: `"schedule-<uuid>"`.
pub fn workflow_handle_for(id: ScheduleId) -> String {
    format!("schedule-{}", id)
}

impl IntervalSchedule {
    pub async fn find_by_id(id: ScheduleId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM interval_schedules WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn create(params: &CreateScheduleParams, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO interval_schedules (name, target_id, interval_seconds, paused)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&params.name)
        .bind(params.target_id)
        .bind(params.interval_seconds)
        .bind(params.paused)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn set_interval_seconds(id: ScheduleId, interval_seconds: i64, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "UPDATE interval_schedules SET interval_seconds = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(interval_seconds)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn set_paused_and_handle(
        id: ScheduleId,
        paused: bool,
        workflow_handle: Option<&str>,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "UPDATE interval_schedules SET paused = $2, workflow_handle = $3, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(paused)
        .bind(workflow_handle)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn delete(id: ScheduleId, pool: &PgPool) -> Result<()> {
        sqlx::query("DELETE FROM interval_schedules WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn delete_for_target(target_id: TargetId, pool: &PgPool) -> Result<Vec<ScheduleId>> {
        let rows: Vec<(ScheduleId,)> =
            sqlx::query_as("DELETE FROM interval_schedules WHERE target_id = $1 RETURNING id")
                .bind(target_id)
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

impl WindowSchedule {
    pub async fn find_by_id(id: ScheduleId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM window_schedules WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn create(params: &CreateScheduleParams, duration_seconds: i64, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO window_schedules (name, target_id, interval_seconds, duration_seconds, paused)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&params.name)
        .bind(params.target_id)
        .bind(params.interval_seconds)
        .bind(duration_seconds)
        .bind(params.paused)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn set_interval_seconds(id: ScheduleId, interval_seconds: i64, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "UPDATE window_schedules SET interval_seconds = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(interval_seconds)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn set_paused_and_handle(
        id: ScheduleId,
        paused: bool,
        workflow_handle: Option<&str>,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "UPDATE window_schedules SET paused = $2, workflow_handle = $3, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(paused)
        .bind(workflow_handle)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn delete(id: ScheduleId, pool: &PgPool) -> Result<()> {
        sqlx::query("DELETE FROM window_schedules WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn delete_for_target(target_id: TargetId, pool: &PgPool) -> Result<Vec<ScheduleId>> {
        let rows: Vec<(ScheduleId,)> =
            sqlx::query_as("DELETE FROM window_schedules WHERE target_id = $1 RETURNING id")
                .bind(target_id)
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

/// Looks up a schedule by id across both tables in parallel. At most one
/// table may match; `None` means the schedule does not exist (or was
/// deleted).
pub async fn find_schedule_variant(id: ScheduleId, pool: &PgPool) -> Result<Option<ScheduleVariant>> {
    let (interval, window) = tokio::try_join!(
        IntervalSchedule::find_by_id(id, pool),
        WindowSchedule::find_by_id(id, pool),
    )?;

    match (interval, window) {
        (Some(s), None) => Ok(Some(ScheduleVariant::Interval(s))),
        (None, Some(s)) => Ok(Some(ScheduleVariant::Window(s))),
        (None, None) => Ok(None),
        (Some(_), Some(_)) => {
            anyhow::bail!("schedule {} exists in both interval and window tables", id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_handle_format() {
        let id = ScheduleId::new();
        assert_eq!(workflow_handle_for(id), format!("schedule-{}", id));
    }

    #[test]
    fn validate_rejects_non_positive_interval() {
        let params = CreateScheduleParams {
            name: "bad".to_string(),
            target_id: TargetId::new(),
            interval_seconds: 0,
            duration_seconds: None,
            paused: false,
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn validate_accepts_window_with_shorter_duration_than_interval() {
        // Window's duration_seconds < interval_seconds is legal (the
        // workflow simply runs once and exits).
        let params = CreateScheduleParams {
            name: "short-window".to_string(),
            target_id: TargetId::new(),
            interval_seconds: 60,
            duration_seconds: Some(10),
            paused: false,
        };
        assert!(params.validate().is_ok());
    }
}
