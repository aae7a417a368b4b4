//! Fetch and Record — the two persistence-facing activities shared by both
//! workflow variants.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;

use crate::common::ScheduleId;
use crate::domains::probe::ProbeResult;
use crate::domains::runs::{Attempt, ProbeStatus, RedirectHop, Run};
use crate::domains::schedules::find_schedule_variant;
use crate::domains::targets::Target;
use crate::domains::urls::Url;
use crate::impl_restate_serde;

/// A loaded, ready-to-probe snapshot of a schedule's target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    pub interval_seconds: i64,
    pub duration_seconds: Option<i64>,
    pub url: String,
    pub method: crate::domains::targets::HttpMethod,
    pub headers: HashMap<String, String>,
    pub body: Option<serde_json::Value>,
    pub timeout_seconds: i32,
    pub retry_count: i32,
    pub retry_delay_seconds: i32,
    pub follow_redirects: bool,
}

/// The Fetch activity's result: deleted, paused, or a runnable snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FetchOutcome {
    Deleted,
    Paused,
    Runnable(ScheduleSnapshot),
}

impl_restate_serde!(FetchOutcome);

/// Looks up a schedule by id and, if it is active, resolves its Target and
/// Url into a flat snapshot the Probe activity can consume directly.
///
/// A schedule row with no matching Target is a referential-integrity
/// violation, not a domain signal — it is surfaced as an `Err` so the
/// caller's `ctx.run` retries rather than folding it into the outcome.
pub async fn fetch_schedule(schedule_id: ScheduleId, pool: &PgPool) -> anyhow::Result<FetchOutcome> {
    let variant = match find_schedule_variant(schedule_id, pool).await? {
        Some(variant) => variant,
        None => return Ok(FetchOutcome::Deleted),
    };

    if variant.paused() {
        return Ok(FetchOutcome::Paused);
    }

    let target = Target::find_by_id(variant.target_id(), pool).await?;
    let url = Url::find_by_id(target.url_id, pool).await?;

    Ok(FetchOutcome::Runnable(ScheduleSnapshot {
        interval_seconds: variant.interval_seconds(),
        duration_seconds: variant.duration_seconds(),
        url: url.to_url_string(),
        method: target.method,
        headers: target.headers.0.clone(),
        body: target.body.clone(),
        timeout_seconds: target.timeout_seconds,
        retry_count: target.retry_count,
        retry_delay_seconds: target.retry_delay_seconds,
        follow_redirects: target.follow_redirects,
    }))
}

/// Persists one Run and its ordered Attempts transactionally. The
/// `(schedule_id, run_number)` unique index rejects a duplicate insert
/// under at-least-once re-delivery of the same workflow iteration; on
/// conflict this returns the row a prior delivery already wrote instead
/// of inserting a second copy or its Attempts.
pub async fn record_run(
    schedule_id: ScheduleId,
    run_number: i64,
    probe_result: &ProbeResult,
    pool: &PgPool,
) -> anyhow::Result<Run> {
    let mut tx = pool.begin().await?;

    let redirect_history: Vec<RedirectHop> = probe_result.redirect_history.clone();

    let inserted: Option<Run> = sqlx::query_as(
        r#"
        INSERT INTO jobs (
            schedule_id, run_number, started_at, status, status_code, latency_ms,
            response_size_bytes, request_headers, request_body, response_headers,
            response_body, error_message, redirected, redirect_count, redirect_history
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        ON CONFLICT (schedule_id, run_number) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(schedule_id)
    .bind(run_number)
    .bind(probe_result.started_at)
    .bind(probe_result.status)
    .bind(probe_result.status_code)
    .bind(probe_result.latency_ms)
    .bind(probe_result.response_size_bytes)
    .bind(sqlx::types::Json(&probe_result.request_headers))
    .bind(&probe_result.request_body)
    .bind(probe_result.response_headers.as_ref().map(sqlx::types::Json))
    .bind(probe_result.response_body.as_ref().map(sqlx::types::Json))
    .bind(&probe_result.error_message)
    .bind(probe_result.redirected)
    .bind(probe_result.redirect_count)
    .bind(sqlx::types::Json(&redirect_history))
    .fetch_optional(&mut *tx)
    .await?;

    let run = match inserted {
        Some(run) => run,
        None => {
            tx.commit().await?;
            return sqlx::query_as::<_, Run>("SELECT * FROM jobs WHERE schedule_id = $1 AND run_number = $2")
                .bind(schedule_id)
                .bind(run_number)
                .fetch_one(pool)
                .await
                .map_err(Into::into);
        }
    };

    for attempt in &probe_result.attempts {
        let _: Attempt = sqlx::query_as(
            r#"
            INSERT INTO attempts (
                job_id, attempt_number, started_at, status, status_code, latency_ms,
                response_size_bytes, response_headers, response_body, error_message
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(run.id)
        .bind(attempt.attempt_number)
        .bind(attempt.started_at)
        .bind(tolerant_status(attempt.status))
        .bind(attempt.status_code)
        .bind(attempt.latency_ms)
        .bind(attempt.response_size_bytes)
        .bind(attempt.response_headers.as_ref().map(sqlx::types::Json))
        .bind(attempt.response_body.as_ref().map(sqlx::types::Json))
        .bind(&attempt.error_message)
        .fetch_one(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(run)
}

/// Status values arriving from the Probe activity are already a closed
/// `ProbeStatus`, but re-run through the tolerant parser as a defensive
/// normalization step in case this activity is ever fed a raw string from
/// an older workflow history.
fn tolerant_status(status: ProbeStatus) -> ProbeStatus {
    ProbeStatus::from_str_tolerant(status.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerant_status_round_trips_known_values() {
        assert_eq!(tolerant_status(ProbeStatus::Success), ProbeStatus::Success);
        assert_eq!(tolerant_status(ProbeStatus::Http5xx), ProbeStatus::Http5xx);
    }
}
