//! Integration tests for the Record activity (`activities::record_run`) and
//! for cascade-delete purging Runs/Attempts when a Schedule is removed.

mod common;

use chrono::Utc;
use common::{create_test_target, interval_params, TestHarness};
use server_core::domains::control_plane;
use server_core::domains::probe::{AttemptResult, ProbeResult};
use server_core::domains::runs::{Attempt, ProbeStatus};
use server_core::domains::workflows::activities;
use std::collections::HashMap;
use test_context::test_context;

fn success_result() -> ProbeResult {
    let now = Utc::now();
    ProbeResult {
        status: ProbeStatus::Success,
        status_code: Some(200),
        latency_ms: Some(12.5),
        response_size_bytes: Some(128),
        response_headers: Some(HashMap::new()),
        response_body: None,
        error_message: None,
        started_at: now,
        request_headers: HashMap::new(),
        request_body: None,
        redirected: false,
        redirect_count: 0,
        redirect_history: Vec::new(),
        attempts: vec![AttemptResult {
            attempt_number: 1,
            started_at: now,
            status: ProbeStatus::Success,
            status_code: Some(200),
            latency_ms: Some(12.5),
            response_size_bytes: Some(128),
            response_headers: Some(HashMap::new()),
            response_body: None,
            error_message: None,
        }],
    }
}

fn retried_result() -> ProbeResult {
    let now = Utc::now();
    ProbeResult {
        status: ProbeStatus::Success,
        status_code: Some(200),
        latency_ms: Some(40.0),
        response_size_bytes: Some(64),
        response_headers: Some(HashMap::new()),
        response_body: None,
        error_message: None,
        started_at: now,
        request_headers: HashMap::new(),
        request_body: None,
        redirected: false,
        redirect_count: 0,
        redirect_history: Vec::new(),
        attempts: vec![
            AttemptResult {
                attempt_number: 1,
                started_at: now,
                status: ProbeStatus::Http5xx,
                status_code: Some(503),
                latency_ms: Some(10.0),
                response_size_bytes: None,
                response_headers: None,
                response_body: None,
                error_message: Some("service unavailable".to_string()),
            },
            AttemptResult {
                attempt_number: 2,
                started_at: now,
                status: ProbeStatus::Success,
                status_code: Some(200),
                latency_ms: Some(40.0),
                response_size_bytes: Some(64),
                response_headers: Some(HashMap::new()),
                response_body: None,
                error_message: None,
            },
        ],
    }
}

#[test_context(TestHarness)]
#[tokio::test]
async fn record_run_persists_run_and_single_attempt(ctx: &TestHarness) {
    let target = create_test_target(&ctx.deps, "https://api.example.com/check").await;
    let params = interval_params(target.id, 30, true);
    let schedule = control_plane::create_schedule(params, &ctx.deps).await.unwrap();

    let run = activities::record_run(schedule.id(), 1, &success_result(), &ctx.deps.db_pool)
        .await
        .unwrap();

    assert_eq!(run.run_number, 1);
    assert_eq!(run.status, ProbeStatus::Success);

    let attempts = Attempt::list_for_run(run.id, &ctx.deps.db_pool).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].attempt_number, 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn record_run_persists_retry_sequence_in_order(ctx: &TestHarness) {
    let target = create_test_target(&ctx.deps, "https://api.example.com/flaky").await;
    let params = interval_params(target.id, 30, true);
    let schedule = control_plane::create_schedule(params, &ctx.deps).await.unwrap();

    let run = activities::record_run(schedule.id(), 1, &retried_result(), &ctx.deps.db_pool)
        .await
        .unwrap();

    let attempts = Attempt::list_for_run(run.id, &ctx.deps.db_pool).await.unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0].status, ProbeStatus::Http5xx);
    assert_eq!(attempts[1].status, ProbeStatus::Success);
    // Final Run status reflects the outcome, not the failed first attempt.
    assert_eq!(run.status, ProbeStatus::Success);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn record_run_replay_is_idempotent(ctx: &TestHarness) {
    let target = create_test_target(&ctx.deps, "https://api.example.com/dupe").await;
    let params = interval_params(target.id, 30, true);
    let schedule = control_plane::create_schedule(params, &ctx.deps).await.unwrap();

    let first = activities::record_run(schedule.id(), 1, &success_result(), &ctx.deps.db_pool)
        .await
        .unwrap();

    // A workflow replay re-executing the same iteration must not create a
    // second row or duplicate the first row's Attempts.
    let second = activities::record_run(schedule.id(), 1, &retried_result(), &ctx.deps.db_pool)
        .await
        .unwrap();
    assert_eq!(first.id, second.id);

    let run_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs WHERE schedule_id = $1 AND run_number = 1")
        .bind(schedule.id())
        .fetch_one(&ctx.deps.db_pool)
        .await
        .unwrap();
    assert_eq!(run_count.0, 1);

    let attempts = Attempt::list_for_run(first.id, &ctx.deps.db_pool).await.unwrap();
    assert_eq!(attempts.len(), 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn delete_schedule_purges_jobs_and_attempts(ctx: &TestHarness) {
    let target = create_test_target(&ctx.deps, "https://api.example.com/purge").await;
    let params = interval_params(target.id, 30, true);
    let schedule = control_plane::create_schedule(params, &ctx.deps).await.unwrap();

    let run = activities::record_run(schedule.id(), 1, &retried_result(), &ctx.deps.db_pool)
        .await
        .unwrap();

    control_plane::delete_schedule(schedule.id(), &ctx.deps).await.unwrap();

    let run_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs WHERE schedule_id = $1")
        .bind(schedule.id())
        .fetch_one(&ctx.deps.db_pool)
        .await
        .unwrap();
    assert_eq!(run_count.0, 0);

    let attempt_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM attempts WHERE job_id = $1")
        .bind(run.id)
        .fetch_one(&ctx.deps.db_pool)
        .await
        .unwrap();
    assert_eq!(attempt_count.0, 0);
}
