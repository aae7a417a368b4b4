//! Integration tests for Target and Schedule Control Plane operations
//! against a real (containerized) Postgres instance.

mod common;

use common::{create_test_target, interval_params, TestHarness};
use serde_json::json;
use server_core::common::ApiError;
use server_core::domains::control_plane::{self, CreateTargetRequest};
use server_core::domains::schedules::ScheduleVariant;
use server_core::domains::targets::{HttpMethod, UpdateTargetParams};
use test_context::test_context;

#[test_context(TestHarness)]
#[tokio::test]
async fn create_get_update_delete_target_round_trip(ctx: &TestHarness) {
    let target = create_test_target(&ctx.deps, "https://api.example.com/health").await;
    assert_eq!(target.name, "test target");

    let fetched = control_plane::get_target(target.id, &ctx.deps).await.unwrap();
    assert_eq!(fetched.id, target.id);

    let params = UpdateTargetParams {
        name: Some("renamed".to_string()),
        ..Default::default()
    };
    let updated = control_plane::update_target(target.id, None, params, &ctx.deps).await.unwrap();
    assert_eq!(updated.name, "renamed");

    control_plane::delete_target(target.id, &ctx.deps).await.unwrap();

    let result = control_plane::get_target(target.id, &ctx.deps).await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn create_target_rejects_bad_url(ctx: &TestHarness) {
    let req = CreateTargetRequest {
        name: "bad".to_string(),
        url: "http://localhost/no-dot".to_string(),
        method: HttpMethod::Get,
        headers: Default::default(),
        body: None,
        timeout_seconds: None,
        retry_count: None,
        retry_delay_seconds: None,
        follow_redirects: None,
    };
    let result = control_plane::create_target(req, &ctx.deps).await;
    assert!(matches!(result, Err(ApiError::Validation(_))));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn update_target_rejects_out_of_range_retry_count(ctx: &TestHarness) {
    let target = create_test_target(&ctx.deps, "https://api.example.com/retry").await;

    let params = UpdateTargetParams {
        retry_count: Some(500),
        ..Default::default()
    };
    let result = control_plane::update_target(target.id, None, params, &ctx.deps).await;
    assert!(matches!(result, Err(ApiError::Validation(_))));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn create_paused_schedule_skips_workflow_start(ctx: &TestHarness) {
    let target = create_test_target(&ctx.deps, "https://api.example.com/ping").await;
    let params = interval_params(target.id, 60, true);

    let schedule = control_plane::create_schedule(params, &ctx.deps).await.unwrap();
    assert!(schedule.paused());
    assert_eq!(schedule.workflow_handle(), None);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn create_unpaused_schedule_surfaces_unreachable_substrate(ctx: &TestHarness) {
    let target = create_test_target(&ctx.deps, "https://api.example.com/ping").await;
    let params = interval_params(target.id, 60, false);

    let result = control_plane::create_schedule(params, &ctx.deps).await;
    assert!(matches!(result, Err(ApiError::Workflow(_))));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn pause_is_idempotent_and_clears_workflow_handle(ctx: &TestHarness) {
    let target = create_test_target(&ctx.deps, "https://api.example.com/ping").await;
    let params = interval_params(target.id, 60, true);
    let schedule = control_plane::create_schedule(params, &ctx.deps).await.unwrap();

    let paused_once = control_plane::pause_schedule(schedule.id(), &ctx.deps).await.unwrap();
    let paused_twice = control_plane::pause_schedule(schedule.id(), &ctx.deps).await.unwrap();

    assert!(paused_once.paused());
    assert!(paused_twice.paused());
    assert_eq!(paused_once.workflow_handle(), None);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn update_schedule_interval_does_not_touch_pause_state(ctx: &TestHarness) {
    let target = create_test_target(&ctx.deps, "https://api.example.com/ping").await;
    let params = interval_params(target.id, 60, true);
    let schedule = control_plane::create_schedule(params, &ctx.deps).await.unwrap();

    let updated = control_plane::update_schedule(schedule.id(), 120, &ctx.deps).await.unwrap();
    assert_eq!(updated.interval_seconds(), 120);
    assert!(updated.paused());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn delete_target_cascades_paused_schedules(ctx: &TestHarness) {
    let target = create_test_target(&ctx.deps, "https://api.example.com/ping").await;
    let params = interval_params(target.id, 60, true);
    let schedule = control_plane::create_schedule(params, &ctx.deps).await.unwrap();

    control_plane::delete_target(target.id, &ctx.deps).await.unwrap();

    let result = control_plane::get_schedule(schedule.id(), &ctx.deps).await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn create_window_schedule_selects_window_variant(ctx: &TestHarness) {
    let target = create_test_target(&ctx.deps, "https://api.example.com/ping").await;
    let params = common::window_params(target.id, 10, 25);

    let schedule = control_plane::create_schedule(params, &ctx.deps).await.unwrap();
    assert!(matches!(schedule, ScheduleVariant::Window(_)));
    assert_eq!(schedule.duration_seconds(), Some(25));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn update_target_body_can_be_cleared_explicitly(ctx: &TestHarness) {
    let req = CreateTargetRequest {
        name: "with body".to_string(),
        url: "https://api.example.com/submit".to_string(),
        method: HttpMethod::Post,
        headers: Default::default(),
        body: Some(json!({"k": "v"})),
        timeout_seconds: None,
        retry_count: None,
        retry_delay_seconds: None,
        follow_redirects: None,
    };
    let target = control_plane::create_target(req, &ctx.deps).await.unwrap();
    assert!(target.body.is_some());

    let params = UpdateTargetParams {
        body: Some(None),
        ..Default::default()
    };
    let updated = control_plane::update_target(target.id, None, params, &ctx.deps).await.unwrap();
    assert_eq!(updated.body, None);
}
