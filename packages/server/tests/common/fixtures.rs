//! Shared fixtures for building Targets and Schedules in integration tests.

use server_core::domains::control_plane::{self, CreateTargetRequest};
use server_core::domains::schedules::CreateScheduleParams;
use server_core::domains::targets::{HttpMethod, Target};
use server_core::kernel::AppDeps;

pub async fn create_test_target(deps: &AppDeps, url: &str) -> Target {
    let req = CreateTargetRequest {
        name: "test target".to_string(),
        url: url.to_string(),
        method: HttpMethod::Get,
        headers: Default::default(),
        body: None,
        timeout_seconds: None,
        retry_count: None,
        retry_delay_seconds: None,
        follow_redirects: None,
    };
    control_plane::create_target(req, deps)
        .await
        .expect("failed to create test target")
}

pub fn interval_params(target_id: server_core::common::TargetId, interval_seconds: i64, paused: bool) -> CreateScheduleParams {
    CreateScheduleParams {
        name: "test schedule".to_string(),
        target_id,
        interval_seconds,
        duration_seconds: None,
        paused,
    }
}

pub fn window_params(
    target_id: server_core::common::TargetId,
    interval_seconds: i64,
    duration_seconds: i64,
) -> CreateScheduleParams {
    CreateScheduleParams {
        name: "test window schedule".to_string(),
        target_id,
        interval_seconds,
        duration_seconds: Some(duration_seconds),
        paused: true,
    }
}
