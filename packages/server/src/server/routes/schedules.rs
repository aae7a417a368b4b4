use axum::extract::{Extension, Path};
use axum::Json;
use serde::Deserialize;

use crate::common::{ApiError, ApiResponse, ScheduleId, TargetId};
use crate::domains::control_plane;
use crate::domains::schedules::{CreateScheduleParams, ScheduleVariant};
use crate::server::app::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateScheduleRequest {
    pub name: String,
    pub target_id: TargetId,
    pub interval_seconds: i64,
    pub duration_seconds: Option<i64>,
    #[serde(default)]
    pub paused: bool,
}

pub async fn create_schedule_handler(
    Extension(deps): Extension<AppState>,
    Json(req): Json<CreateScheduleRequest>,
) -> Result<(axum::http::StatusCode, ApiResponse<ScheduleVariant>), ApiError> {
    let params = CreateScheduleParams {
        name: req.name,
        target_id: req.target_id,
        interval_seconds: req.interval_seconds,
        duration_seconds: req.duration_seconds,
        paused: req.paused,
    };
    let schedule = control_plane::create_schedule(params, &deps).await?;
    Ok(ApiResponse::created(schedule))
}

pub async fn get_schedule_handler(
    Extension(deps): Extension<AppState>,
    Path(id): Path<ScheduleId>,
) -> Result<ApiResponse<ScheduleVariant>, ApiError> {
    let schedule = control_plane::get_schedule(id, &deps).await?;
    Ok(ApiResponse::ok(schedule))
}

#[derive(Debug, Deserialize)]
pub struct UpdateScheduleRequest {
    pub interval_seconds: i64,
}

pub async fn update_schedule_handler(
    Extension(deps): Extension<AppState>,
    Path(id): Path<ScheduleId>,
    Json(req): Json<UpdateScheduleRequest>,
) -> Result<ApiResponse<ScheduleVariant>, ApiError> {
    let schedule = control_plane::update_schedule(id, req.interval_seconds, &deps).await?;
    Ok(ApiResponse::ok(schedule))
}

pub async fn pause_schedule_handler(
    Extension(deps): Extension<AppState>,
    Path(id): Path<ScheduleId>,
) -> Result<ApiResponse<ScheduleVariant>, ApiError> {
    let schedule = control_plane::pause_schedule(id, &deps).await?;
    Ok(ApiResponse::ok(schedule))
}

pub async fn resume_schedule_handler(
    Extension(deps): Extension<AppState>,
    Path(id): Path<ScheduleId>,
) -> Result<ApiResponse<ScheduleVariant>, ApiError> {
    let schedule = control_plane::resume_schedule(id, &deps).await?;
    Ok(ApiResponse::ok(schedule))
}

pub async fn delete_schedule_handler(
    Extension(deps): Extension<AppState>,
    Path(id): Path<ScheduleId>,
) -> Result<ApiResponse<()>, ApiError> {
    control_plane::delete_schedule(id, &deps).await?;
    Ok(ApiResponse::ok(()))
}
