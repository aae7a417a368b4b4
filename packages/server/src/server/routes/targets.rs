use axum::extract::{Extension, Path};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::common::{ApiError, ApiResponse, TargetId};
use crate::domains::control_plane::{self, CreateTargetRequest};
use crate::domains::targets::{HttpMethod, Target, UpdateTargetParams};
use crate::server::app::AppState;

pub async fn create_target_handler(
    Extension(deps): Extension<AppState>,
    Json(req): Json<CreateTargetRequest>,
) -> Result<(axum::http::StatusCode, ApiResponse<Target>), ApiError> {
    let target = control_plane::create_target(req, &deps).await?;
    Ok(ApiResponse::created(target))
}

pub async fn get_target_handler(
    Extension(deps): Extension<AppState>,
    Path(id): Path<TargetId>,
) -> Result<ApiResponse<Target>, ApiError> {
    let target = control_plane::get_target(id, &deps).await?;
    Ok(ApiResponse::ok(target))
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateTargetRequest {
    pub name: Option<String>,
    pub url: Option<String>,
    pub method: Option<HttpMethod>,
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<Option<Value>>,
    pub timeout_seconds: Option<i32>,
    pub retry_count: Option<i32>,
    pub retry_delay_seconds: Option<i32>,
    pub follow_redirects: Option<bool>,
}

pub async fn update_target_handler(
    Extension(deps): Extension<AppState>,
    Path(id): Path<TargetId>,
    Json(req): Json<UpdateTargetRequest>,
) -> Result<ApiResponse<Target>, ApiError> {
    let params = UpdateTargetParams {
        name: req.name,
        url_id: None,
        method: req.method,
        headers: req.headers,
        body: req.body,
        timeout_seconds: req.timeout_seconds,
        retry_count: req.retry_count,
        retry_delay_seconds: req.retry_delay_seconds,
        follow_redirects: req.follow_redirects,
    };
    let target = control_plane::update_target(id, req.url, params, &deps).await?;
    Ok(ApiResponse::ok(target))
}

pub async fn delete_target_handler(
    Extension(deps): Extension<AppState>,
    Path(id): Path<TargetId>,
) -> Result<ApiResponse<()>, ApiError> {
    control_plane::delete_target(id, &deps).await?;
    Ok(ApiResponse::ok(()))
}
