//! Control Plane — create/update/pause/resume/delete operations over
//! Targets and Schedules. Mutates Postgres rows and reconciles workflow
//! state on the Restate substrate via `WorkflowClient`; never imports
//! workflow code directly.

use anyhow::Result;
use serde::Deserialize;

use crate::common::{ApiError, ScheduleId, TargetId};
use crate::domains::schedules::{
    find_schedule_variant, workflow_handle_for, CreateScheduleParams, IntervalSchedule, ScheduleVariant,
    WindowSchedule,
};
use crate::domains::targets::{CreateTargetParams, Target, UpdateTargetParams};
use crate::domains::urls::Url;
use crate::domains::workflows::ScheduleWorkflowRequest;
use crate::kernel::AppDeps;
use crate::workflows_client::WorkflowState;

#[derive(Debug, Deserialize)]
pub struct CreateTargetRequest {
    pub name: String,
    pub url: String,
    pub method: crate::domains::targets::HttpMethod,
    #[serde(default)]
    pub headers: std::collections::HashMap<String, String>,
    #[serde(default)]
    pub body: Option<serde_json::Value>,
    pub timeout_seconds: Option<i32>,
    pub retry_count: Option<i32>,
    pub retry_delay_seconds: Option<i32>,
    pub follow_redirects: Option<bool>,
}

/// Creates the URL and Target rows atomically.
pub async fn create_target(req: CreateTargetRequest, deps: &AppDeps) -> Result<Target, ApiError> {
    let parsed = Url::parse(&req.url).map_err(|e| ApiError::Validation(e.to_string()))?;

    let mut tx = deps.db_pool.begin().await.map_err(ApiError::Database)?;
    let url = sqlx::query_as::<_, Url>(
        r#"
        INSERT INTO urls (scheme, netloc, path, params, query, fragment)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(&parsed.scheme)
    .bind(&parsed.netloc)
    .bind(&parsed.path)
    .bind(&parsed.params)
    .bind(&parsed.query)
    .bind(&parsed.fragment)
    .fetch_one(&mut *tx)
    .await
    .map_err(ApiError::Database)?;

    use crate::domains::targets::{DEFAULT_RETRY_COUNT, DEFAULT_RETRY_DELAY_SECONDS, DEFAULT_TIMEOUT_SECONDS};

    let params = CreateTargetParams::builder()
        .name(req.name)
        .url_id(url.id)
        .method(req.method)
        .headers(req.headers)
        .body(req.body)
        .timeout_seconds(req.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
        .retry_count(req.retry_count.unwrap_or(DEFAULT_RETRY_COUNT))
        .retry_delay_seconds(req.retry_delay_seconds.unwrap_or(DEFAULT_RETRY_DELAY_SECONDS))
        .follow_redirects(req.follow_redirects.unwrap_or(true))
        .build();
    params.validate().map_err(|e| ApiError::Validation(e.to_string()))?;

    let target = sqlx::query_as::<_, Target>(
        r#"
        INSERT INTO targets (
            name, url_id, method, headers, body,
            timeout_seconds, retry_count, retry_delay_seconds, follow_redirects
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(&params.name)
    .bind(params.url_id)
    .bind(params.method)
    .bind(sqlx::types::Json(&params.headers))
    .bind(&params.body)
    .bind(params.timeout_seconds)
    .bind(params.retry_count)
    .bind(params.retry_delay_seconds)
    .bind(params.follow_redirects)
    .fetch_one(&mut *tx)
    .await
    .map_err(ApiError::Database)?;

    tx.commit().await.map_err(ApiError::Database)?;
    Ok(target)
}

pub async fn get_target(id: TargetId, deps: &AppDeps) -> Result<Target, ApiError> {
    Target::find_by_id(id, &deps.db_pool)
        .await
        .map_err(|e| classify_read_error(e, "target", id.to_string()))
}

/// Replaces the Target's URL row (discarding the old one) and updates its
/// other fields. Does not touch Schedules or running workflows.
pub async fn update_target(
    id: TargetId,
    new_url: Option<String>,
    mut params: UpdateTargetParams,
    deps: &AppDeps,
) -> Result<Target, ApiError> {
    params.validate().map_err(|e| ApiError::Validation(e.to_string()))?;

    if let Some(raw_url) = new_url {
        let parsed = Url::parse(&raw_url).map_err(|e| ApiError::Validation(e.to_string()))?;
        let url = Url::create(&parsed, &deps.db_pool).await.map_err(ApiError::Workflow)?;
        params.url_id = Some(url.id);
    }

    Target::update(id, &params, &deps.db_pool)
        .await
        .map_err(|e| classify_write_error(e, "target", id.to_string()))
}

/// Cascade-deletes every schedule for this target (each via
/// `delete_schedule` to guarantee workflow termination), then the Target
/// row, then its URL.
pub async fn delete_target(id: TargetId, deps: &AppDeps) -> Result<(), ApiError> {
    let target = get_target(id, deps).await?;

    let interval_ids = IntervalSchedule::delete_for_target(id, &deps.db_pool)
        .await
        .map_err(ApiError::Workflow)?;
    for schedule_id in interval_ids {
        terminate_and_purge_runs(schedule_id, "IntervalScheduleWorkflow", deps).await?;
    }

    let window_ids = WindowSchedule::delete_for_target(id, &deps.db_pool)
        .await
        .map_err(ApiError::Workflow)?;
    for schedule_id in window_ids {
        terminate_and_purge_runs(schedule_id, "WindowScheduleWorkflow", deps).await?;
    }

    Target::delete(id, &deps.db_pool).await.map_err(ApiError::Workflow)?;
    Url::delete(target.url_id, &deps.db_pool).await.map_err(ApiError::Workflow)?;
    Ok(())
}

async fn terminate_and_purge_runs(schedule_id: ScheduleId, service_name: &str, deps: &AppDeps) -> Result<(), ApiError> {
    let handle = workflow_handle_for(schedule_id);
    let _ = deps.workflow_client.terminate_workflow(service_name, &handle).await;
    sqlx::query("DELETE FROM jobs WHERE schedule_id = $1")
        .bind(schedule_id)
        .execute(&deps.db_pool)
        .await
        .map_err(ApiError::Database)?;
    Ok(())
}

/// Creates a Schedule row (Interval if `duration_seconds` is absent, Window
/// if present) and, unless created paused, starts its workflow.
pub async fn create_schedule(params: CreateScheduleParams, deps: &AppDeps) -> Result<ScheduleVariant, ApiError> {
    params.validate().map_err(|e| ApiError::Validation(e.to_string()))?;

    let variant = match params.duration_seconds {
        Some(duration_seconds) => {
            let row = WindowSchedule::create(&params, duration_seconds, &deps.db_pool)
                .await
                .map_err(ApiError::Workflow)?;
            ScheduleVariant::Window(row)
        }
        None => {
            let row = IntervalSchedule::create(&params, &deps.db_pool)
                .await
                .map_err(ApiError::Workflow)?;
            ScheduleVariant::Interval(row)
        }
    };

    if variant.paused() {
        return Ok(variant);
    }

    start_workflow(&variant, deps).await?;
    get_schedule(variant.id(), deps).await
}

async fn start_workflow(variant: &ScheduleVariant, deps: &AppDeps) -> Result<(), ApiError> {
    let handle = workflow_handle_for(variant.id());
    let service_name = variant.workflow_service_name();
    let request = ScheduleWorkflowRequest { schedule_id: variant.id() };

    deps.workflow_client
        .start_workflow(service_name, &handle, "run", request)
        .await
        .map_err(ApiError::Workflow)?;

    set_workflow_handle(variant, Some(&handle), false, deps).await
}

async fn set_workflow_handle(
    variant: &ScheduleVariant,
    handle: Option<&str>,
    paused: bool,
    deps: &AppDeps,
) -> Result<(), ApiError> {
    match variant {
        ScheduleVariant::Interval(s) => {
            IntervalSchedule::set_paused_and_handle(s.id, paused, handle, &deps.db_pool)
                .await
                .map_err(ApiError::Workflow)?;
        }
        ScheduleVariant::Window(s) => {
            WindowSchedule::set_paused_and_handle(s.id, paused, handle, &deps.db_pool)
                .await
                .map_err(ApiError::Workflow)?;
        }
    }
    Ok(())
}

pub async fn get_schedule(id: ScheduleId, deps: &AppDeps) -> Result<ScheduleVariant, ApiError> {
    find_schedule_variant(id, &deps.db_pool)
        .await
        .map_err(ApiError::Workflow)?
        .ok_or_else(|| ApiError::NotFound(format!("schedule {} not found", id)))
}

/// Mutates `interval_seconds` without restarting the workflow — the running
/// loop re-fetches on its next tick and observes the new value.
pub async fn update_schedule(id: ScheduleId, interval_seconds: i64, deps: &AppDeps) -> Result<ScheduleVariant, ApiError> {
    if interval_seconds <= 0 {
        return Err(ApiError::Validation("interval_seconds must be > 0".to_string()));
    }

    let variant = get_schedule(id, deps).await?;
    match variant {
        ScheduleVariant::Interval(_) => {
            IntervalSchedule::set_interval_seconds(id, interval_seconds, &deps.db_pool)
                .await
                .map_err(ApiError::Workflow)?;
        }
        ScheduleVariant::Window(_) => {
            WindowSchedule::set_interval_seconds(id, interval_seconds, &deps.db_pool)
                .await
                .map_err(ApiError::Workflow)?;
        }
    }
    get_schedule(id, deps).await
}

/// Terminates the workflow (best-effort) and marks the schedule paused with
/// no handle. Idempotent: pausing an already-paused schedule is a no-op
/// beyond the write.
pub async fn pause_schedule(id: ScheduleId, deps: &AppDeps) -> Result<ScheduleVariant, ApiError> {
    let variant = get_schedule(id, deps).await?;
    let service_name = variant.workflow_service_name();

    if let Some(handle) = variant.workflow_handle() {
        let _ = deps.workflow_client.terminate_workflow(service_name, handle).await;
    }

    set_workflow_handle(&variant, None, true, deps).await?;
    get_schedule(id, deps).await
}

/// Marks the schedule running. If a stored handle still describes an
/// active workflow, leaves it; otherwise starts a fresh one.
pub async fn resume_schedule(id: ScheduleId, deps: &AppDeps) -> Result<ScheduleVariant, ApiError> {
    let variant = get_schedule(id, deps).await?;
    let service_name = variant.workflow_service_name();
    let handle = workflow_handle_for(id);

    let needs_start = match deps.workflow_client.describe_workflow(service_name, &handle).await {
        Ok(WorkflowState::Running) => false,
        Ok(WorkflowState::Completed) | Ok(WorkflowState::Absent) | Err(_) => true,
    };

    if needs_start {
        let request = ScheduleWorkflowRequest { schedule_id: id };
        deps.workflow_client
            .start_workflow(service_name, &handle, "run", request)
            .await
            .map_err(ApiError::Workflow)?;
    }

    set_workflow_handle(&variant, Some(&handle), false, deps).await?;
    get_schedule(id, deps).await
}

/// Terminates the workflow (best-effort), cascade-deletes Runs/Attempts,
/// then the Schedule row.
pub async fn delete_schedule(id: ScheduleId, deps: &AppDeps) -> Result<(), ApiError> {
    let variant = get_schedule(id, deps).await?;
    let service_name = variant.workflow_service_name();

    if let Some(handle) = variant.workflow_handle() {
        let _ = deps.workflow_client.terminate_workflow(service_name, handle).await;
    }

    sqlx::query("DELETE FROM jobs WHERE schedule_id = $1")
        .bind(id)
        .execute(&deps.db_pool)
        .await
        .map_err(ApiError::Database)?;

    match variant {
        ScheduleVariant::Interval(s) => IntervalSchedule::delete(s.id, &deps.db_pool).await.map_err(ApiError::Database)?,
        ScheduleVariant::Window(s) => WindowSchedule::delete(s.id, &deps.db_pool).await.map_err(ApiError::Database)?,
    }

    Ok(())
}

fn classify_write_error(err: anyhow::Error, entity: &str, id: String) -> ApiError {
    classify_read_error(err, entity, id)
}

fn classify_read_error(err: anyhow::Error, entity: &str, id: String) -> ApiError {
    match err.downcast::<sqlx::Error>() {
        Ok(sqlx::Error::RowNotFound) => ApiError::NotFound(format!("{} {} not found", entity, id)),
        Ok(other) => ApiError::Database(other),
        Err(other) => ApiError::Workflow(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_row_not_found_as_not_found() {
        let err = classify_write_error(sqlx::Error::RowNotFound.into(), "target", "x".to_string());
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
