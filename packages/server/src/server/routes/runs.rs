use axum::extract::{Extension, Path, Query};

use crate::common::{ApiError, ApiResponse, RunId};
use crate::domains::runs::{Attempt, Run, RunFilter, RunWithAttempts};
use crate::server::app::AppState;

pub async fn list_runs_handler(
    Extension(deps): Extension<AppState>,
    Query(filter): Query<RunFilter>,
) -> Result<ApiResponse<Vec<Run>>, ApiError> {
    let runs = match filter.schedule_id {
        Some(schedule_id) => Run::list_for_schedule(schedule_id, &filter, &deps.db_pool).await,
        None => Run::list_all(&filter, &deps.db_pool).await,
    }
    .map_err(ApiError::Workflow)?;
    Ok(ApiResponse::ok(runs))
}

pub async fn get_run_handler(
    Extension(deps): Extension<AppState>,
    Path(id): Path<RunId>,
) -> Result<ApiResponse<RunWithAttempts>, ApiError> {
    let run = Run::find_by_id(id, &deps.db_pool)
        .await
        .map_err(|_| ApiError::NotFound(format!("run {} not found", id)))?;
    let attempts: Vec<Attempt> = Attempt::list_for_run(id, &deps.db_pool)
        .await
        .map_err(ApiError::Workflow)?;
    Ok(ApiResponse::ok(RunWithAttempts { run, attempts }))
}
