//! Interval schedule workflow — probes a target on a fixed cadence forever,
//! until the schedule is paused or deleted.

use restate_sdk::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::common::{EmptyRequest, ScheduleId};
use crate::domains::probe::{execute_probe, ProbeInput};
use crate::domains::workflows::activities::{fetch_schedule, record_run, FetchOutcome};
use crate::impl_restate_serde;
use crate::kernel::AppDeps;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleWorkflowRequest {
    pub schedule_id: ScheduleId,
}

impl_restate_serde!(ScheduleWorkflowRequest);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleWorkflowResult {
    pub status: String,
    pub run_count: i64,
}

impl_restate_serde!(ScheduleWorkflowResult);

const PAUSE_POLL_SECONDS: u64 = 30;

/// Start-to-close budget for the Fetch and Record activities.
const METADATA_ACTIVITY_TIMEOUT: Duration = Duration::from_secs(10);

/// Start-to-close budget for the Probe activity: the worst case the retry
/// loop inside `execute_probe` could take, plus a flat safety margin.
fn probe_activity_timeout(timeout_seconds: i32, retry_count: i32, retry_delay_seconds: i32) -> Duration {
    let envelope = timeout_seconds.max(0) as u64 * (retry_count.max(0) as u64 + 1)
        + retry_delay_seconds.max(0) as u64 * retry_count.max(0) as u64;
    Duration::from_secs(envelope + 60)
}

#[restate_sdk::workflow]
#[name = "IntervalScheduleWorkflow"]
pub trait IntervalScheduleWorkflow {
    async fn run(req: ScheduleWorkflowRequest) -> Result<ScheduleWorkflowResult, HandlerError>;

    #[shared]
    async fn get_status(req: EmptyRequest) -> Result<String, HandlerError>;
}

pub struct IntervalScheduleWorkflowImpl {
    deps: Arc<AppDeps>,
}

impl IntervalScheduleWorkflowImpl {
    pub fn with_deps(deps: Arc<AppDeps>) -> Self {
        Self { deps }
    }
}

impl IntervalScheduleWorkflow for IntervalScheduleWorkflowImpl {
    async fn run(
        &self,
        ctx: WorkflowContext<'_>,
        req: ScheduleWorkflowRequest,
    ) -> Result<ScheduleWorkflowResult, HandlerError> {
        let schedule_id = req.schedule_id;
        ctx.set("status", "running".to_string());

        let mut run_number: i64 = 1;

        loop {
            let fetched = ctx
                .run(|| async {
                    tokio::time::timeout(
                        METADATA_ACTIVITY_TIMEOUT,
                        fetch_schedule(schedule_id, &self.deps.db_pool),
                    )
                    .await
                    .map_err(|_| anyhow::anyhow!("fetch activity exceeded {}s", METADATA_ACTIVITY_TIMEOUT.as_secs()))?
                })
                .await?;

            let snapshot = match fetched {
                FetchOutcome::Deleted => {
                    info!(%schedule_id, "schedule deleted, ending workflow");
                    ctx.set("status", "deleted".to_string());
                    return Ok(ScheduleWorkflowResult {
                        status: "deleted".to_string(),
                        run_count: run_number - 1,
                    });
                }
                FetchOutcome::Paused => {
                    ctx.set("status", "paused".to_string());
                    ctx.sleep(Duration::from_secs(PAUSE_POLL_SECONDS)).await?;
                    continue;
                }
                FetchOutcome::Runnable(snapshot) => snapshot,
            };

            let probe_input = ProbeInput {
                url: snapshot.url.clone(),
                method: snapshot.method,
                headers: snapshot.headers.clone(),
                body: snapshot.body.clone(),
                timeout_seconds: snapshot.timeout_seconds,
                retry_count: snapshot.retry_count,
                retry_delay_seconds: snapshot.retry_delay_seconds,
                follow_redirects: snapshot.follow_redirects,
            };

            let probe_timeout = probe_activity_timeout(
                snapshot.timeout_seconds,
                snapshot.retry_count,
                snapshot.retry_delay_seconds,
            );
            let probe_result = ctx
                .run(|| async {
                    tokio::time::timeout(probe_timeout, execute_probe(&probe_input))
                        .await
                        .map_err(|_| anyhow::anyhow!("probe activity exceeded {}s", probe_timeout.as_secs()))
                })
                .await?;

            let current_run_number = run_number;
            ctx.run(|| async {
                tokio::time::timeout(
                    METADATA_ACTIVITY_TIMEOUT,
                    record_run(schedule_id, current_run_number, &probe_result, &self.deps.db_pool),
                )
                .await
                .map_err(|_| anyhow::anyhow!("record activity exceeded {}s", METADATA_ACTIVITY_TIMEOUT.as_secs()))?
                .map(|_| ())
            })
            .await?;

            ctx.set("status", format!("ran {} times", current_run_number));
            run_number += 1;

            ctx.sleep(Duration::from_secs(snapshot.interval_seconds.max(0) as u64))
                .await?;
        }
    }

    async fn get_status(
        &self,
        ctx: SharedWorkflowContext<'_>,
        _req: EmptyRequest,
    ) -> Result<String, HandlerError> {
        Ok(ctx.get::<String>("status").await?.unwrap_or_else(|| "pending".to_string()))
    }
}
