//! Window schedule workflow — probes a target on a fixed cadence for a
//! bounded duration, then exits.

use chrono::{DateTime, Utc};
use restate_sdk::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::common::EmptyRequest;
use crate::domains::probe::{execute_probe, ProbeInput};
use crate::domains::workflows::activities::{fetch_schedule, record_run, FetchOutcome};
use crate::domains::workflows::interval::{ScheduleWorkflowRequest, ScheduleWorkflowResult};
use crate::impl_restate_serde;
use crate::kernel::AppDeps;

/// Start-to-close budget for the Fetch and Record activities.
const METADATA_ACTIVITY_TIMEOUT: Duration = Duration::from_secs(10);

/// Start-to-close budget for the Probe activity: the worst case the retry
/// loop inside `execute_probe` could take, plus a flat safety margin.
fn probe_activity_timeout(timeout_seconds: i32, retry_count: i32, retry_delay_seconds: i32) -> Duration {
    let envelope = timeout_seconds.max(0) as u64 * (retry_count.max(0) as u64 + 1)
        + retry_delay_seconds.max(0) as u64 * retry_count.max(0) as u64;
    Duration::from_secs(envelope + 60)
}

/// Durable-clock reading, wrapped so workflow code never touches wall-clock
/// time directly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Now(pub DateTime<Utc>);

impl_restate_serde!(Now);

#[restate_sdk::workflow]
#[name = "WindowScheduleWorkflow"]
pub trait WindowScheduleWorkflow {
    async fn run(req: ScheduleWorkflowRequest) -> Result<ScheduleWorkflowResult, HandlerError>;

    #[shared]
    async fn get_status(req: EmptyRequest) -> Result<String, HandlerError>;
}

pub struct WindowScheduleWorkflowImpl {
    deps: Arc<AppDeps>,
}

impl WindowScheduleWorkflowImpl {
    pub fn with_deps(deps: Arc<AppDeps>) -> Self {
        Self { deps }
    }
}

impl WindowScheduleWorkflow for WindowScheduleWorkflowImpl {
    async fn run(
        &self,
        ctx: WorkflowContext<'_>,
        req: ScheduleWorkflowRequest,
    ) -> Result<ScheduleWorkflowResult, HandlerError> {
        let schedule_id = req.schedule_id;
        ctx.set("status", "running".to_string());

        let initial = ctx
            .run(|| async {
                tokio::time::timeout(
                    METADATA_ACTIVITY_TIMEOUT,
                    fetch_schedule(schedule_id, &self.deps.db_pool),
                )
                .await
                .map_err(|_| anyhow::anyhow!("fetch activity exceeded {}s", METADATA_ACTIVITY_TIMEOUT.as_secs()))?
            })
            .await?;

        let first_snapshot = match initial {
            FetchOutcome::Deleted => {
                ctx.set("status", "deleted".to_string());
                return Ok(ScheduleWorkflowResult {
                    status: "deleted".to_string(),
                    run_count: 0,
                });
            }
            FetchOutcome::Paused => {
                ctx.set("status", "paused".to_string());
                return Ok(ScheduleWorkflowResult {
                    status: "paused".to_string(),
                    run_count: 0,
                });
            }
            FetchOutcome::Runnable(snapshot) => snapshot,
        };

        let duration_seconds = first_snapshot.duration_seconds.unwrap_or(0).max(0) as i64;

        let started_at = ctx.run(|| async { Ok(Now(Utc::now())) }).await?;
        let end_time = started_at.0 + chrono::Duration::seconds(duration_seconds);

        let mut run_number: i64 = 1;

        loop {
            let now = ctx.run(|| async { Ok(Now(Utc::now())) }).await?;
            if now.0 >= end_time {
                break;
            }

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
                    info!(%schedule_id, "schedule deleted mid-window, ending workflow");
                    ctx.set("status", "deleted".to_string());
                    return Ok(ScheduleWorkflowResult {
                        status: "deleted".to_string(),
                        run_count: run_number - 1,
                    });
                }
                FetchOutcome::Paused => {
                    // A pause mid-window ends the workflow rather than polling.
                    ctx.set("status", "paused".to_string());
                    return Ok(ScheduleWorkflowResult {
                        status: "paused".to_string(),
                        run_count: run_number - 1,
                    });
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

            let after_probe = ctx.run(|| async { Ok(Now(Utc::now())) }).await?;
            if after_probe.0 + chrono::Duration::seconds(snapshot.interval_seconds) >= end_time {
                break;
            }
            ctx.sleep(Duration::from_secs(snapshot.interval_seconds.max(0) as u64))
                .await?;
        }

        ctx.set("status", "completed".to_string());
        Ok(ScheduleWorkflowResult {
            status: "completed".to_string(),
            run_count: run_number - 1,
        })
    }

    async fn get_status(
        &self,
        ctx: SharedWorkflowContext<'_>,
        _req: EmptyRequest,
    ) -> Result<String, HandlerError> {
        Ok(ctx.get::<String>("status").await?.unwrap_or_else(|| "pending".to_string()))
    }
}
