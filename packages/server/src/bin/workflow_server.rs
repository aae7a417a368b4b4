//! Restate Workflow Server
//!
//! This binary runs the Restate workflow HTTP server that hosts the
//! durable probe-schedule workflows. It connects to the same database as
//! the query API but does not run migrations — `server` owns the schema.

use anyhow::{Context, Result};
use restate_sdk::prelude::*;
use server_core::domains::workflows::{IntervalScheduleWorkflowImpl, WindowScheduleWorkflowImpl};
use server_core::kernel::AppDeps;
use server_core::workflows_client::WorkflowClient;
use server_core::Config;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,restate_sdk=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting Restate workflow server");

    let config = Config::from_env().context("failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .max_lifetime(Duration::from_secs(config.db_max_lifetime_seconds))
        .test_before_acquire(true)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    let workflow_client = WorkflowClient::new(config.restate_ingress_url.clone(), config.restate_admin_url.clone());
    let deps = std::sync::Arc::new(AppDeps::new(pool, workflow_client));

    let addr = format!("0.0.0.0:{}", config.workflow_server_port);
    tracing::info!("Workflow server listening on {}", addr);

    let mut builder = Endpoint::builder();

    if let Some(identity_key) = &config.restate_identity_key {
        tracing::info!("Restate identity key configured");
        builder = builder
            .identity_key(identity_key)
            .context("invalid Restate identity key")?;
    }

    let endpoint = builder
        .bind(IntervalScheduleWorkflowImpl::with_deps(deps.clone()).serve())
        .bind(WindowScheduleWorkflowImpl::with_deps(deps.clone()).serve())
        .build();

    HttpServer::new(endpoint).listen_and_serve(addr.parse()?).await;

    Ok(())
}
