//! HTTP Query API server — axum router over the Control Plane.

use anyhow::{Context, Result};
use server_core::kernel::AppDeps;
use server_core::server::build_app;
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
                .unwrap_or_else(|_| "info,server_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting probe scheduler API");

    let config = Config::from_env().context("failed to load configuration")?;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .max_lifetime(Duration::from_secs(config.db_max_lifetime_seconds))
        .test_before_acquire(true)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    tracing::info!("Database connected");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;
    tracing::info!("Migrations complete");

    let workflow_client = WorkflowClient::new(config.restate_ingress_url.clone(), config.restate_admin_url.clone());
    let deps = AppDeps::new(pool, workflow_client);

    let app = build_app(deps, Vec::new());

    let addr = format!("0.0.0.0:{}", config.server_port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("failed to bind to address")?;

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
