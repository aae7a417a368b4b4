//! Test harness with testcontainers for integration testing.
//!
//! Starts a Postgres container once and reuses it across all tests in the
//! process; each test gets its own connection pool and runs against the
//! shared, migrated schema.

use anyhow::{Context, Result};
use server_core::kernel::AppDeps;
use server_core::workflows_client::WorkflowClient;
use sqlx::PgPool;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use testcontainers::ContainerAsync;
use tokio::sync::OnceCell;

struct SharedTestInfra {
    db_url: String,
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default()
            .start()
            .await
            .context("failed to start Postgres container")?;

        let host = postgres.get_host().await?;
        let port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

        let pool = PgPool::connect(&db_url)
            .await
            .context("failed to connect to Postgres for migrations")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run migrations")?;

        Ok(Self { db_url, _postgres: postgres })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async { Self::init().await.expect("failed to initialize shared test infrastructure") })
            .await
    }
}

/// Test harness wrapping a connection pool against the shared container.
pub struct TestHarness {
    pub deps: AppDeps,
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        let infra = SharedTestInfra::get().await;
        let db_pool = PgPool::connect(&infra.db_url)
            .await
            .context("failed to connect to test database")?;

        // No real Restate deployment runs alongside these tests; the
        // ingress/admin URLs are unreachable placeholders. Control Plane
        // tests exercise paths that swallow workflow-substrate errors
        // (pause/delete) or assert on the error itself (create).
        let workflow_client = WorkflowClient::new("http://127.0.0.1:0", "http://127.0.0.1:0");

        Ok(Self {
            deps: AppDeps::new(db_pool, workflow_client),
        })
    }
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("failed to create test harness")
    }

    async fn teardown(self) {
        self.deps.db_pool.close().await;
    }
}
