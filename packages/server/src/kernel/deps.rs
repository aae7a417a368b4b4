//! Server dependencies
//!
//! This module provides the central dependency container threaded through
//! both the HTTP Query API (as an axum `Extension`) and the Restate service
//! implementations (via `XImpl::with_deps`), in place of global state.

use sqlx::PgPool;

use crate::workflows_client::WorkflowClient;

/// Dependencies shared across the API server and the workflow server.
#[derive(Clone)]
pub struct AppDeps {
    pub db_pool: PgPool,
    pub workflow_client: WorkflowClient,
}

impl AppDeps {
    pub fn new(db_pool: PgPool, workflow_client: WorkflowClient) -> Self {
        Self {
            db_pool,
            workflow_client,
        }
    }
}
