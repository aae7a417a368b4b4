//! Restate workflow client
//!
//! HTTP client the Control Plane uses to start, describe, and terminate
//! schedule workflows without linking against workflow code directly. The
//! API server and the workflow server (`bin/workflow_server.rs`) are
//! separate processes; this is the only bridge between them.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// Client for invoking Restate services and workflows over HTTP.
#[derive(Clone)]
pub struct WorkflowClient {
    ingress_url: String,
    admin_url: String,
    http_client: Arc<reqwest::Client>,
}

/// Current state of a workflow invocation, as reported by the substrate's
/// introspection API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    Running,
    Completed,
    Absent,
}

impl WorkflowClient {
    pub fn new(ingress_url: impl Into<String>, admin_url: impl Into<String>) -> Self {
        Self {
            ingress_url: ingress_url.into(),
            admin_url: admin_url.into(),
            http_client: Arc::new(reqwest::Client::new()),
        }
    }

    /// Start a workflow, keyed by `workflow_key` (the schedule's
    /// `workflow_handle`, e.g. `"schedule-<uuid>"`), without waiting for it
    /// to complete.
    pub async fn start_workflow<Req>(
        &self,
        service_name: &str,
        workflow_key: &str,
        handler_name: &str,
        request: Req,
    ) -> Result<()>
    where
        Req: Serialize,
    {
        let url = format!(
            "{}/{}/{}/{}/send",
            self.ingress_url, service_name, workflow_key, handler_name
        );

        tracing::info!(service = service_name, key = workflow_key, "starting workflow");

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("failed to start workflow")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            anyhow::bail!("failed to start workflow ({}): {}", status, body);
        }

        Ok(())
    }

    /// Invoke a workflow handler and wait for its result.
    pub async fn invoke<Req, Res>(
        &self,
        service_name: &str,
        workflow_key: &str,
        handler_name: &str,
        request: Req,
    ) -> Result<Res>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let url = format!(
            "{}/{}/{}/{}",
            self.ingress_url, service_name, workflow_key, handler_name
        );

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("failed to invoke workflow")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            anyhow::bail!("workflow invocation failed ({}): {}", status, body);
        }

        response.json().await.context("failed to deserialize workflow response")
    }

    /// Best-effort termination of a running workflow invocation. Returns
    /// `Ok(())` even if the handle does not exist — pause/delete must
    /// proceed to mutate the database regardless of substrate state.
    pub async fn terminate_workflow(&self, service_name: &str, workflow_key: &str) -> Result<()> {
        let invocation_id = match self.find_invocation_id(service_name, workflow_key).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                tracing::debug!(service = service_name, key = workflow_key, "no invocation to terminate");
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to look up invocation for termination, swallowing");
                return Ok(());
            }
        };

        let url = format!("{}/invocations/{}/kill", self.admin_url, invocation_id);
        match self.http_client.delete(&url).send().await {
            Ok(resp) if resp.status().is_success() || resp.status().as_u16() == 404 => Ok(()),
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "terminate request rejected, swallowing");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "terminate request failed, swallowing");
                Ok(())
            }
        }
    }

    /// Describe whether a workflow handle is currently active on the
    /// substrate, via a SQL query against Restate's `sys_invocation`
    /// introspection table.
    pub async fn describe_workflow(&self, service_name: &str, workflow_key: &str) -> Result<WorkflowState> {
        match self.find_invocation_id(service_name, workflow_key).await? {
            Some(_) => Ok(WorkflowState::Running),
            None => Ok(WorkflowState::Absent),
        }
    }

    async fn find_invocation_id(&self, service_name: &str, workflow_key: &str) -> Result<Option<String>> {
        let sql = format!(
            "SELECT id FROM sys_invocation WHERE target_service_name = '{}' AND target_service_key = '{}' AND status NOT IN ('completed', 'killed') LIMIT 1",
            service_name, workflow_key
        );

        let response = self
            .http_client
            .post(format!("{}/query", self.admin_url))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({ "query": sql }))
            .send()
            .await
            .context("failed to query restate introspection api")?;

        if !response.status().is_success() {
            anyhow::bail!("introspection query failed: {}", response.status());
        }

        #[derive(serde::Deserialize)]
        struct Row {
            id: Option<String>,
        }
        #[derive(serde::Deserialize)]
        struct QueryResponse {
            rows: Vec<Row>,
        }

        let parsed: QueryResponse = response.json().await.context("failed to parse introspection response")?;
        Ok(parsed.rows.into_iter().next().and_then(|r| r.id))
    }
}
