use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_port: u16,
    pub workflow_server_port: u16,
    pub restate_ingress_url: String,
    pub restate_admin_url: String,
    pub db_max_connections: u32,
    pub db_max_lifetime_seconds: u64,
    pub restate_identity_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development); ignored if absent since
        // production deployments inject env vars directly.
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            workflow_server_port: env::var("WORKFLOW_SERVER_PORT")
                .unwrap_or_else(|_| "9080".to_string())
                .parse()
                .context("WORKFLOW_SERVER_PORT must be a valid port number")?,
            restate_ingress_url: env::var("RESTATE_INGRESS_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            restate_admin_url: env::var("RESTATE_ADMIN_URL")
                .unwrap_or_else(|_| "http://localhost:9070".to_string()),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("DB_MAX_CONNECTIONS must be a valid number")?,
            db_max_lifetime_seconds: env::var("DB_MAX_LIFETIME_SECONDS")
                .unwrap_or_else(|_| "1800".to_string())
                .parse()
                .context("DB_MAX_LIFETIME_SECONDS must be a valid number")?,
            restate_identity_key: env::var("RESTATE_IDENTITY_KEY").ok(),
        })
    }
}
