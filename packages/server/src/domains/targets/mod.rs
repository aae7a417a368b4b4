//! Targets — reusable HTTP request templates.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;
use typed_builder::TypedBuilder;

use crate::common::{TargetId, UrlId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "http_method", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl HttpMethod {
    /// GET/HEAD/DELETE/OPTIONS send `body` as query parameters; POST/PUT/PATCH
    /// send it as a JSON request body.
    pub fn sends_body_as_query(&self) -> bool {
        matches!(
            self,
            HttpMethod::Get | HttpMethod::Head | HttpMethod::Delete | HttpMethod::Options
        )
    }

    pub fn as_reqwest_method(&self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

pub const MIN_TIMEOUT_SECONDS: i32 = 1;
pub const MAX_TIMEOUT_SECONDS: i32 = 300;
pub const DEFAULT_TIMEOUT_SECONDS: i32 = 30;
pub const MAX_RETRY_COUNT: i32 = 10;
pub const DEFAULT_RETRY_COUNT: i32 = 0;
pub const MAX_RETRY_DELAY_SECONDS: i32 = 60;
pub const DEFAULT_RETRY_DELAY_SECONDS: i32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Target {
    pub id: TargetId,
    pub name: String,
    pub url_id: UrlId,
    pub method: HttpMethod,
    pub headers: sqlx::types::Json<HashMap<String, String>>,
    pub body: Option<Value>,
    pub timeout_seconds: i32,
    pub retry_count: i32,
    pub retry_delay_seconds: i32,
    pub follow_redirects: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct CreateTargetParams {
    pub name: String,
    pub url_id: UrlId,
    pub method: HttpMethod,
    #[builder(default)]
    pub headers: HashMap<String, String>,
    #[builder(default)]
    pub body: Option<Value>,
    #[builder(default = DEFAULT_TIMEOUT_SECONDS)]
    pub timeout_seconds: i32,
    #[builder(default = DEFAULT_RETRY_COUNT)]
    pub retry_count: i32,
    #[builder(default = DEFAULT_RETRY_DELAY_SECONDS)]
    pub retry_delay_seconds: i32,
    #[builder(default = true)]
    pub follow_redirects: bool,
}

impl CreateTargetParams {
    /// Validates the bounded fields against §3's data model ranges. Called
    /// from the Control Plane before any row is written.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_TIMEOUT_SECONDS..=MAX_TIMEOUT_SECONDS).contains(&self.timeout_seconds) {
            anyhow::bail!(
                "timeout_seconds must be between {} and {}",
                MIN_TIMEOUT_SECONDS,
                MAX_TIMEOUT_SECONDS
            );
        }
        if !(0..=MAX_RETRY_COUNT).contains(&self.retry_count) {
            anyhow::bail!("retry_count must be between 0 and {}", MAX_RETRY_COUNT);
        }
        if !(0..=MAX_RETRY_DELAY_SECONDS).contains(&self.retry_delay_seconds) {
            anyhow::bail!(
                "retry_delay_seconds must be between 0 and {}",
                MAX_RETRY_DELAY_SECONDS
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTargetParams {
    pub name: Option<String>,
    pub url_id: Option<UrlId>,
    pub method: Option<HttpMethod>,
    pub headers: Option<HashMap<String, String>>,
    pub body: Option<Option<Value>>,
    pub timeout_seconds: Option<i32>,
    pub retry_count: Option<i32>,
    pub retry_delay_seconds: Option<i32>,
    pub follow_redirects: Option<bool>,
}

impl UpdateTargetParams {
    /// Validates whichever bounded fields are present against §3's data
    /// model ranges. Fields left `None` keep the existing row's value and
    /// are not re-checked here.
    pub fn validate(&self) -> Result<()> {
        if let Some(timeout_seconds) = self.timeout_seconds {
            if !(MIN_TIMEOUT_SECONDS..=MAX_TIMEOUT_SECONDS).contains(&timeout_seconds) {
                anyhow::bail!(
                    "timeout_seconds must be between {} and {}",
                    MIN_TIMEOUT_SECONDS,
                    MAX_TIMEOUT_SECONDS
                );
            }
        }
        if let Some(retry_count) = self.retry_count {
            if !(0..=MAX_RETRY_COUNT).contains(&retry_count) {
                anyhow::bail!("retry_count must be between 0 and {}", MAX_RETRY_COUNT);
            }
        }
        if let Some(retry_delay_seconds) = self.retry_delay_seconds {
            if !(0..=MAX_RETRY_DELAY_SECONDS).contains(&retry_delay_seconds) {
                anyhow::bail!(
                    "retry_delay_seconds must be between 0 and {}",
                    MAX_RETRY_DELAY_SECONDS
                );
            }
        }
        Ok(())
    }
}

impl Target {
    pub async fn find_by_id(id: TargetId, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM targets WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn create(params: &CreateTargetParams, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
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
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn update(id: TargetId, params: &UpdateTargetParams, pool: &PgPool) -> Result<Self> {
        let existing = Self::find_by_id(id, pool).await?;

        let name = params.name.clone().unwrap_or(existing.name);
        let url_id = params.url_id.unwrap_or(existing.url_id);
        let method = params.method.unwrap_or(existing.method);
        let headers = params.headers.clone().unwrap_or(existing.headers.0);
        let body = params.body.clone().unwrap_or(existing.body);
        let timeout_seconds = params.timeout_seconds.unwrap_or(existing.timeout_seconds);
        let retry_count = params.retry_count.unwrap_or(existing.retry_count);
        let retry_delay_seconds = params
            .retry_delay_seconds
            .unwrap_or(existing.retry_delay_seconds);
        let follow_redirects = params.follow_redirects.unwrap_or(existing.follow_redirects);

        sqlx::query_as::<_, Self>(
            r#"
            UPDATE targets SET
                name = $2, url_id = $3, method = $4, headers = $5, body = $6,
                timeout_seconds = $7, retry_count = $8, retry_delay_seconds = $9,
                follow_redirects = $10, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&name)
        .bind(url_id)
        .bind(method)
        .bind(sqlx::types::Json(&headers))
        .bind(&body)
        .bind(timeout_seconds)
        .bind(retry_count)
        .bind(retry_delay_seconds)
        .bind(follow_redirects)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn delete(id: TargetId, pool: &PgPool) -> Result<()> {
        sqlx::query("DELETE FROM targets WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_sends_body_as_query() {
        assert!(HttpMethod::Get.sends_body_as_query());
        assert!(HttpMethod::Delete.sends_body_as_query());
    }

    #[test]
    fn post_sends_body_as_json() {
        assert!(!HttpMethod::Post.sends_body_as_query());
        assert!(!HttpMethod::Patch.sends_body_as_query());
    }

    #[test]
    fn validate_rejects_out_of_range_timeout() {
        let params = CreateTargetParams::builder()
            .name("bad")
            .url_id(UrlId::new())
            .method(HttpMethod::Get)
            .timeout_seconds(0)
            .build();
        assert!(params.validate().is_err());
    }

    #[test]
    fn validate_accepts_defaults() {
        let params = CreateTargetParams::builder()
            .name("ok")
            .url_id(UrlId::new())
            .method(HttpMethod::Get)
            .build();
        assert!(params.validate().is_ok());
    }

    #[test]
    fn update_validate_ignores_absent_fields() {
        let params = UpdateTargetParams::default();
        assert!(params.validate().is_ok());
    }

    #[test]
    fn update_validate_rejects_out_of_range_retry_count() {
        let params = UpdateTargetParams {
            retry_count: Some(500),
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
