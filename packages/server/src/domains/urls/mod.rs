//! Parsed URL storage.
//!
//! A URL is owned 1:1 by the Target that references it: the Fetch activity
//! reconstructs the request URL from these stored components rather than
//! from a single opaque string, so that netloc can be indexed independently
//! (e.g. for future per-host rate limiting).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use typed_builder::TypedBuilder;

use crate::common::UrlId;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Url {
    pub id: UrlId,
    pub scheme: String,
    pub netloc: String,
    pub path: String,
    pub params: String,
    pub query: String,
    pub fragment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Url {
    /// Reconstructs the full URL string from its parsed components:
    /// `scheme://netloc/path;params?query#fragment`.
    pub fn to_url_string(&self) -> String {
        let mut s = format!("{}://{}{}", self.scheme, self.netloc, self.path);
        if !self.params.is_empty() {
            s.push(';');
            s.push_str(&self.params);
        }
        if !self.query.is_empty() {
            s.push('?');
            s.push_str(&self.query);
        }
        if !self.fragment.is_empty() {
            s.push('#');
            s.push_str(&self.fragment);
        }
        s
    }

    /// Parses an absolute URL string into its component parts.
    ///
    /// Validation: must have a scheme, a netloc, and a path; the netloc must
    /// contain at least one dot (rejects bare hostnames like `http://localhost/`
    /// as not "absolute enough" for a managed probe target, per the URL
    /// validation contract).
    pub fn parse(raw: &str) -> Result<ParsedUrl> {
        let parsed = url::Url::parse(raw).context("not a valid absolute URL")?;

        let netloc = parsed
            .host_str()
            .map(|host| match parsed.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            })
            .context("URL has no host")?;

        if !netloc.contains('.') {
            anyhow::bail!("URL host must contain at least one dot: {}", netloc);
        }

        let path = if parsed.path().is_empty() {
            "/".to_string()
        } else {
            parsed.path().to_string()
        };

        Ok(ParsedUrl {
            scheme: parsed.scheme().to_string(),
            netloc,
            path,
            params: String::new(),
            query: parsed.query().unwrap_or_default().to_string(),
            fragment: parsed.fragment().unwrap_or_default().to_string(),
        })
    }
}

/// The output of parsing a raw URL string, prior to being persisted (no id
/// or timestamps yet).
#[derive(Debug, Clone, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct ParsedUrl {
    pub scheme: String,
    pub netloc: String,
    pub path: String,
    #[builder(default)]
    pub params: String,
    #[builder(default)]
    pub query: String,
    #[builder(default)]
    pub fragment: String,
}

impl Url {
    pub async fn find_by_id(id: UrlId, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM urls WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn create(parsed: &ParsedUrl, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO urls (scheme, netloc, path, params, query, fragment)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&parsed.scheme)
        .bind(&parsed.netloc)
        .bind(&parsed.path)
        .bind(&parsed.params)
        .bind(&parsed.query)
        .bind(&parsed.fragment)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn delete(id: UrlId, pool: &PgPool) -> Result<()> {
        sqlx::query("DELETE FROM urls WHERE id = $1")
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
    fn parses_absolute_url() {
        let parsed = Url::parse("https://api.example.com/v1/status?verbose=1").unwrap();
        assert_eq!(parsed.scheme, "https");
        assert_eq!(parsed.netloc, "api.example.com");
        assert_eq!(parsed.path, "/v1/status");
        assert_eq!(parsed.query, "verbose=1");
    }

    #[test]
    fn rejects_netloc_without_dot() {
        let result = Url::parse("http://localhost/ok");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_relative_url() {
        assert!(Url::parse("/just/a/path").is_err());
    }

    #[test]
    fn reconstructs_full_url_string() {
        let url = Url {
            id: UrlId::new(),
            scheme: "https".to_string(),
            netloc: "api.example.com".to_string(),
            path: "/v1/status".to_string(),
            params: String::new(),
            query: "verbose=1".to_string(),
            fragment: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(url.to_url_string(), "https://api.example.com/v1/status?verbose=1");
    }
}
