//! The closed probe-outcome status taxonomy.

use serde::{Deserialize, Serialize};

/// Outcome of a single HTTP probe attempt (and, by aggregation, of a Run).
///
/// Stored as the Postgres enum `jobstatus`. Deserialization from a stored or
/// externally-supplied string is tolerant: an unrecognized string becomes
/// `Error` rather than failing the read, per the Record activity's
/// tolerant-deserialization requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "jobstatus", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Success,
    Timeout,
    DnsError,
    ConnectionError,
    Http4xx,
    Http5xx,
    Error,
}

impl ProbeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStatus::Success => "success",
            ProbeStatus::Timeout => "timeout",
            ProbeStatus::DnsError => "dns_error",
            ProbeStatus::ConnectionError => "connection_error",
            ProbeStatus::Http4xx => "http_4xx",
            ProbeStatus::Http5xx => "http_5xx",
            ProbeStatus::Error => "error",
        }
    }

    /// Statuses that trigger a retry when attempts remain: everything
    /// except `success` and `http_4xx` (a 4xx is the client's fault and
    /// retrying will not change the outcome).
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ProbeStatus::Success | ProbeStatus::Http4xx)
    }

    /// Parses a status string tolerantly: unknown strings fall back to
    /// `Error` rather than propagating a deserialization failure.
    pub fn from_str_tolerant(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "success" => ProbeStatus::Success,
            "timeout" => ProbeStatus::Timeout,
            "dns_error" => ProbeStatus::DnsError,
            "connection_error" => ProbeStatus::ConnectionError,
            "http_4xx" => ProbeStatus::Http4xx,
            "http_5xx" => ProbeStatus::Http5xx,
            _ => ProbeStatus::Error,
        }
    }

    pub fn from_status_code(code: u16) -> Self {
        if code >= 500 {
            ProbeStatus::Http5xx
        } else if code >= 400 {
            ProbeStatus::Http4xx
        } else {
            ProbeStatus::Success
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_and_4xx_are_not_retryable() {
        assert!(!ProbeStatus::Success.is_retryable());
        assert!(!ProbeStatus::Http4xx.is_retryable());
    }

    #[test]
    fn everything_else_is_retryable() {
        for status in [
            ProbeStatus::Timeout,
            ProbeStatus::DnsError,
            ProbeStatus::ConnectionError,
            ProbeStatus::Http5xx,
            ProbeStatus::Error,
        ] {
            assert!(status.is_retryable());
        }
    }

    #[test]
    fn unknown_string_becomes_error() {
        assert_eq!(ProbeStatus::from_str_tolerant("not_a_real_status"), ProbeStatus::Error);
    }

    #[test]
    fn status_code_classification() {
        assert_eq!(ProbeStatus::from_status_code(200), ProbeStatus::Success);
        assert_eq!(ProbeStatus::from_status_code(404), ProbeStatus::Http4xx);
        assert_eq!(ProbeStatus::from_status_code(503), ProbeStatus::Http5xx);
    }
}
