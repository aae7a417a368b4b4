//! The HTTP Probe Activity.
//!
//! Executes one probe — a bounded sequence of HTTP attempts against a
//! Target's URL — and returns a structured result. This function never
//! returns `Err` for a domain-level HTTP failure (timeout, DNS, connection
//! refused, 4xx/5xx): those become `ProbeStatus` values in the result.
//! `Err` is reserved for truly unexpected failures (e.g. building the
//! `reqwest::Client` itself fails), which the caller's `ctx.run` wrapper
//! turns into a retryable activity failure.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::domains::runs::{JsonOrText, ProbeStatus, RedirectHop};
use crate::domains::targets::HttpMethod;
use crate::impl_restate_serde;

const DNS_ERROR_PATTERNS: &[&str] = &[
    "name resolution",
    "dns",
    "getaddrinfo",
    "name or service not known",
    "nodename nor servname",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeInput {
    pub url: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub body: Option<serde_json::Value>,
    pub timeout_seconds: i32,
    pub retry_count: i32,
    pub retry_delay_seconds: i32,
    pub follow_redirects: bool,
}

impl_restate_serde!(ProbeInput);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptResult {
    pub attempt_number: i32,
    pub started_at: chrono::DateTime<Utc>,
    pub status: ProbeStatus,
    pub status_code: Option<i32>,
    pub latency_ms: Option<f64>,
    pub response_size_bytes: Option<i64>,
    pub response_headers: Option<HashMap<String, String>>,
    pub response_body: Option<JsonOrText>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub status: ProbeStatus,
    pub status_code: Option<i32>,
    pub latency_ms: Option<f64>,
    pub response_size_bytes: Option<i64>,
    pub response_headers: Option<HashMap<String, String>>,
    pub response_body: Option<JsonOrText>,
    pub error_message: Option<String>,
    pub started_at: chrono::DateTime<Utc>,
    pub request_headers: HashMap<String, String>,
    pub request_body: Option<serde_json::Value>,
    pub redirected: bool,
    pub redirect_count: i32,
    pub redirect_history: Vec<RedirectHop>,
    pub attempts: Vec<AttemptResult>,
}

impl_restate_serde!(ProbeResult);

/// Executes the probe: up to `retry_count + 1` attempts, retrying on any
/// outcome other than `success`/`http_4xx`, sleeping `retry_delay_seconds`
/// between attempts.
pub async fn execute_probe(input: &ProbeInput) -> ProbeResult {
    let started_at = Utc::now();
    let probe_start = Instant::now();

    let mut attempts = Vec::new();
    let mut redirect_history = Vec::new();
    let max_attempts = input.retry_count + 1;

    let mut last_status = ProbeStatus::Success;
    let mut last_status_code = None;
    let mut last_size = None;
    let mut last_headers = None;
    let mut last_body = None;
    let mut last_error = None;

    for attempt_number in 1..=max_attempts {
        let attempt_started_at = Utc::now();
        let attempt_start = Instant::now();

        let outcome = send_one(input).await;

        let attempt_latency_ms = attempt_start.elapsed().as_secs_f64() * 1000.0;

        let attempt = match outcome {
            Ok(sent) => {
                for hop in &sent.redirect_history {
                    redirect_history.push(hop.clone());
                }

                let status = ProbeStatus::from_status_code(sent.status_code as u16);

                last_status = status;
                last_status_code = Some(sent.status_code);
                last_size = Some(sent.size_bytes);
                last_headers = Some(sent.headers.clone());
                last_body = Some(sent.body.clone());
                last_error = None;

                AttemptResult {
                    attempt_number,
                    started_at: attempt_started_at,
                    status,
                    status_code: Some(sent.status_code),
                    latency_ms: Some(attempt_latency_ms),
                    response_size_bytes: Some(sent.size_bytes),
                    response_headers: Some(sent.headers),
                    response_body: Some(sent.body),
                    error_message: None,
                }
            }
            Err(classified) => {
                last_status = classified.status;
                last_status_code = None;
                last_size = None;
                last_headers = None;
                last_body = None;
                last_error = Some(classified.message.clone());

                AttemptResult {
                    attempt_number,
                    started_at: attempt_started_at,
                    status: classified.status,
                    status_code: None,
                    latency_ms: Some(attempt_latency_ms),
                    response_size_bytes: None,
                    response_headers: None,
                    response_body: None,
                    error_message: Some(classified.message),
                }
            }
        };

        let should_retry = attempt.status.is_retryable() && attempt_number < max_attempts;
        attempts.push(attempt);

        if should_retry {
            tokio::time::sleep(Duration::from_secs(input.retry_delay_seconds.max(0) as u64)).await;
            continue;
        }
        break;
    }

    let redirect_count = redirect_history.len() as i32;

    ProbeResult {
        status: last_status,
        status_code: last_status_code,
        latency_ms: Some(probe_start.elapsed().as_secs_f64() * 1000.0),
        response_size_bytes: last_size,
        response_headers: last_headers,
        response_body: last_body,
        error_message: last_error,
        started_at,
        request_headers: input.headers.clone(),
        request_body: input.body.clone(),
        redirected: redirect_count > 0,
        redirect_count,
        redirect_history,
        attempts,
    }
}

struct SentResponse {
    status_code: i32,
    size_bytes: i64,
    headers: HashMap<String, String>,
    body: JsonOrText,
    redirect_history: Vec<RedirectHop>,
}

struct ClassifiedError {
    status: ProbeStatus,
    message: String,
}

async fn send_one(input: &ProbeInput) -> Result<SentResponse, ClassifiedError> {
    // `reqwest` follows redirects inside `send()`, so the only way to
    // capture each intermediate hop is a custom policy that records the
    // hop as it decides to follow it.
    let redirect_log: Arc<Mutex<Vec<RedirectHop>>> = Arc::new(Mutex::new(Vec::new()));

    let client = {
        let redirect_log = redirect_log.clone();
        reqwest::Client::builder()
            .timeout(Duration::from_secs(input.timeout_seconds.max(0) as u64))
            .redirect(if input.follow_redirects {
                reqwest::redirect::Policy::custom(move |attempt| {
                    let mut hops = redirect_log.lock().expect("redirect log mutex poisoned");
                    if hops.len() >= 10 {
                        return attempt.error("too many redirects");
                    }
                    hops.push(RedirectHop {
                        url: attempt.url().to_string(),
                        status_code: attempt.status().as_u16() as i32,
                    });
                    attempt.follow()
                })
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .map_err(|e| ClassifiedError {
                status: ProbeStatus::Error,
                message: e.to_string(),
            })?
    };

    let mut request = client.request(input.method.as_reqwest_method(), &input.url);

    for (key, value) in &input.headers {
        request = request.header(key, value);
    }

    if let Some(body) = &input.body {
        request = if input.method.sends_body_as_query() {
            match body.as_object() {
                Some(map) => {
                    let query: Vec<(String, String)> = map
                        .iter()
                        .map(|(k, v)| (k.clone(), value_to_query_string(v)))
                        .collect();
                    request.query(&query)
                }
                None => request,
            }
        } else {
            request.json(body)
        };
    }

    let response = request
        .send()
        .await
        .map_err(|e| classify_reqwest_error(e, input.timeout_seconds))?;

    // When follow_redirects=true, the hops already landed in redirect_log
    // via the custom policy above. When it's false, a 3xx response is
    // itself the final response; capture its Location header as a single
    // redirect hop instead.
    let mut redirect_history = redirect_log.lock().expect("redirect log mutex poisoned").clone();
    if !input.follow_redirects && response.status().is_redirection() {
        if let Some(location) = response.headers().get("location").and_then(|v| v.to_str().ok()) {
            redirect_history.push(RedirectHop {
                url: location.to_string(),
                status_code: response.status().as_u16() as i32,
            });
        }
    }

    let status_code = response.status().as_u16() as i32;
    let headers: HashMap<String, String> = response
        .headers()
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
        .collect();

    let raw = response
        .text()
        .await
        .map_err(|e| classify_reqwest_error(e, input.timeout_seconds))?;
    let size_bytes = raw.len() as i64;
    let body = JsonOrText::from_raw(&raw);

    Ok(SentResponse {
        status_code,
        size_bytes,
        headers,
        body,
        redirect_history,
    })
}

fn value_to_query_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn classify_reqwest_error(err: reqwest::Error, timeout_seconds: i32) -> ClassifiedError {
    if err.is_timeout() {
        return ClassifiedError {
            status: ProbeStatus::Timeout,
            message: timeout_message(timeout_seconds),
        };
    }

    if err.is_redirect() {
        return ClassifiedError {
            status: ProbeStatus::Error,
            message: format!("Redirect error: {}", err),
        };
    }

    if err.is_connect() {
        let message = err.to_string();
        let lower = message.to_ascii_lowercase();
        if DNS_ERROR_PATTERNS.iter().any(|pattern| lower.contains(pattern)) {
            return ClassifiedError {
                status: ProbeStatus::DnsError,
                message: format!("DNS resolution failed: {}", message),
            };
        }
        return ClassifiedError {
            status: ProbeStatus::ConnectionError,
            message: format!("Connection error: {}", message),
        };
    }

    ClassifiedError {
        status: ProbeStatus::Error,
        message: err.to_string(),
    }
}

/// Applies the `timeout_seconds` message format used for timed-out attempts.
pub fn timeout_message(timeout_seconds: i32) -> String {
    format!("Request timed out after {} seconds", timeout_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(url: &str) -> ProbeInput {
        ProbeInput {
            url: url.to_string(),
            method: HttpMethod::Get,
            headers: HashMap::new(),
            body: None,
            timeout_seconds: 5,
            retry_count: 0,
            retry_delay_seconds: 0,
            follow_redirects: true,
        }
    }

    #[tokio::test]
    async fn connection_error_on_unroutable_host() {
        let result = execute_probe(&input("http://127.0.0.1:1")).await;
        assert_eq!(result.attempts.len(), 1);
        assert!(matches!(
            result.status,
            ProbeStatus::ConnectionError | ProbeStatus::Error
        ));
    }

    #[test]
    fn dns_pattern_matching_is_case_insensitive() {
        let message = "Failed to resolve: GETADDRINFO ENOTFOUND";
        let lower = message.to_ascii_lowercase();
        assert!(DNS_ERROR_PATTERNS.iter().any(|p| lower.contains(p)));
    }

    #[test]
    fn timeout_message_format() {
        assert_eq!(timeout_message(30), "Request timed out after 30 seconds");
    }

    #[tokio::test]
    async fn retries_on_503_then_recovers() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let mut probe_input = input(&format!("{}/status", server.uri()));
        probe_input.retry_count = 2;

        let result = execute_probe(&probe_input).await;

        assert_eq!(result.status, ProbeStatus::Success);
        assert_eq!(result.status_code, Some(200));
        assert_eq!(result.attempts.len(), 3);
        assert_eq!(
            result.attempts.iter().map(|a| a.status).collect::<Vec<_>>(),
            vec![ProbeStatus::Http5xx, ProbeStatus::Http5xx, ProbeStatus::Success]
        );
    }

    #[tokio::test]
    async fn short_circuits_on_4xx_without_retrying() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut probe_input = input(&format!("{}/missing", server.uri()));
        probe_input.retry_count = 5;

        let result = execute_probe(&probe_input).await;

        assert_eq!(result.status, ProbeStatus::Http4xx);
        assert_eq!(result.attempts.len(), 1);
    }

    #[tokio::test]
    async fn captures_redirect_hop_when_not_following() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new"))
            .mount(&server)
            .await;

        let mut probe_input = input(&format!("{}/old", server.uri()));
        probe_input.follow_redirects = false;

        let result = execute_probe(&probe_input).await;

        assert!(result.redirected);
        assert_eq!(result.redirect_count, 1);
        assert_eq!(result.redirect_history[0].url, "/new");
    }

    #[tokio::test]
    async fn captures_redirect_chain_when_following() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/start"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/middle"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/middle"))
            .respond_with(ResponseTemplate::new(301).insert_header("Location", "/end"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/end"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let probe_input = input(&format!("{}/start", server.uri()));

        let result = execute_probe(&probe_input).await;

        assert_eq!(result.status, ProbeStatus::Success);
        assert!(result.redirected);
        assert_eq!(result.redirect_count, 2);
        assert_eq!(result.redirect_history[0].status_code, 302);
        assert!(result.redirect_history[0].url.ends_with("/middle"));
        assert_eq!(result.redirect_history[1].status_code, 301);
        assert!(result.redirect_history[1].url.ends_with("/end"));
    }
}
