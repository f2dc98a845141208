//! HTTP client for the remote key service.
//!
//! Listing goes through endpoint discovery (probing configured candidate
//! paths in order); response bodies are passed through as-is, parsed JSON
//! when the service declares it, raw text otherwise. Calls are bounded by
//! fixed per-operation timeouts and never retried.

use std::fmt;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::normalize::extract_records;

const LIST_TIMEOUT: Duration = Duration::from_secs(12);
const CHECK_TIMEOUT: Duration = Duration::from_secs(12);
const DELETE_TIMEOUT: Duration = Duration::from_secs(15);
const WRITE_TIMEOUT: Duration = Duration::from_secs(20);

/// Failure modes of calls toward the remote service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("API base not configured")]
    NotConfigured,
    #[error("endpoint {url} returned a success status but the body is not JSON")]
    UnparseableListBody { url: String },
    #[error("no working list endpoint found on the API base")]
    NoListEndpoint,
    #[error("remote returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// A remote response body, surfaced to the caller untouched.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Json(value) => write!(f, "{value}"),
            Payload::Text(text) => f.write_str(text),
        }
    }
}

/// Client for the remote key service. Cheap to clone; wraps one pooled
/// `reqwest::Client`.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("keywarden/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("reqwest client");
        Self { http }
    }

    /// Probe the configured list endpoints in order and return the raw
    /// record list from the first one that answers with parseable JSON.
    ///
    /// Unreachable candidates and non-success statuses are skipped; a
    /// success status carrying a non-JSON body is a misconfiguration worth
    /// surfacing, so it aborts discovery instead of being skipped.
    pub async fn fetch_keys(
        &self,
        api_base: &str,
        endpoints: &[String],
    ) -> Result<Vec<Value>, ApiError> {
        let base = trimmed_base(api_base)?;
        for path in endpoints {
            let url = format!("{base}{path}");
            let resp = match self
                .http
                .get(&url)
                .header(ACCEPT, "application/json")
                .timeout(LIST_TIMEOUT)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(err) => {
                    tracing::debug!(%url, error = %err, "list candidate unreachable");
                    continue;
                }
            };
            if !resp.status().is_success() {
                tracing::debug!(%url, status = resp.status().as_u16(), "list candidate rejected");
                continue;
            }
            match resp.json::<Value>().await {
                Ok(body) => return Ok(extract_records(body)),
                Err(_) => return Err(ApiError::UnparseableListBody { url }),
            }
        }
        Err(ApiError::NoListEndpoint)
    }

    pub async fn create_key(&self, api_base: &str, payload: &Value) -> Result<Payload, ApiError> {
        let base = trimmed_base(api_base)?;
        let resp = self
            .http
            .post(format!("{base}/api/key/create"))
            .json(payload)
            .timeout(WRITE_TIMEOUT)
            .send()
            .await?;
        finish(resp, &[StatusCode::OK, StatusCode::CREATED]).await
    }

    pub async fn update_key(&self, api_base: &str, payload: &Value) -> Result<Payload, ApiError> {
        let base = trimmed_base(api_base)?;
        let resp = self
            .http
            .put(format!("{base}/api/key/update"))
            .json(payload)
            .timeout(WRITE_TIMEOUT)
            .send()
            .await?;
        finish(resp, &[StatusCode::OK]).await
    }

    pub async fn delete_key(&self, api_base: &str, key: &str) -> Result<Payload, ApiError> {
        let base = trimmed_base(api_base)?;
        let resp = self
            .http
            .delete(format!("{base}/api/key/remove"))
            .query(&[("key", key)])
            .timeout(DELETE_TIMEOUT)
            .send()
            .await?;
        finish(resp, &[StatusCode::OK]).await
    }

    pub async fn check_key(&self, api_base: &str, key: &str) -> Result<Payload, ApiError> {
        let base = trimmed_base(api_base)?;
        let resp = self
            .http
            .get(format!("{base}/api/key/check"))
            .query(&[("key", key)])
            .timeout(CHECK_TIMEOUT)
            .send()
            .await?;
        finish(resp, &[StatusCode::OK]).await
    }
}

/// An empty base disables remote calls and fails fast.
fn trimmed_base(api_base: &str) -> Result<&str, ApiError> {
    let base = api_base.trim_end_matches('/');
    if base.is_empty() {
        Err(ApiError::NotConfigured)
    } else {
        Ok(base)
    }
}

/// Judge success purely by status code and surface the body either way.
async fn finish(resp: reqwest::Response, ok_statuses: &[StatusCode]) -> Result<Payload, ApiError> {
    let status = resp.status();
    let payload = read_payload(resp).await;
    if ok_statuses.contains(&status) {
        Ok(payload)
    } else {
        Err(ApiError::Status {
            status: status.as_u16(),
            body: payload.to_string(),
        })
    }
}

async fn read_payload(resp: reqwest::Response) -> Payload {
    let declares_json = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);
    let text = resp.text().await.unwrap_or_default();
    if declares_json {
        if let Ok(value) = serde_json::from_str(&text) {
            return Payload::Json(value);
        }
    }
    Payload::Text(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    fn paths(list: &[&str]) -> Vec<String> {
        list.iter().map(|p| (*p).to_string()).collect()
    }

    #[tokio::test]
    async fn discovery_skips_failing_candidates() {
        let app = Router::new().route(
            "/api/key/list",
            get(|| async { Json(json!({"keys": [{"key": "k1"}]})) }),
        );
        let base = serve(app).await;
        let client = ApiClient::new();
        let records = client
            .fetch_keys(&base, &paths(&["/api/keys", "/api/key/list"]))
            .await
            .unwrap();
        assert_eq!(records, vec![json!({"key": "k1"})]);
    }

    #[tokio::test]
    async fn discovery_fails_fast_on_non_json_success() {
        let app = Router::new()
            .route("/api/keys", get(|| async { "not json" }))
            .route("/api/key/list", get(|| async { Json(json!([1])) }));
        let base = serve(app).await;
        let client = ApiClient::new();
        let err = client
            .fetch_keys(&base, &paths(&["/api/keys", "/api/key/list"]))
            .await
            .unwrap_err();
        match err {
            ApiError::UnparseableListBody { url } => assert!(url.ends_with("/api/keys")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn discovery_reports_exhaustion() {
        let app = Router::new();
        let base = serve(app).await;
        let client = ApiClient::new();
        let err = client
            .fetch_keys(&base, &paths(&["/api/keys", "/keys"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NoListEndpoint));
    }

    #[tokio::test]
    async fn discovery_skips_unreachable_candidates_until_exhaustion() {
        // Bind then drop so the port refuses connections.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = ApiClient::new();
        let err = client
            .fetch_keys(&base, &paths(&["/api/keys", "/keys"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NoListEndpoint));
    }

    #[tokio::test]
    async fn empty_base_short_circuits_every_operation() {
        let client = ApiClient::new();
        let err = client
            .fetch_keys("", &paths(&["/api/keys"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotConfigured));

        let err = client.create_key("", &json!({})).await.unwrap_err();
        assert!(matches!(err, ApiError::NotConfigured));
        let err = client.update_key("/", &json!({})).await.unwrap_err();
        assert!(matches!(err, ApiError::NotConfigured));
        let err = client.delete_key("", "k").await.unwrap_err();
        assert!(matches!(err, ApiError::NotConfigured));
        let err = client.check_key("", "k").await.unwrap_err();
        assert!(matches!(err, ApiError::NotConfigured));
    }

    #[tokio::test]
    async fn create_accepts_created_status_with_json_payload() {
        let app = Router::new().route(
            "/api/key/create",
            post(|Json(body): Json<Value>| async move {
                (
                    StatusCode::CREATED,
                    Json(json!({"created": body["custom_key"]})),
                )
            }),
        );
        let base = serve(app).await;
        let client = ApiClient::new();
        let payload = json!({"custom_key": "abc"});
        match client.create_key(&base, &payload).await.unwrap() {
            Payload::Json(v) => assert_eq!(v["created"], "abc"),
            Payload::Text(t) => panic!("expected json payload, got text: {t}"),
        }
    }

    #[tokio::test]
    async fn delete_surfaces_status_failures() {
        let app = Router::new().route(
            "/api/key/remove",
            delete(|| async { (StatusCode::FORBIDDEN, "nope") }),
        );
        let base = serve(app).await;
        let client = ApiClient::new();
        let err = client.delete_key(&base, "k1").await.unwrap_err();
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "nope");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn check_forwards_key_and_passes_text_through() {
        let app = Router::new().route(
            "/api/key/check",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                format!("status for {}", params.get("key").cloned().unwrap_or_default())
            }),
        );
        let base = serve(app).await;
        let client = ApiClient::new();
        match client.check_key(&base, "k 1").await.unwrap() {
            Payload::Text(t) => assert_eq!(t, "status for k 1"),
            Payload::Json(v) => panic!("expected text payload, got {v}"),
        }
    }
}
