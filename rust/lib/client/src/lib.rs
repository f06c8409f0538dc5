//! Remote submission client.
//!
//! Reports a scanned batch to the collection service with a single
//! `POST {base_url}/scanid`. Callers depend on the [`Submitter`] trait so the
//! sync workflow can be driven by an in-process stub in tests.
//!
//! # Usage
//!
//! ```ignore
//! use scanbox_client::{HttpSubmitter, Submitter};
//!
//! let client = HttpSubmitter::new("https://scan.example.com/api", "secret-key")?;
//! client.submit(&batch).await?;
//! ```

use async_trait::async_trait;
use scanbox_core::ScanBatch;
use serde::Serialize;
use tracing::{debug, warn};

/// Header carrying the service API key (`X-API-KEY`; names are case-insensitive).
pub const API_KEY_HEADER: &str = "x-api-key";

/// Path appended to the base URL for submissions.
pub const SUBMIT_PATH: &str = "/scanid";

// ── Error ───────────────────────────────────────────────────────────

/// Why a submission did not succeed.
///
/// The sync workflow treats every variant the same way (offer local
/// persistence); the distinction exists for logs and CLI messages.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid API key: contains characters not allowed in a header")]
    InvalidApiKey,
}

/// Outcome of one submission.
pub type SubmitResult = Result<(), SubmitError>;

// ── Submitter ───────────────────────────────────────────────────────

/// Reports a batch to the remote service. One call, no retries.
#[async_trait]
pub trait Submitter: Send + Sync + 'static {
    async fn submit(&self, batch: &ScanBatch) -> SubmitResult;
}

/// Request body: `{"id": ["code", ...]}`.
#[derive(Serialize)]
struct SubmitBody<'a> {
    id: &'a ScanBatch,
}

// ── HttpSubmitter ───────────────────────────────────────────────────

/// [`Submitter`] over HTTP. Success is exactly `200 OK`; any other status
/// and any transport error is a failure.
pub struct HttpSubmitter {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSubmitter {
    pub fn new(base_url: impl Into<String>, api_key: &str) -> Result<Self, SubmitError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let value = reqwest::header::HeaderValue::from_str(api_key)
            .map_err(|_| SubmitError::InvalidApiKey)?;
        headers.insert(reqwest::header::HeaderName::from_static(API_KEY_HEADER), value);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Full submission URL.
    pub fn submit_url(&self) -> String {
        format!("{}{}", self.base_url, SUBMIT_PATH)
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(&self, batch: &ScanBatch) -> SubmitResult {
        let url = self.submit_url();
        debug!("submitting {} codes to {}", batch.len(), url);

        let resp = match self.http.post(&url).json(&SubmitBody { id: batch }).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!("submission to {} failed: {}", url, e);
                return Err(SubmitError::Network(e));
            }
        };

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let message = resp.text().await.unwrap_or_default();
            warn!("submission to {} rejected with {}", url, status);
            return Err(SubmitError::Status {
                status: status.as_u16(),
                message,
            });
        }

        debug!("submission of {} codes accepted", batch.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use tokio::sync::Mutex;

    use super::*;

    #[derive(Clone, Default)]
    struct Seen {
        requests: Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>,
    }

    /// Start a server whose `/scanid` answers with `reply` and records requests.
    async fn start_server(reply: StatusCode) -> (String, Seen) {
        let seen = Seen::default();

        let app = Router::new()
            .route(
                "/scanid",
                post(
                    move |State(seen): State<Seen>,
                          headers: HeaderMap,
                          Json(body): Json<serde_json::Value>| async move {
                        let key = headers
                            .get("x-api-key")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        seen.requests.lock().await.push((key, body));
                        (reply, "server says no")
                    },
                ),
            )
            .with_state(seen.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), seen)
    }

    fn batch(codes: &[&str]) -> ScanBatch {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn posts_codes_with_api_key() {
        let (base, seen) = start_server(StatusCode::OK).await;
        let client = HttpSubmitter::new(format!("{}/", base), "k-123").unwrap();

        client.submit(&batch(&["A", "B"])).await.unwrap();

        let requests = seen.requests.lock().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0.as_deref(), Some("k-123"));
        assert_eq!(requests[0].1, serde_json::json!({"id": ["A", "B"]}));
    }

    #[tokio::test]
    async fn server_error_is_failure() {
        let (base, _) = start_server(StatusCode::INTERNAL_SERVER_ERROR).await;
        let client = HttpSubmitter::new(base, "k").unwrap();

        match client.submit(&batch(&["A"])).await {
            Err(SubmitError::Status { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "server says no");
            }
            other => panic!("expected status failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn only_200_counts_as_success() {
        let (base, _) = start_server(StatusCode::CREATED).await;
        let client = HttpSubmitter::new(base, "k").unwrap();

        let err = client.submit(&batch(&["A"])).await.unwrap_err();
        assert!(matches!(err, SubmitError::Status { status: 201, .. }));
    }

    #[tokio::test]
    async fn unreachable_server_is_network_failure() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpSubmitter::new(format!("http://{}", addr), "k").unwrap();
        let err = client.submit(&batch(&["A"])).await.unwrap_err();
        assert!(matches!(err, SubmitError::Network(_)));
    }

    #[test]
    fn rejects_unprintable_api_key() {
        assert!(matches!(
            HttpSubmitter::new("http://localhost", "bad\nkey"),
            Err(SubmitError::InvalidApiKey)
        ));
    }

    #[test]
    fn submit_url_trims_trailing_slash() {
        let client = HttpSubmitter::new("http://localhost:8080/api/", "k").unwrap();
        assert_eq!(client.submit_url(), "http://localhost:8080/api/scanid");
    }
}
