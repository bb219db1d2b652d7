use std::time::Duration;

use async_trait::async_trait;

use tend_core::checker::{CheckError, UpgradeChecker};
use tend_model::{CheckRequest, CheckResponse};

/// Endpoint the checker talks to when none is configured.
pub const DEFAULT_CHECK_URL: &str =
    "http://upgrade-responder.longhorn.rancher.io/v1/checkupgrade";

/// Request timeout. Bounds how long a worker can sit inside one round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// [`UpgradeChecker`] backed by one HTTP POST per call.
///
/// Stateless besides the connection pool: every call submits the running
/// version as JSON and decodes the responder's version list.
pub struct HttpChecker {
    client: reqwest::Client,
    url: String,
}

impl HttpChecker {
    /// Build a checker against `url` with [`DEFAULT_TIMEOUT`].
    pub fn new(url: impl Into<String>) -> Result<Self, CheckError> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, CheckError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CheckError::Request(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl UpgradeChecker for HttpChecker {
    async fn latest_version(&self, current: &str) -> Result<String, CheckError> {
        let req = CheckRequest {
            current_version: current.to_string(),
        };

        let resp = self
            .client
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| CheckError::Request(e.to_string()))?;

        let decoded: CheckResponse = resp
            .json()
            .await
            .map_err(|e| CheckError::Decode(e.to_string()))?;

        decoded
            .latest_tagged()
            .map(str::to_string)
            .ok_or(CheckError::NoLatest)
    }
}

#[cfg(test)]
mod tests {
    use axum::{Json, Router, routing::post};
    use serde_json::{Value, json};

    use super::HttpChecker;
    use tend_core::checker::{CheckError, UpgradeChecker};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1/checkupgrade")
    }

    #[tokio::test]
    async fn posts_the_running_version_and_selects_latest() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Value>();
        let app = Router::new().route(
            "/v1/checkupgrade",
            post(move |Json(body): Json<Value>| {
                let tx = tx.clone();
                async move {
                    tx.send(body).ok();
                    Json(json!({
                        "versions": [
                            {"Name": "1.0.0", "ReleaseDate": "2020-01-01", "Tags": ["stable"]},
                            {"Name": "1.1.0", "ReleaseDate": "2020-06-01", "Tags": ["latest"]}
                        ]
                    }))
                }
            }),
        );
        let checker = HttpChecker::new(serve(app).await).unwrap();

        let latest = checker.latest_version("v1.0.0").await.unwrap();

        assert_eq!(latest, "1.1.0");
        let body = rx.recv().await.unwrap();
        assert_eq!(body["longhornVersion"], "v1.0.0");
    }

    #[tokio::test]
    async fn missing_latest_tag_is_a_hard_error() {
        let app = Router::new().route(
            "/v1/checkupgrade",
            post(|| async {
                Json(json!({
                    "versions": [
                        {"Name": "1.0.0", "ReleaseDate": "2020-01-01", "Tags": ["stable"]}
                    ]
                }))
            }),
        );
        let checker = HttpChecker::new(serve(app).await).unwrap();

        let err = checker.latest_version("v1.0.0").await;
        assert!(matches!(err, Err(CheckError::NoLatest)));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let app = Router::new().route("/v1/checkupgrade", post(|| async { "not json" }));
        let checker = HttpChecker::new(serve(app).await).unwrap();

        let err = checker.latest_version("v1.0.0").await;
        assert!(matches!(err, Err(CheckError::Decode(_))));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_request_error() {
        let checker = HttpChecker::new("http://127.0.0.1:1/v1/checkupgrade").unwrap();

        let err = checker.latest_version("v1.0.0").await;
        assert!(matches!(err, Err(CheckError::Request(_))));
    }
}
