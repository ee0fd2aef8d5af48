//! services/client/src/adapters/http.rs
//!
//! This module contains the adapter for the document backend's REST surface.
//! It implements the `ChatBackend` port from the `core` crate with `reqwest`.

use async_trait::async_trait;
use docchat_core::domain::{HealthStatus, QueryRequest, QueryResponse, UploadResult};
use docchat_core::ports::{ChatBackend, PortError, PortResult};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Limits only connection setup. Once connected, a request runs to completion.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_connect_timeout(base_url, CONNECT_TIMEOUT)
    }

    pub fn with_connect_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to a default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Connection-level failures are reported as `Unreachable` so callers can
/// tell "backend is down" apart from "backend said no".
fn transport_err(e: reqwest::Error) -> PortError {
    if e.is_connect() || e.is_timeout() {
        PortError::Unreachable(e.to_string())
    } else {
        PortError::Unexpected(e.to_string())
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> PortResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PortError::Status {
            status: status.as_u16(),
            body,
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|e| PortError::Unexpected(format!("invalid response body: {}", e)))
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn upload_document(&self, filename: &str, data: &[u8]) -> PortResult<UploadResult> {
        debug!("Uploading '{}' ({} bytes)", filename, data.len());
        let part = Part::bytes(data.to_vec()).file_name(filename.to_string());
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint("/api/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(transport_err)?;

        read_json(response).await
    }

    async fn query(&self, request: &QueryRequest) -> PortResult<QueryResponse> {
        debug!(
            "Querying backend (type={}, use_rag={}, history={})",
            request.query_type,
            request.use_rag,
            request.history.len()
        );
        let response = self
            .client
            .post(self.endpoint("/api/query"))
            .json(request)
            .send()
            .await
            .map_err(transport_err)?;

        read_json(response).await
    }

    async fn health(&self) -> PortResult<HealthStatus> {
        let response = self
            .client
            .get(self.endpoint("/api/health"))
            .send()
            .await
            .map_err(transport_err)?;

        read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchat_core::domain::{QueryType, SourceType};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn upload_sends_multipart_file_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/upload"))
            .and(body_string_contains("name=\"file\""))
            .and(body_string_contains("filename=\"manual.pdf\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "file_id": "doc-1",
                "filename": "manual.pdf",
                "pages": 12,
                "chunks_indexed": 40,
                "type": "pdf",
                "recommended_actions": ["summarize", "quiz"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = HttpBackend::new(format!("{}/", server.uri()));
        let result = backend
            .upload_document("manual.pdf", b"%PDF-1.7")
            .await
            .unwrap();

        assert_eq!(result.file_id, "doc-1");
        assert_eq!(result.doc_type, SourceType::Pdf);
    }

    #[tokio::test]
    async fn query_posts_json_and_reads_citations() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/query"))
            .and(body_partial_json(json!({"query": "What is on page 3?", "use_rag": true, "type": "freeform"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "answer": "A diagram.",
                "sources": [{"file": "manual.pdf", "page": 3}]
            })))
            .mount(&server)
            .await;

        let backend = HttpBackend::new(server.uri());
        let response = backend
            .query(&QueryRequest {
                file_id: Some("doc-1".to_string()),
                filename: Some("manual.pdf".to_string()),
                query: "What is on page 3?".to_string(),
                query_type: QueryType::Freeform,
                use_rag: true,
                history: Vec::new(),
            })
            .await
            .unwrap();

        assert_eq!(response.answer, "A diagram.");
        assert_eq!(response.sources.unwrap()[0].page, Some(3));
    }

    #[tokio::test]
    async fn non_success_status_is_reported_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
            .mount(&server)
            .await;

        let err = HttpBackend::new(server.uri()).health().await.unwrap_err();
        match err {
            PortError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "warming up");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn refused_connection_is_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = HttpBackend::new(format!("http://127.0.0.1:{port}"))
            .health()
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Unreachable(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn slow_answers_are_not_cut_off_by_the_connect_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "ok"}))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;

        let backend = HttpBackend::with_connect_timeout(server.uri(), Duration::from_millis(50));
        let status = backend.health().await.unwrap();

        assert!(status.is_ok());
    }
}
