//! GeminiClient - single HTTP calls against the Gemini REST API.
//!
//! Every call takes the credential to use explicitly; choosing which
//! credential to use is the job of [`super::rotation`].

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::credentials::Credential;
use super::retry::Transient;
use super::types::{
    ApiErrorEnvelope, GenerateContentRequest, GenerateContentResponse, Operation,
    PredictLongRunningRequest,
};

/// Default base URL for the Gemini API.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// API version path segment.
const API_VERSION: &str = "v1beta";

/// Header carrying the API key on API calls.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Default timeout for HTTP requests. Image and speech calls are slow.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const HTTP_STATUS_BAD_REQUEST: u16 = 400;
const HTTP_STATUS_UNAUTHORIZED: u16 = 401;
const HTTP_STATUS_FORBIDDEN: u16 = 403;
const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Reason code the provider attaches to an unknown or revoked key.
const API_KEY_INVALID_REASON: &str = "API_KEY_INVALID";

/// Machine-checkable classification of an upstream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    /// Connection refused, DNS failure, timeout, or a body cut short.
    Network,
    /// 502, 503 or 504 from the provider.
    Unavailable,
    /// 429 Too Many Requests.
    RateLimited,
    /// The provider explicitly rejected the credential.
    RejectedCredential,
    /// The provider answered with something that is not the expected body.
    Malformed,
    /// Any other error response.
    Api,
}

impl UpstreamErrorKind {
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Network | Self::Unavailable)
    }
}

/// A failed upstream call.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct UpstreamError {
    pub kind: UpstreamErrorKind,
    /// HTTP status, when the provider answered at all.
    pub status: Option<u16>,
    pub message: String,
}

impl UpstreamError {
    pub fn new(kind: UpstreamErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    /// Classify a non-success response from its status and body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let envelope: ApiErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
        let provider_message = envelope
            .error
            .message
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| body.trim().to_string());

        let key_rejected = envelope
            .error
            .details
            .iter()
            .any(|d| d.reason.as_deref() == Some(API_KEY_INVALID_REASON))
            || provider_message.contains("API key not valid");

        let kind = match status {
            502..=504 => UpstreamErrorKind::Unavailable,
            HTTP_STATUS_TOO_MANY_REQUESTS => UpstreamErrorKind::RateLimited,
            HTTP_STATUS_UNAUTHORIZED | HTTP_STATUS_FORBIDDEN => {
                UpstreamErrorKind::RejectedCredential
            }
            HTTP_STATUS_BAD_REQUEST if key_rejected => UpstreamErrorKind::RejectedCredential,
            _ => UpstreamErrorKind::Api,
        };

        Self {
            kind,
            status: Some(status),
            message: format!("status {}: {}", status, provider_message),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

impl Transient for UpstreamError {
    fn is_transient(&self) -> bool {
        UpstreamError::is_transient(self)
    }
}

/// The request URL is dropped from the message: media URLs carry the key.
impl From<reqwest::Error> for UpstreamError {
    fn from(error: reqwest::Error) -> Self {
        let error = error.without_url();
        let kind = if is_transient_network_error(&error) {
            UpstreamErrorKind::Network
        } else if error.is_decode() {
            UpstreamErrorKind::Malformed
        } else {
            UpstreamErrorKind::Api
        };
        Self {
            kind,
            status: error.status().map(|s| s.as_u16()),
            message: error.to_string(),
        }
    }
}

/// Determine if a reqwest error is a transport failure worth retrying.
///
/// Connection errors, timeouts, failures during body transfer, and gateway
/// statuses count as transient.
pub fn is_transient_network_error(error: &reqwest::Error) -> bool {
    if error.is_connect() || error.is_timeout() || error.is_body() {
        return true;
    }

    if let Some(status) = error.status() {
        return matches!(status.as_u16(), 502..=504);
    }

    false
}

/// Client for the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl GeminiClient {
    /// Create a client for the public Gemini endpoint.
    pub fn new() -> Result<Self, UpstreamError> {
        Self::with_base_url(GEMINI_API_BASE_URL)
    }

    /// Create a client with a custom base URL.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, UpstreamError> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Call `models/{model}:generateContent`.
    pub async fn generate_content(
        &self,
        credential: &Credential,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, UpstreamError> {
        let url = format!(
            "{}/{}/models/{}:generateContent",
            self.base_url, API_VERSION, model
        );
        self.post_json(credential, &url, request).await
    }

    /// Start a long-running video generation via `models/{model}:predictLongRunning`.
    pub async fn submit_video(
        &self,
        credential: &Credential,
        model: &str,
        request: &PredictLongRunningRequest,
    ) -> Result<Operation, UpstreamError> {
        let url = format!(
            "{}/{}/models/{}:predictLongRunning",
            self.base_url, API_VERSION, model
        );
        self.post_json(credential, &url, request).await
    }

    /// Fetch the current state of a long-running operation by name.
    pub async fn get_operation(
        &self,
        credential: &Credential,
        name: &str,
    ) -> Result<Operation, UpstreamError> {
        let url = format!("{}/{}/{}", self.base_url, API_VERSION, name);
        log::debug!("Polling operation {}", name);

        let response = self
            .http_client
            .get(&url)
            .header(API_KEY_HEADER, credential.expose())
            .send()
            .await?;
        Self::read_json(response).await
    }

    /// GET a media locator with the credential appended as the `key` query
    /// parameter. The response status is left for the caller to judge.
    pub async fn fetch_media(
        &self,
        credential: &Credential,
        uri: &str,
    ) -> Result<reqwest::Response, UpstreamError> {
        let response = self
            .http_client
            .get(uri)
            .query(&[("key", credential.expose())])
            .send()
            .await?;
        Ok(response)
    }

    async fn post_json<B, T>(
        &self,
        credential: &Credential,
        url: &str,
        body: &B,
    ) -> Result<T, UpstreamError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http_client
            .post(url)
            .header(API_KEY_HEADER, credential.expose())
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, UpstreamError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let error = UpstreamError::from_status(status.as_u16(), &body);
            if error.kind == UpstreamErrorKind::RateLimited {
                log::warn!("Rate limited by Gemini API: {}", error.message);
            }
            return Err(error);
        }

        serde_json::from_str(&body).map_err(|e| UpstreamError {
            kind: UpstreamErrorKind::Malformed,
            status: Some(status.as_u16()),
            message: format!("unexpected response body: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_base_url_trims_trailing_slash() {
        let client = GeminiClient::with_base_url("http://localhost:1234/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:1234");
    }

    #[test]
    fn test_new_uses_public_endpoint() {
        let client = GeminiClient::new().unwrap();
        assert_eq!(client.base_url(), GEMINI_API_BASE_URL);
    }

    #[test]
    fn test_transient_kinds() {
        assert!(UpstreamErrorKind::Network.is_transient());
        assert!(UpstreamErrorKind::Unavailable.is_transient());
        assert!(!UpstreamErrorKind::RateLimited.is_transient());
        assert!(!UpstreamErrorKind::RejectedCredential.is_transient());
        assert!(!UpstreamErrorKind::Malformed.is_transient());
        assert!(!UpstreamErrorKind::Api.is_transient());
    }

    #[test]
    fn test_from_status_503_is_unavailable() {
        let error = UpstreamError::from_status(503, "Service Unavailable");
        assert_eq!(error.kind, UpstreamErrorKind::Unavailable);
        assert_eq!(error.status, Some(503));
        assert!(error.message.contains("503"));
        assert!(error.is_transient());
    }

    #[test]
    fn test_from_status_429_is_rate_limited() {
        let error = UpstreamError::from_status(429, "{}");
        assert_eq!(error.kind, UpstreamErrorKind::RateLimited);
    }

    #[test]
    fn test_from_status_invalid_key_reason() {
        let body = serde_json::json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT",
                "details": [{"reason": "API_KEY_INVALID"}]
            }
        })
        .to_string();
        let error = UpstreamError::from_status(400, &body);
        assert_eq!(error.kind, UpstreamErrorKind::RejectedCredential);
        assert_eq!(
            error.message,
            "status 400: API key not valid. Please pass a valid API key."
        );
    }

    #[test]
    fn test_from_status_plain_bad_request_is_api_error() {
        let body = r#"{"error": {"code": 400, "message": "Invalid JSON payload"}}"#;
        let error = UpstreamError::from_status(400, body);
        assert_eq!(error.kind, UpstreamErrorKind::Api);
        assert!(error.message.contains("Invalid JSON payload"));
    }

    #[test]
    fn test_from_status_forbidden_rejects_credential() {
        let error = UpstreamError::from_status(403, "PERMISSION_DENIED");
        assert_eq!(error.kind, UpstreamErrorKind::RejectedCredential);
    }

    #[test]
    fn test_from_status_non_json_body_is_kept() {
        let error = UpstreamError::from_status(500, "  internal boom  ");
        assert_eq!(error.kind, UpstreamErrorKind::Api);
        assert_eq!(error.message, "status 500: internal boom");
    }

    #[test]
    fn test_upstream_error_display_is_message() {
        let error = UpstreamError::new(UpstreamErrorKind::Network, "fetch failed");
        assert_eq!(error.to_string(), "fetch failed");
        assert_eq!(error.status, None);
    }

    mod mock_http_tests {
        use super::*;
        use crate::gemini::types::{GenerateContentRequest, PredictLongRunningRequest, VideoInstance};
        use wiremock::matchers::{header, method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn credential() -> Credential {
            Credential::new("test-api-key")
        }

        #[tokio::test]
        async fn test_generate_content_sends_key_header_and_model_path() {
            let mock_server = MockServer::start().await;

            Mock::given(method("POST"))
                .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
                .and(header("x-goog-api-key", "test-api-key"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "candidates": [{"content": {"parts": [{"text": "hi"}]}}]
                })))
                .expect(1)
                .mount(&mock_server)
                .await;

            let client = GeminiClient::with_base_url(mock_server.uri()).unwrap();
            let response = client
                .generate_content(
                    &credential(),
                    "gemini-2.5-flash",
                    &GenerateContentRequest::text("hello"),
                )
                .await
                .unwrap();

            assert_eq!(response.text().as_deref(), Some("hi"));
        }

        #[tokio::test]
        async fn test_generate_content_maps_503_to_unavailable() {
            let mock_server = MockServer::start().await;

            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
                .mount(&mock_server)
                .await;

            let client = GeminiClient::with_base_url(mock_server.uri()).unwrap();
            let error = client
                .generate_content(&credential(), "m", &GenerateContentRequest::text("x"))
                .await
                .unwrap_err();

            assert_eq!(error.kind, UpstreamErrorKind::Unavailable);
            assert_eq!(error.status, Some(503));
        }

        #[tokio::test]
        async fn test_generate_content_malformed_json_body() {
            let mock_server = MockServer::start().await;

            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
                .mount(&mock_server)
                .await;

            let client = GeminiClient::with_base_url(mock_server.uri()).unwrap();
            let error = client
                .generate_content(&credential(), "m", &GenerateContentRequest::text("x"))
                .await
                .unwrap_err();

            assert_eq!(error.kind, UpstreamErrorKind::Malformed);
        }

        #[tokio::test]
        async fn test_connection_refused_is_network_error() {
            let client = GeminiClient::with_base_url("http://127.0.0.1:9").unwrap();
            let error = client
                .generate_content(&credential(), "m", &GenerateContentRequest::text("x"))
                .await
                .unwrap_err();

            assert_eq!(error.kind, UpstreamErrorKind::Network);
            assert!(error.is_transient());
        }

        #[tokio::test]
        async fn test_submit_video_posts_to_predict_long_running() {
            let mock_server = MockServer::start().await;

            Mock::given(method("POST"))
                .and(path("/v1beta/models/veo-test:predictLongRunning"))
                .and(header("x-goog-api-key", "test-api-key"))
                .and(wiremock::matchers::body_json(serde_json::json!({
                    "instances": [{"prompt": "waves"}]
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "name": "models/veo-test/operations/op1"
                })))
                .expect(1)
                .mount(&mock_server)
                .await;

            let client = GeminiClient::with_base_url(mock_server.uri()).unwrap();
            let request = PredictLongRunningRequest {
                instances: vec![VideoInstance {
                    prompt: "waves".to_string(),
                    image: None,
                }],
            };
            let op = client
                .submit_video(&credential(), "veo-test", &request)
                .await
                .unwrap();

            assert_eq!(op.name, "models/veo-test/operations/op1");
            assert!(!op.done);
        }

        #[tokio::test]
        async fn test_get_operation_uses_operation_name_as_path() {
            let mock_server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path("/v1beta/models/veo-test/operations/op1"))
                .and(header("x-goog-api-key", "test-api-key"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "name": "models/veo-test/operations/op1",
                    "done": false
                })))
                .expect(1)
                .mount(&mock_server)
                .await;

            let client = GeminiClient::with_base_url(mock_server.uri()).unwrap();
            let op = client
                .get_operation(&credential(), "models/veo-test/operations/op1")
                .await
                .unwrap();
            assert!(!op.done);
        }

        #[tokio::test]
        async fn test_fetch_media_appends_key_query_param() {
            let mock_server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path("/files/abc:download"))
                .and(query_param("alt", "media"))
                .and(query_param("key", "test-api-key"))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
                .expect(1)
                .mount(&mock_server)
                .await;

            let client = GeminiClient::with_base_url(mock_server.uri()).unwrap();
            let response = client
                .fetch_media(
                    &credential(),
                    &format!("{}/files/abc:download?alt=media", mock_server.uri()),
                )
                .await
                .unwrap();

            assert!(response.status().is_success());
            assert_eq!(response.bytes().await.unwrap().to_vec(), vec![1u8, 2, 3]);
        }

        #[tokio::test]
        async fn test_fetch_media_transport_error_hides_key() {
            let client = GeminiClient::with_base_url("http://127.0.0.1:9").unwrap();
            let err = client
                .fetch_media(&credential(), "http://127.0.0.1:9/files/v:download?alt=media")
                .await
                .unwrap_err();

            assert_eq!(err.kind, UpstreamErrorKind::Network);
            assert!(!err.message.contains("test-api-key"));
            assert!(!err.message.contains("127.0.0.1:9"));
        }
    }
}
