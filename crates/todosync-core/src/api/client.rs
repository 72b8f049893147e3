//! API client for communicating with the to-do REST API.
//!
//! This module provides the `ApiClient` struct for making requests against
//! a fixed base URL. Authenticated calls take the bearer token as an
//! argument; the client itself never stores one.

use std::time::Duration;

use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Authentication endpoint (unauthenticated).
pub const LOGIN_PATH: &str = "/api/auth/login";

/// Registration endpoint (unauthenticated).
pub const REGISTER_PATH: &str = "/api/auth/register";

/// Current user's profile (bearer).
pub const PROFILE_PATH: &str = "/api/profile";

/// To-do collection (bearer).
pub const TODOS_PATH: &str = "/api/todos";

/// Success envelope used by every endpoint that returns a payload.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// API client for the to-do service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client for `base_url` with no transport timeout
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, None)
    }

    /// Create a new API client, optionally bounding every request by `timeout`
    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_headers(token: Option<&str>) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = token {
            let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidRequest("token is not a valid header value".to_string()))?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error built from the body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                body = %ApiError::truncate_body(&body),
                "Request rejected by server"
            );
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        token: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.url(path);
        debug!(%method, path, authenticated = token.is_some(), "Sending request");

        let mut request = self
            .client
            .request(method, &url)
            .headers(Self::auth_headers(token)?);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!(path, error = %e, "Request failed before a response arrived");
            ApiError::Network(e)
        })?;

        Self::check_response(response).await
    }

    /// Send a request and unwrap the `data` field of the response envelope.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        token: Option<&str>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.send(method, path, body, token).await?;
        let text = response.text().await?;
        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|e| {
            debug!(path, body = %ApiError::truncate_body(&text), "Unexpected response shape");
            ApiError::InvalidResponse(format!("{}: {}", path, e))
        })?;
        Ok(envelope.data)
    }

    /// Send a request whose success body carries nothing the caller needs.
    pub async fn request_unit<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        token: Option<&str>,
    ) -> Result<(), ApiError> {
        self.send(method, path, body, token).await?;
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::GET, path, None, token).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, path, Some(body), token).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<(), ApiError> {
        self.request_unit::<()>(Method::DELETE, path, None, token).await
    }
}

/// Path of a single to-do. The id is percent-encoded as one path segment.
pub fn todo_path(id: &str) -> String {
    format!("{}/{}", TODOS_PATH, urlencoding::encode(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Echo {
        value: String,
    }

    #[test]
    fn test_trailing_slash_is_stripped() {
        let api = ApiClient::new("http://localhost:3000/").expect("client");
        assert_eq!(api.base_url(), "http://localhost:3000");
        assert_eq!(api.url(TODOS_PATH), "http://localhost:3000/api/todos");
    }

    #[test]
    fn test_todo_path() {
        assert_eq!(todo_path("65f0c2"), "/api/todos/65f0c2");
        assert_eq!(todo_path("a?b"), "/api/todos/a%3Fb");
        assert_eq!(todo_path("a/b#c"), "/api/todos/a%2Fb%23c");
    }

    #[test]
    fn test_auth_headers() {
        let headers = ApiClient::auth_headers(Some("abc")).expect("headers");
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer abc");
        assert!(headers.get(header::AUTHORIZATION).unwrap().is_sensitive());

        let headers = ApiClient::auth_headers(None).expect("headers");
        assert!(headers.is_empty());

        assert!(matches!(
            ApiClient::auth_headers(Some("bad\ntoken")),
            Err(ApiError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_get_attaches_bearer_and_unwraps_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/echo"))
            .and(header_eq("Authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"value": "hi"}})))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).expect("client");
        let echo: Echo = api.get("/api/echo", Some("tok-1")).await.expect("get");
        assert_eq!(echo, Echo { value: "hi".to_string() });
    }

    #[tokio::test]
    async fn test_unauthenticated_request_sends_no_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/echo"))
            .and(body_json(json!({"value": "x"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"value": "x"}})))
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).expect("client");
        let _: Echo = api
            .post("/api/echo", &json!({"value": "x"}), None)
            .await
            .expect("post");

        let requests = server.received_requests().await.expect("recording enabled");
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_error_status_carries_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/todos/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Todo not found"})))
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).expect("client");
        let err = api.delete(&todo_path("missing"), Some("t")).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Status { status: 404, ref message } if message == "Todo not found"
        ));
    }

    #[tokio::test]
    async fn test_error_status_without_message_uses_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).expect("client");
        let err = api.get::<Echo>("/api/echo", None).await.unwrap_err();
        assert_eq!(err.status_code(), Some(500));
        assert_eq!(err.to_string(), crate::api::FALLBACK_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_missing_envelope_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": "bare"})))
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).expect("client");
        let err = api.get::<Echo>("/api/echo", None).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_delete_ignores_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).expect("client");
        api.delete(&todo_path("1"), Some("t")).await.expect("delete");
    }

    #[tokio::test]
    async fn test_delete_keeps_id_in_one_segment() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/todos/abc%3Fnot-this-one"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Todo not found"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).expect("client");
        let err = api.delete(&todo_path("abc?not-this-one"), Some("t")).await.unwrap_err();
        assert_eq!(err.status_code(), Some(404));

        let requests = server.received_requests().await.expect("recording enabled");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url.query(), None);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Reserve a port, then release it so nothing is listening.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let api = ApiClient::new(&format!("http://{}", addr)).expect("client");
        let err = api.get::<Echo>("/api/echo", None).await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }
}
