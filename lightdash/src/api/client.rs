use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use super::common::{ApiErrorResponse, ApiQueryParams, ApiResponse};
use super::error::ApiError;

/// Longest wait between two attempts
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Lightdash API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    auth_header: String,
    config: ClientConfig,
    permits: Semaphore,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub max_concurrent_requests: usize,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 5,
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(host: &str, api_key: &str) -> Result<Self, ApiError> {
        Self::with_config(host, api_key, ClientConfig::default())
    }

    pub fn with_config(host: &str, api_key: &str, config: ClientConfig) -> Result<Self, ApiError> {
        let parsed = url::Url::parse(host).map_err(|e| ApiError::InvalidUrl(format!("{host}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "{host}: scheme must be http or https"
            )));
        }

        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("terraform-provider-lightdash/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let permits = Semaphore::new(
            config
                .max_concurrent_requests
                .clamp(1, Semaphore::MAX_PERMITS),
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: host.trim_end_matches('/').to_string(),
                auth_header: format!("ApiKey {}", api_key),
                config,
                permits,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute_with_retry(Method::GET, path, None::<&()>).await
    }

    pub async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<T, ApiError> {
        let full_path = format!("{}{}", path, params.to_query_string());
        self.get(&full_path).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute_with_retry(Method::POST, path, Some(body)).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute_with_retry(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute_with_retry(Method::DELETE, path, None::<&()>).await
    }

    pub fn organization(&self) -> super::organization::OrganizationApi<'_> {
        super::organization::OrganizationApi::new(self)
    }

    pub fn user(&self) -> super::user::UserApi<'_> {
        super::user::UserApi::new(self)
    }

    pub fn projects(&self) -> super::projects::ProjectsApi<'_> {
        super::projects::ProjectsApi::new(self)
    }

    pub fn spaces(&self) -> super::spaces::SpacesApi<'_> {
        super::spaces::SpacesApi::new(self)
    }

    pub fn content(&self) -> super::content::ContentApi<'_> {
        super::content::ContentApi::new(self)
    }

    pub fn groups(&self) -> super::groups::GroupsApi<'_> {
        super::groups::GroupsApi::new(self)
    }

    pub fn members(&self) -> super::members::MembersApi<'_> {
        super::members::MembersApi::new(self)
    }

    pub fn ai_agents(&self) -> super::ai_agents::AiAgentsApi<'_> {
        super::ai_agents::AiAgentsApi::new(self)
    }

    pub fn warehouse_credentials(
        &self,
    ) -> super::warehouse_credentials::WarehouseCredentialsApi<'_> {
        super::warehouse_credentials::WarehouseCredentialsApi::new(self)
    }

    /// Runs one request, retrying transient failures with linear backoff
    async fn execute_with_retry<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.inner.base_url, path);
        let build = || {
            let request = self.inner.http_client.request(method.clone(), &url);
            match body {
                Some(body) => request.json(body),
                None => request,
            }
        };

        let max_attempts = self.inner.config.max_retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            tracing::debug!(%method, %path, attempt, "sending Lightdash API request");

            match self.attempt(build()).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable(&method) && attempt < max_attempts => {
                    let backoff = self
                        .inner
                        .config
                        .retry_backoff
                        .saturating_mul(attempt)
                        .min(MAX_BACKOFF);
                    tracing::warn!(
                        %method,
                        %path,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "retrying Lightdash API request"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// A single attempt; the permit is held until the body has been read
    async fn attempt<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let _permit = self
            .inner
            .permits
            .acquire()
            .await
            .map_err(|e| ApiError::ServiceUnavailable(format!("request limiter closed: {e}")))?;

        let response = request
            .header(AUTHORIZATION, &self.inner.auth_header)
            .header(ACCEPT, "application/json")
            .timeout(self.inner.config.request_timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if response.status().is_success() {
            self.parse_success_response(response).await
        } else {
            self.handle_error_response(response).await
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout(self.inner.config.request_timeout.as_secs())
        } else if e.is_connect() {
            ApiError::ServiceUnavailable(e.to_string())
        } else {
            ApiError::Request(e)
        }
    }

    async fn parse_success_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        let envelope = if text.trim().is_empty() {
            ApiResponse {
                status: "ok".to_string(),
                results: serde_json::Value::Null,
            }
        } else {
            serde_json::from_str::<ApiResponse>(&text).map_err(|e| {
                tracing::error!(error = %e, body = %text, "failed to deserialize response envelope");
                ApiError::ParseError(format!("invalid response envelope: {}", e))
            })?
        };

        if envelope.status != "ok" {
            return Err(ApiError::ParseError(format!(
                "unexpected response status '{}'",
                envelope.status
            )));
        }

        serde_json::from_value(envelope.results).map_err(|e| {
            tracing::error!(error = %e, body = %text, "failed to deserialize response results");
            ApiError::ParseError(format!("invalid response results: {}", e))
        })
    }

    async fn handle_error_response<T>(&self, response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let (name, message) = match serde_json::from_str::<ApiErrorResponse>(&text) {
            Ok(parsed) => (
                parsed.error.name.unwrap_or_else(|| "Error".to_string()),
                parsed.error.message.unwrap_or_else(|| text.clone()),
            ),
            Err(_) => ("Error".to_string(), text),
        };

        tracing::debug!(status, %name, %message, "Lightdash API error");

        Err(match status {
            401 => ApiError::AuthError(message),
            403 => ApiError::Forbidden(message),
            404 => ApiError::NotFound(message),
            _ => ApiError::Api {
                status,
                name,
                message,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Org {
        organization_uuid: String,
    }

    fn fast_config(max_retries: u32) -> ClientConfig {
        ClientConfig {
            max_concurrent_requests: 2,
            request_timeout: Duration::from_secs(5),
            max_retries,
            retry_backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn get_unwraps_results_and_sends_api_key() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/org")
            .match_header("authorization", "ApiKey secret")
            .with_body(r#"{"status":"ok","results":{"organizationUuid":"org-1"}}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret").unwrap();
        let org: Org = client.get("/api/v1/org").await.unwrap();

        assert_eq!(org.organization_uuid, "org-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_strips_trailing_slash_from_host() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api/v1/groups/g1")
            .with_body(r#"{"status":"ok","results":null}"#)
            .create_async()
            .await;

        let client = Client::new(&format!("{}/", server.url()), "secret").unwrap();
        let () = client.delete("/api/v1/groups/g1").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_results_decode_as_unit() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("PATCH", "/api/v1/org/users/u1")
            .match_body(Matcher::Json(serde_json::json!({"role": "editor"})))
            .with_body(r#"{"status":"ok"}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret").unwrap();
        let result: Result<(), _> = client
            .patch("/api/v1/org/users/u1", &serde_json::json!({"role": "editor"}))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn status_codes_map_to_error_variants() {
        let mut server = Server::new_async().await;
        let _missing = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body(r#"{"status":"error","error":{"statusCode":404,"name":"NotFoundError","message":"Space not found"}}"#)
            .create_async()
            .await;
        let _unauthorized = server
            .mock("GET", "/unauthorized")
            .with_status(401)
            .with_body(r#"{"status":"error","error":{"statusCode":401,"name":"AuthorizationError","message":"Invalid API key"}}"#)
            .create_async()
            .await;
        let _forbidden = server
            .mock("GET", "/forbidden")
            .with_status(403)
            .with_body("plain text")
            .create_async()
            .await;
        let _invalid = server
            .mock("POST", "/invalid")
            .with_status(422)
            .with_body(r#"{"status":"error","error":{"statusCode":422,"name":"ParameterError","message":"name is required"}}"#)
            .create_async()
            .await;

        let client = Client::with_config(&server.url(), "secret", fast_config(0)).unwrap();

        let err = client.get::<Org>("/missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("Space not found"));

        let err = client.get::<Org>("/unauthorized").await.unwrap_err();
        assert!(matches!(err, ApiError::AuthError(ref m) if m == "Invalid API key"));

        let err = client.get::<Org>("/forbidden").await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(ref m) if m == "plain text"));

        let err = client
            .post::<Org, _>("/invalid", &serde_json::json!({}))
            .await
            .unwrap_err();
        match err {
            ApiError::Api {
                status,
                name,
                message,
            } => {
                assert_eq!(status, 422);
                assert_eq!(name, "ParameterError");
                assert_eq!(message, "name is required");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_errors_are_retried_until_exhausted() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/org")
            .with_status(503)
            .with_body(r#"{"status":"error","error":{"statusCode":503,"name":"UnexpectedServerError","message":"down"}}"#)
            .expect(3)
            .create_async()
            .await;

        let client = Client::with_config(&server.url(), "secret", fast_config(2)).unwrap();
        let err = client.get::<Org>("/api/v1/org").await.unwrap_err();

        assert_eq!(err.status(), Some(503));
        mock.assert_async().await;
    }

    fn slow_config(max_retries: u32) -> ClientConfig {
        ClientConfig {
            request_timeout: Duration::from_secs(1),
            ..fast_config(max_retries)
        }
    }

    fn slow_reply(_: &mockito::Request) -> Vec<u8> {
        std::thread::sleep(Duration::from_millis(1500));
        br#"{"status":"ok","results":{"organizationUuid":"org-1"}}"#.to_vec()
    }

    #[tokio::test]
    async fn timed_out_post_is_sent_once() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/projects/p1/spaces")
            .with_body_from_request(slow_reply)
            .expect(1)
            .create_async()
            .await;

        let client = Client::with_config(&server.url(), "secret", slow_config(2)).unwrap();
        let err = client
            .post::<Org, _>("/api/v1/projects/p1/spaces", &serde_json::json!({"name": "x"}))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Timeout(1)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn timed_out_get_is_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/org")
            .with_body_from_request(slow_reply)
            .expect(2)
            .create_async()
            .await;

        let client = Client::with_config(&server.url(), "secret", slow_config(1)).unwrap();
        let err = client.get::<Org>("/api/v1/org").await.unwrap_err();

        assert!(matches!(err, ApiError::Timeout(1)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn post_server_errors_are_not_resent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/projects/p1/spaces")
            .with_status(500)
            .with_body(r#"{"status":"error","error":{"statusCode":500,"name":"UnexpectedServerError","message":"boom"}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = Client::with_config(&server.url(), "secret", fast_config(3)).unwrap();
        let err = client
            .post::<Org, _>("/api/v1/projects/p1/spaces", &serde_json::json!({"name": "x"}))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn extreme_limits_do_not_panic() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/org")
            .with_status(400)
            .with_body(r#"{"status":"error","error":{"statusCode":400,"name":"ParameterError","message":"bad"}}"#)
            .expect(1)
            .create_async()
            .await;

        let config = ClientConfig {
            max_concurrent_requests: usize::MAX,
            request_timeout: Duration::from_secs(5),
            max_retries: u32::MAX,
            retry_backoff: Duration::MAX,
        };
        let client = Client::with_config(&server.url(), "secret", config).unwrap();
        assert_eq!(client.get::<Org>("/api/v1/org").await.unwrap_err().status(), Some(400));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/org")
            .with_status(400)
            .with_body(r#"{"status":"error","error":{"statusCode":400,"name":"ParameterError","message":"bad"}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = Client::with_config(&server.url(), "secret", fast_config(3)).unwrap();
        assert!(client.get::<Org>("/api/v1/org").await.is_err());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn malformed_success_body_is_a_parse_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/org")
            .with_body("not json")
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret").unwrap();
        let err = client.get::<Org>("/api/v1/org").await.unwrap_err();
        assert!(matches!(err, ApiError::ParseError(_)));
    }

    #[tokio::test]
    async fn connection_failures_become_service_unavailable() {
        let client =
            Client::with_config("http://127.0.0.1:9", "secret", fast_config(1)).unwrap();
        let err = client.get::<Org>("/api/v1/org").await.unwrap_err();
        assert!(matches!(err, ApiError::ServiceUnavailable(_)));
    }

    #[test]
    fn invalid_hosts_are_rejected() {
        assert!(matches!(
            Client::new("not a url", "secret"),
            Err(ApiError::InvalidUrl(_))
        ));
        assert!(matches!(
            Client::new("ftp://lightdash.example.com", "secret"),
            Err(ApiError::InvalidUrl(_))
        ));
    }
}
