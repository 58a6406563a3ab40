// # Cherry Servers API Client
//
// HTTP implementation of the `ProjectClient` and `IpClient` traits against
// the Cherry Servers REST API v1.
//
// ## Behaviour
//
// - One HTTP request per trait call; no retries, no caching
// - HTTP timeout configured (30 seconds)
// - Non-2xx responses become `ApiError` carrying the status code and the
//   API's error message, so controllers can recognise 404
// - Transport failures become `ApiError` without a response
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - `CHERRY_AUTH_TOKEN` overrides the configured token
// - Client creation fails fast if the token is empty
//
// ## API Reference
//
// - Projects: POST `/teams/:team_id/projects`, GET/PUT/DELETE `/projects/:id`
// - IP addresses: POST `/projects/:project_id/ips`, GET/PUT/DELETE `/ips/:id`

use async_trait::async_trait;
use cherry_core::config::ProviderConfig;
use cherry_core::registry::ResourceRegistry;
use cherry_core::resource::{IpAddressController, ProjectController};
use cherry_core::traits::{
    ApiError, ApiResult, CreateIpAddress, CreateProject, IpAddress, IpClient, IpClientFactory,
    Project, ProjectClient, ProjectClientFactory, Response, UpdateIpAddress, UpdateProject,
};
use cherry_core::{Error, Result};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Cherry Servers API base URL
pub const CHERRY_API_BASE: &str = "https://api.cherryservers.com/v1";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Cherry Servers API client
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CherryClient {
    /// API token
    /// ⚠️ NEVER log this value
    token: String,

    /// Base URL without trailing slash
    base_url: String,

    /// HTTP client for API requests
    http: reqwest::Client,
}

impl std::fmt::Debug for CherryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CherryClient")
            .field("token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CherryClient {
    /// Create a client
    ///
    /// # Parameters
    ///
    /// - `token`: Cherry Servers API token
    /// - `base_url`: API root, e.g. [`CHERRY_API_BASE`]
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)`: If the token is empty or the HTTP client cannot be built
    pub fn new(token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(Error::config("Cherry Servers API token is required"));
        }

        let http = Self::http_builder()
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self::with_http(token, base_url, http))
    }

    fn http_builder() -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .user_agent(concat!("cherry-provider/", env!("CARGO_PKG_VERSION")))
    }

    fn with_http(token: String, base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            token,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Create a client from provider configuration, without env overrides
    pub fn from_config(config: &ProviderConfig, base_url: impl Into<String>) -> Result<Self> {
        Self::new(config.token.clone(), base_url)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!("{} {}", method, path);
        self.http
            .request(method, self.url(path))
            .bearer_auth(&self.token)
    }

    fn request_with<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> RequestBuilder {
        self.request(method, path).json(body)
    }

    /// Send a request and decode a JSON entity
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = Self::send_raw(request).await?;
        let meta = Response::new(response.status().as_u16());

        let entity = response.json::<T>().await.map_err(|e| ApiError {
            response: Some(meta),
            message: format!("failed to decode response: {}", e),
        })?;

        Ok((entity, meta))
    }

    /// Send a request whose response body is ignored
    async fn send_empty(&self, request: RequestBuilder) -> std::result::Result<Response, ApiError> {
        let response = Self::send_raw(request).await?;
        Ok(Response::new(response.status().as_u16()))
    }

    async fn send_raw(
        request: RequestBuilder,
    ) -> std::result::Result<reqwest::Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::transport(format!("request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::with_status(
            status.as_u16(),
            error_message(status, &body),
        ))
    }
}

/// Extract the API's error message from a failed response body
///
/// The API answers errors with `{"code": .., "message": ".."}`; anything
/// else falls back to the raw body or the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string));

    match parsed {
        Some(message) if !message.is_empty() => message,
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    }
}

#[async_trait]
impl ProjectClient for CherryClient {
    async fn create(&self, team_id: i64, request: &CreateProject) -> ApiResult<Project> {
        let path = format!("/teams/{}/projects", team_id);
        self.send(self.request_with(Method::POST, &path, request))
            .await
    }

    async fn get(&self, project_id: i64) -> ApiResult<Project> {
        let path = format!("/projects/{}", project_id);
        self.send(self.request(Method::GET, &path)).await
    }

    async fn update(&self, project_id: i64, request: &UpdateProject) -> ApiResult<Project> {
        let path = format!("/projects/{}", project_id);
        self.send(self.request_with(Method::PUT, &path, request))
            .await
    }

    async fn delete(&self, project_id: i64) -> std::result::Result<Response, ApiError> {
        let path = format!("/projects/{}", project_id);
        self.send_empty(self.request(Method::DELETE, &path)).await
    }
}

#[async_trait]
impl IpClient for CherryClient {
    async fn create(&self, project_id: i64, request: &CreateIpAddress) -> ApiResult<IpAddress> {
        let path = format!("/projects/{}/ips", project_id);
        self.send(self.request_with(Method::POST, &path, request))
            .await
    }

    async fn get(&self, ip_id: &str) -> ApiResult<IpAddress> {
        let path = format!("/ips/{}", ip_id);
        self.send(self.request(Method::GET, &path)).await
    }

    async fn update(&self, ip_id: &str, request: &UpdateIpAddress) -> ApiResult<IpAddress> {
        let path = format!("/ips/{}", ip_id);
        self.send(self.request_with(Method::PUT, &path, request))
            .await
    }

    async fn delete(&self, ip_id: &str) -> std::result::Result<Response, ApiError> {
        let path = format!("/ips/{}", ip_id);
        self.send_empty(self.request(Method::DELETE, &path)).await
    }
}

/// Factory for [`CherryClient`]
///
/// Applies the `CHERRY_AUTH_TOKEN` override on every call, so a token
/// exported after startup is picked up by the next operation.
#[derive(Debug, Clone)]
pub struct CherryClientFactory {
    base_url: String,
}

impl CherryClientFactory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn build(&self, config: &ProviderConfig) -> Result<CherryClient> {
        let config = config.clone().with_env_override();
        CherryClient::from_config(&config, self.base_url.clone())
    }
}

impl Default for CherryClientFactory {
    fn default() -> Self {
        Self::new(CHERRY_API_BASE)
    }
}

impl ProjectClientFactory for CherryClientFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn ProjectClient>> {
        Ok(Box::new(self.build(config)?))
    }
}

impl IpClientFactory for CherryClientFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn IpClient>> {
        Ok(Box::new(self.build(config)?))
    }
}

/// Register the HTTP-backed project and IP address controllers
///
/// # Parameters
///
/// - `registry`: Registry to add the controllers to
/// - `config`: Provider configuration handed to every client creation
/// - `base_url`: API root, e.g. [`CHERRY_API_BASE`]
pub fn register(
    registry: &ResourceRegistry,
    config: &ProviderConfig,
    base_url: impl Into<String>,
) -> Result<()> {
    let factory = Arc::new(CherryClientFactory::new(base_url));

    registry.register(ProjectController::new(factory.clone(), config.clone()))?;
    registry.register(IpAddressController::new(factory, config.clone())?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn local_client(token: &str, base: String) -> CherryClient {
        let http = CherryClient::http_builder().no_proxy().build().unwrap();
        CherryClient::with_http(token.to_string(), base, http)
    }

    /// Serve one canned HTTP response and return the raw request
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|line| {
                            let lower = line.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if raw.len() >= end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&raw).to_string()
        });

        (base, handle)
    }

    #[test]
    fn test_empty_token_rejected() {
        let err = CherryClient::from_config(&ProviderConfig::new(""), CHERRY_API_BASE).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_api_token_not_exposed_in_debug() {
        let client = CherryClient::new("super-secret-token", CHERRY_API_BASE).unwrap();
        let debug = format!("{:?}", client);

        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("<REDACTED>"));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = CherryClient::new("token", "https://api.example.com/v1/").unwrap();
        assert_eq!(client.url("/ips/abc"), "https://api.example.com/v1/ips/abc");
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(
                StatusCode::NOT_FOUND,
                r#"{"code": 404, "message": "Project not found"}"#
            ),
            "Project not found"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "upstream down\n"),
            "upstream down"
        );
        assert_eq!(
            error_message(StatusCode::SERVICE_UNAVAILABLE, ""),
            "Service Unavailable"
        );
    }

    #[tokio::test]
    async fn test_create_project_posts_to_team() {
        let (base, server) = serve_once(
            "HTTP/1.1 201 Created",
            r#"{"id": 148226, "name": "web", "bgp": {"enabled": false, "local_asn": 0}, "href": "/projects/148226"}"#,
        )
        .await;
        let client = local_client("token-123", base);

        let (project, response) = ProjectClient::create(
            &client,
            1,
            &CreateProject {
                name: "web".into(),
                bgp: false,
            },
        )
        .await
        .unwrap();

        assert_eq!(project.id, 148226);
        assert_eq!(response.status, 201);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /teams/1/projects "));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer token-123"));
        assert!(request.contains(r#""name":"web""#));
    }

    #[tokio::test]
    async fn test_not_found_carries_status() {
        let (base, server) = serve_once(
            "HTTP/1.1 404 Not Found",
            r#"{"code": 404, "message": "IP address not found"}"#,
        )
        .await;
        let client = local_client("token", base);

        let err = IpClient::get(&client, "a1b2").await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.message, "IP address not found");
        assert!(server.await.unwrap().starts_with("GET /ips/a1b2 "));
    }

    #[tokio::test]
    async fn test_transport_failure_has_no_response() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = local_client("token", base);
        let err = ProjectClient::delete(&client, 1).await.unwrap_err();

        assert!(err.response.is_none());
        assert!(!err.is_not_found());
    }
}
