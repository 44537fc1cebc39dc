//! Backend access for the session manager. [`AuthBackend`] is the seam the
//! manager is generic over; [`HttpBackend`] implements it with `reqwest` against
//! the DoIt API. Bearer tokens and passwords are attached to requests but never
//! logged.

use crate::{APP_USER_AGENT, error::ClientError, identity::IdentityPayload};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::future::Future;
use tracing::{Instrument, debug, info_span};
use url::Url;

/// Maximum number of error body characters kept in [`ClientError::Http`].
const MAX_ERROR_CHARS: usize = 200;

/// Body returned by both login endpoints.
#[derive(Clone, Debug, Deserialize)]
pub struct LoginResponse {
    pub token: Option<String>,
    pub user: Option<IdentityPayload>,
}

/// The four backend operations the session manager depends on.
pub trait AuthBackend {
    /// Resolves a token as a regular (user or provider) account.
    fn resolve_user(
        &self,
        token: &SecretString,
    ) -> impl Future<Output = Result<IdentityPayload, ClientError>> + Send;

    /// Resolves a token as an admin account.
    fn resolve_admin(
        &self,
        token: &SecretString,
    ) -> impl Future<Output = Result<IdentityPayload, ClientError>> + Send;

    /// Exchanges email and password for a token.
    fn authenticate_user(
        &self,
        email: &str,
        password: &SecretString,
    ) -> impl Future<Output = Result<LoginResponse, ClientError>> + Send;

    /// Exchanges admin id and password for a token.
    fn authenticate_admin(
        &self,
        admin_id: &str,
        password: &SecretString,
    ) -> impl Future<Output = Result<LoginResponse, ClientError>> + Send;
}

/// Endpoint paths relative to the API base URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub resolve_user: String,
    pub resolve_admin: String,
    pub login: String,
    pub admin_login: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            resolve_user: "/api/auth/user".to_string(),
            resolve_admin: "/api/auth/admin".to_string(),
            login: "/api/auth/login".to_string(),
            admin_login: "/api/auth/admin-login".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    endpoints: Endpoints,
}

impl HttpBackend {
    /// Builds a backend for `base_url` with the default endpoint paths.
    ///
    /// # Errors
    /// Returns [`ClientError::Config`] if the URL is not absolute http(s) or the
    /// HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_endpoints(base_url, Endpoints::default())
    }

    /// # Errors
    /// Same as [`HttpBackend::new`].
    pub fn with_endpoints(base_url: &str, endpoints: Endpoints) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url.trim())
            .map_err(|err| ClientError::Config(format!("invalid API base URL: {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "unsupported API base URL scheme: {}",
                parsed.scheme()
            )));
        }

        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .map_err(|err| ClientError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            endpoints,
        })
    }

    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn url(&self, path: &str) -> String {
        build_url_with_base(&self.base_url, path)
    }

    async fn get_with_bearer<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &SecretString,
    ) -> Result<T, ClientError> {
        let url = self.url(path);
        let span = info_span!("doit.get", http.method = "GET", url = %url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token.expose_secret())
            .send()
            .instrument(span)
            .await
            .map_err(map_request_error)?;

        handle_json_response(response).await
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, ClientError> {
        let url = self.url(path);
        let span = info_span!("doit.post", http.method = "POST", url = %url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .instrument(span)
            .await
            .map_err(map_request_error)?;

        handle_json_response(response).await
    }
}

impl AuthBackend for HttpBackend {
    async fn resolve_user(&self, token: &SecretString) -> Result<IdentityPayload, ClientError> {
        self.get_with_bearer(&self.endpoints.resolve_user, token).await
    }

    async fn resolve_admin(&self, token: &SecretString) -> Result<IdentityPayload, ClientError> {
        self.get_with_bearer(&self.endpoints.resolve_admin, token).await
    }

    async fn authenticate_user(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<LoginResponse, ClientError> {
        let payload = json!({
            "email": email,
            "password": password.expose_secret(),
        });
        self.post_json(&self.endpoints.login, &payload).await
    }

    async fn authenticate_admin(
        &self,
        admin_id: &str,
        password: &SecretString,
    ) -> Result<LoginResponse, ClientError> {
        let payload = json!({
            "adminId": admin_id,
            "password": password.expose_secret(),
        });
        self.post_json(&self.endpoints.admin_login, &payload).await
    }
}

/// Joins a base URL and a path with exactly one slash between them.
fn build_url_with_base(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

fn map_request_error(err: reqwest::Error) -> ClientError {
    if err.is_builder() {
        ClientError::Serialization(format!("Failed to build request: {err}"))
    } else {
        ClientError::Network(format!("Unable to reach the server: {err}"))
    }
}

async fn handle_json_response<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        let body = response
            .bytes()
            .await
            .map_err(|err| ClientError::Network(format!("Failed to read response: {err}")))?;
        serde_json::from_slice::<T>(&body)
            .map_err(|err| ClientError::Parse(format!("Failed to decode response: {err}")))
    } else {
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), "backend rejected request");
        Err(ClientError::Http {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }
}

/// Prefers the JSON `message` field, then the raw body, trimmed and truncated.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(message) = value.get("message").and_then(Value::as_str) {
            return sanitize_body(message);
        }
    }
    sanitize_body(body)
}

fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::identity::RoleTag;
    use std::net::TcpListener;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    #[test]
    fn build_url_joins_slashes() {
        assert_eq!(
            build_url_with_base("https://api.doit.dev/", "/api/auth/user"),
            "https://api.doit.dev/api/auth/user"
        );
        assert_eq!(
            build_url_with_base(" https://api.doit.dev ", "api/auth/user"),
            "https://api.doit.dev/api/auth/user"
        );
        assert_eq!(build_url_with_base("", "/api/auth/user"), "/api/auth/user");
    }

    #[test]
    fn error_message_prefers_json_message() {
        assert_eq!(
            error_message(r#"{"message": "Admin not found"}"#),
            "Admin not found"
        );
        assert_eq!(error_message("  plain failure \n"), "plain failure");
        assert_eq!(error_message(""), "Request failed.");
        assert_eq!(error_message(&"x".repeat(500)).len(), MAX_ERROR_CHARS);
    }

    #[test]
    fn rejects_non_http_base_url() {
        assert!(matches!(
            HttpBackend::new("ftp://api.doit.dev"),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            HttpBackend::new("not a url"),
            Err(ClientError::Config(_))
        ));
    }

    #[tokio::test]
    async fn resolve_user_sends_bearer_token() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/user"))
            .and(header("Authorization", "Bearer T1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Bob",
                "email": "bob@example.com",
                "role": "provider"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = HttpBackend::new(&server.uri()).unwrap();
        let payload = backend
            .resolve_user(&SecretString::from("T1"))
            .await
            .unwrap();
        assert_eq!(payload.name, "Bob");
        assert_eq!(payload.role, RoleTag::Provider);
    }

    #[tokio::test]
    async fn resolve_admin_maps_unauthorized() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/admin"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Unauthorized"})),
            )
            .mount(&server)
            .await;

        let backend = HttpBackend::new(&server.uri()).unwrap();
        let result = backend.resolve_admin(&SecretString::from("T1")).await;
        assert_eq!(
            result.unwrap_err(),
            ClientError::Http {
                status: 401,
                message: "Unauthorized".to_string()
            }
        );
    }

    #[tokio::test]
    async fn garbage_body_is_a_parse_error() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/user"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let backend = HttpBackend::new(&server.uri()).unwrap();
        let result = backend.resolve_user(&SecretString::from("T1")).await;
        assert!(matches!(result, Err(ClientError::Parse(_))));
    }

    #[tokio::test]
    async fn authenticate_user_posts_credentials() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_json(json!({"email": "a@b.com", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "T1",
                "user": {"name": "Ann", "role": "user"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = HttpBackend::new(&server.uri()).unwrap();
        let response = backend
            .authenticate_user("a@b.com", &SecretString::from("pw"))
            .await
            .unwrap();
        assert_eq!(response.token.as_deref(), Some("T1"));
        assert_eq!(response.user.unwrap().name, "Ann");
    }

    #[tokio::test]
    async fn authenticate_admin_posts_admin_id() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/admin-login"))
            .and(body_json(json!({"adminId": "A1", "password": "pw"})))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(json!({"message": "Invalid admin"})),
            )
            .mount(&server)
            .await;

        let backend = HttpBackend::new(&server.uri()).unwrap();
        let result = backend
            .authenticate_admin("A1", &SecretString::from("pw"))
            .await;
        assert!(matches!(
            result,
            Err(ClientError::Http { status: 403, ref message }) if message == "Invalid admin"
        ));
    }

    #[tokio::test]
    async fn custom_endpoints_are_used() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/me"))
            .and(header("Authorization", "Bearer T1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"name": "Bob", "role": "user"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/admin/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Ann",
                "role": "admin",
                "adminId": "A1"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v2/sessions"))
            .and(body_json(json!({"email": "a@b.com", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "T2"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v2/admin/sessions"))
            .and(body_json(json!({"adminId": "A1", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "T3"})))
            .expect(1)
            .mount(&server)
            .await;

        let endpoints = Endpoints {
            resolve_user: "/v2/me".to_string(),
            resolve_admin: "/v2/admin/me".to_string(),
            login: "/v2/sessions".to_string(),
            admin_login: "/v2/admin/sessions".to_string(),
        };
        let backend = HttpBackend::with_endpoints(&server.uri(), endpoints.clone()).unwrap();
        assert_eq!(backend.endpoints(), &endpoints);

        let token = SecretString::from("T1");
        let password = SecretString::from("pw");
        assert_eq!(backend.resolve_user(&token).await.unwrap().name, "Bob");
        assert_eq!(
            backend.resolve_admin(&token).await.unwrap().admin_id.as_deref(),
            Some("A1")
        );
        let login = backend.authenticate_user("a@b.com", &password).await.unwrap();
        assert_eq!(login.token.as_deref(), Some("T2"));
        let admin = backend.authenticate_admin("A1", &password).await.unwrap();
        assert_eq!(admin.token.as_deref(), Some("T3"));
    }

    #[test]
    fn default_endpoints() {
        let backend = HttpBackend::new("https://api.doit.dev").unwrap();
        assert_eq!(backend.endpoints(), &Endpoints::default());
        assert_eq!(backend.endpoints().admin_login, "/api/auth/admin-login");
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0");
        let Ok(listener) = listener else {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        };
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = HttpBackend::new(&format!("http://{addr}")).unwrap();
        let result = backend.resolve_user(&SecretString::from("T1")).await;
        assert!(matches!(result, Err(ClientError::Network(_))));
    }
}
