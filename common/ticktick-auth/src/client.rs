//! Authenticated REST client with transparent token refresh
//!
//! Every call carries the current bearer token. A 401 triggers exactly one
//! refresh followed by exactly one resend; anything else is surfaced to the
//! caller unchanged. Other error statuses are never retried.

use reqwest::{Client, Method, StatusCode};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::credentials::Credentials;
use crate::error::{AuthError, AuthResult};
use crate::exchange::TokenExchanger;
use crate::store::CredentialStore;

/// Tokens held by one client instance
#[derive(Clone)]
struct SessionTokens {
    access_token: String,
    refresh_token: Option<String>,
}

/// Status and raw body of one upstream response
struct RawResponse {
    status: StatusCode,
    body: String,
}

/// REST client that keeps itself authenticated
///
/// Concurrent calls that both hit a 401 each perform their own refresh;
/// refreshes are not coordinated.
pub struct AuthenticatedClient {
    http: Client,
    base_url: String,
    tokens: RwLock<SessionTokens>,
    exchanger: TokenExchanger,
    store: Option<CredentialStore>,
}

impl AuthenticatedClient {
    /// Build a client from loaded credentials
    ///
    /// Fails with [`AuthError::TokenMissing`] when no access token is
    /// available. When a store is given, refreshed tokens are written back.
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        credentials: &Credentials,
        exchanger: TokenExchanger,
        store: Option<CredentialStore>,
    ) -> AuthResult<Self> {
        let access_token = credentials
            .access_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::TokenMissing)?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens: RwLock::new(SessionTokens {
                access_token,
                refresh_token: credentials.refresh_token.clone(),
            }),
            exchanger,
            store,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Access token currently in use
    pub async fn access_token(&self) -> String {
        self.tokens.read().await.access_token.clone()
    }

    pub async fn get(&self, path: &str) -> AuthResult<Value> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Option<&Value>) -> AuthResult<Value> {
        self.request(Method::POST, path, body).await
    }

    pub async fn delete(&self, path: &str) -> AuthResult<Value> {
        self.request(Method::DELETE, path, None).await
    }

    /// Send a request, refreshing and resending once on 401
    ///
    /// 204 and empty 2xx bodies yield an empty JSON object; other 2xx bodies
    /// are returned as parsed JSON.
    #[instrument(skip(self, method, body), fields(method = %method))]
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> AuthResult<Value> {
        let url = format!("{}{}", self.base_url, path);

        let mut response = self.send(&method, &url, body).await?;

        if response.status == StatusCode::UNAUTHORIZED {
            info!("access token rejected, attempting refresh");

            let refresh_token = self.tokens.read().await.refresh_token.clone();
            let Some(refresh_token) = refresh_token else {
                warn!("no refresh token available, cannot refresh access token");
                return Err(rejected(response));
            };

            self.refresh_with(&refresh_token).await?;
            response = self.send(&method, &url, body).await?;

            if response.status == StatusCode::UNAUTHORIZED {
                warn!("request still unauthorized after token refresh");
            }
        }

        into_payload(response)
    }

    async fn send(&self, method: &Method, url: &str, body: Option<&Value>) -> AuthResult<RawResponse> {
        let token = self.access_token().await;

        let mut request = self.http.request(method.clone(), url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), "upstream response");

        Ok(RawResponse { status, body })
    }

    async fn refresh_with(&self, refresh_token: &str) -> AuthResult<()> {
        let tokens = match self.exchanger.refresh(refresh_token).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("token refresh failed: {}", e);
                return Err(e);
            }
        };

        {
            let mut current = self.tokens.write().await;
            current.access_token = tokens.access_token.clone();
            if let Some(refresh) = &tokens.refresh_token {
                current.refresh_token = Some(refresh.clone());
            }
        }

        if let Some(store) = &self.store {
            if let Err(e) = store.persist_tokens(&tokens, self.exchanger.client_credentials()) {
                warn!(path = %store.path().display(), "failed to persist refreshed tokens: {}", e);
            }
        }

        info!("access token refreshed");
        Ok(())
    }
}

fn rejected(response: RawResponse) -> AuthError {
    AuthError::ProviderRejected {
        status: response.status.as_u16(),
        body: response.body,
    }
}

fn into_payload(response: RawResponse) -> AuthResult<Value> {
    if !response.status.is_success() {
        return Err(rejected(response));
    }

    if response.status == StatusCode::NO_CONTENT || response.body.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    match serde_json::from_str(&response.body) {
        Ok(value) => Ok(value),
        Err(_) => Err(rejected(response)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn http() -> Client {
        Client::builder().no_proxy().build().unwrap()
    }

    fn credentials(refresh: Option<&str>) -> Credentials {
        Credentials {
            client_id: Some("abc".to_string()),
            client_secret: Some("xyz".to_string()),
            access_token: Some("OLD".to_string()),
            refresh_token: refresh.map(String::from),
        }
    }

    fn client_for(
        server: &MockServer,
        creds: &Credentials,
        store: Option<CredentialStore>,
    ) -> AuthenticatedClient {
        let exchanger =
            TokenExchanger::new(http(), format!("{}/oauth/token", server.uri()), creds);
        AuthenticatedClient::new(http(), format!("{}/open/v1", server.uri()), creds, exchanger, store)
            .unwrap()
    }

    async fn mount_refresh(server: &MockServer, body: &str, expected: u64) {
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
            .expect(expected)
            .mount(server)
            .await;
    }

    #[test]
    fn test_missing_access_token() {
        let creds = Credentials::default();
        let exchanger = TokenExchanger::new(http(), "http://127.0.0.1:1/token", &creds);
        let result = AuthenticatedClient::new(http(), "http://127.0.0.1:1", &creds, exchanger, None);
        assert!(matches!(result, Err(AuthError::TokenMissing)));
    }

    #[tokio::test]
    async fn test_success_passes_payload_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/open/v1/project"))
            .and(header("Authorization", "Bearer OLD"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "p1"}])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, &credentials(Some("RT1")), None);
        let value = client.get("/project").await.unwrap();
        assert_eq!(value, json!([{"id": "p1"}]));
    }

    #[tokio::test]
    async fn test_unauthorized_then_ok_refreshes_once() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path().join(".env"));

        Mock::given(method("GET"))
            .and(path("/open/v1/project"))
            .and(header("Authorization", "Bearer OLD"))
            .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/open/v1/project"))
            .and(header("Authorization", "Bearer NEW"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "p1"}])))
            .expect(1)
            .mount(&server)
            .await;
        mount_refresh(&server, r#"{"access_token":"NEW","refresh_token":"RT2"}"#, 1).await;

        let client = client_for(&server, &credentials(Some("RT1")), Some(store.clone()));
        let value = client.get("/project").await.unwrap();

        assert_eq!(value, json!([{"id": "p1"}]));
        assert_eq!(client.access_token().await, "NEW");

        let saved = store.read().unwrap();
        assert_eq!(saved.access_token.as_deref(), Some("NEW"));
        assert_eq!(saved.refresh_token.as_deref(), Some("RT2"));
        assert_eq!(saved.client_id.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_unauthorized_twice_surfaces_error_after_one_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/open/v1/project"))
            .respond_with(ResponseTemplate::new(401).set_body_string("still expired"))
            .expect(2)
            .mount(&server)
            .await;
        mount_refresh(&server, r#"{"access_token":"NEW"}"#, 1).await;

        let client = client_for(&server, &credentials(Some("RT1")), None);
        let result = client.get("/project").await;

        match result {
            Err(AuthError::ProviderRejected { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "still expired");
            }
            other => panic!("expected 401 rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refresh_failure_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/open/v1/project"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, &credentials(Some("RT1")), None);
        let result = client.get("/project").await;
        assert!(matches!(
            result,
            Err(AuthError::ProviderRejected { status: 400, .. })
        ));
        assert_eq!(client.access_token().await, "OLD");
    }

    #[tokio::test]
    async fn test_unauthorized_without_refresh_token_skips_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/open/v1/project"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        mount_refresh(&server, r#"{"access_token":"NEW"}"#, 0).await;

        let client = client_for(&server, &credentials(None), None);
        let result = client.get("/project").await;
        assert!(result.unwrap_err().is_unauthorized());
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/open/v1/project/p1"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;
        mount_refresh(&server, r#"{"access_token":"NEW"}"#, 0).await;

        let client = client_for(&server, &credentials(Some("RT1")), None);
        let result = client.get("/project/p1").await;
        assert!(matches!(
            result,
            Err(AuthError::ProviderRejected { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_no_content_is_empty_object() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/open/v1/project/p1/task/t1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/open/v1/project/p1/task/t1/complete"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, &credentials(Some("RT1")), None);
        assert_eq!(client.delete("/project/p1/task/t1").await.unwrap(), json!({}));
        assert_eq!(
            client.post("/project/p1/task/t1/complete", None).await.unwrap(),
            json!({})
        );
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let server = MockServer::start().await;
        let payload = json!({"title": "Buy milk", "projectId": "p1"});
        Mock::given(method("POST"))
            .and(path("/open/v1/task"))
            .and(body_json(&payload))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "t1", "title": "Buy milk"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, &credentials(Some("RT1")), None);
        let value = client.post("/task", Some(&payload)).await.unwrap();
        assert_eq!(value["id"], "t1");
    }
}
