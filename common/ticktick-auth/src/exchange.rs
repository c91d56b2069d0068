//! OAuth2 token endpoint client
//!
//! Implements the two grants TickTick supports: `authorization_code` and
//! `refresh_token`. Both authenticate with HTTP Basic built from the client
//! id and secret and send a form-encoded body. No retries happen here; the
//! caller owns retry policy.

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::config::scope_string;
use crate::credentials::{ClientCredentials, Credentials};
use crate::error::{AuthError, AuthResult};

/// Tokens returned by the provider
///
/// Only `access_token` and `refresh_token` are persisted. `expires_in` is
/// parsed for logging but expiry is discovered reactively through 401s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawTokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// `Basic` authorization header value for a client id/secret pair
pub fn basic_auth_header(client: &ClientCredentials) -> String {
    let raw = format!("{}:{}", client.client_id, client.client_secret);
    format!("Basic {}", STANDARD.encode(raw.as_bytes()))
}

/// Performs token grants against the provider's token endpoint
#[derive(Debug, Clone)]
pub struct TokenExchanger {
    http: Client,
    token_url: String,
    client: Option<ClientCredentials>,
}

impl TokenExchanger {
    /// Create an exchanger; missing client credentials are reported lazily
    /// by each grant, before any network traffic
    pub fn new(http: Client, token_url: impl Into<String>, credentials: &Credentials) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            client: credentials.client_credentials(),
        }
    }

    pub fn client_credentials(&self) -> Option<&ClientCredentials> {
        self.client.as_ref()
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Exchange an authorization code for tokens
    #[instrument(skip_all, fields(redirect_uri = %redirect_uri))]
    pub async fn exchange_authorization_code(
        &self,
        code: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> AuthResult<TokenResponse> {
        let scope = scope_string(scopes);
        self.request_token(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("scope", &scope),
        ])
        .await
    }

    /// Obtain a new access token from a refresh token
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenResponse> {
        self.request_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> AuthResult<TokenResponse> {
        let client = self.client.as_ref().ok_or(AuthError::MissingCredentials)?;

        debug!(token_url = %self.token_url, grant = form[0].1, "requesting token");

        let response = self
            .http
            .post(&self.token_url)
            .header(AUTHORIZATION, basic_auth_header(client))
            .form(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "token endpoint rejected the grant");
            return Err(AuthError::ProviderRejected {
                status: status.as_u16(),
                body,
            });
        }

        parse_token_response(status.as_u16(), body)
    }
}

fn parse_token_response(status: u16, body: String) -> AuthResult<TokenResponse> {
    let raw: RawTokenResponse = match serde_json::from_str(&body) {
        Ok(raw) => raw,
        Err(_) => return Err(AuthError::ProviderRejected { status, body }),
    };

    let access_token = match raw.access_token.filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => return Err(AuthError::ProviderRejected { status, body }),
    };

    debug!(
        has_refresh_token = raw.refresh_token.is_some(),
        expires_in = raw.expires_in,
        "token response parsed"
    );

    Ok(TokenResponse {
        access_token,
        refresh_token: raw.refresh_token.filter(|t| !t.is_empty()),
        token_type: raw.token_type,
        expires_in: raw.expires_in,
    })
}
