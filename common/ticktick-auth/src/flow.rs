//! Browser-based OAuth2 authorization-code flow
//!
//! The flow binds the callback listener, opens the authorization URL in the
//! user's browser, waits (bounded) for the redirect, exchanges the code and
//! persists the resulting tokens. It is the only writer of post-authorization
//! tokens and the only component that opens a browser.

use std::fmt;

use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use crate::callback::CallbackReceiver;
use crate::config::{scope_string, OAuthConfig};
use crate::credentials::{ClientCredentials, Credentials};
use crate::error::{AuthError, AuthResult};
use crate::exchange::{TokenExchanger, TokenResponse};
use crate::store::CredentialStore;

/// Opens the authorization URL for the user
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Launches the platform's default browser
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        open::that(url)
    }
}

/// Where an authorization attempt currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    BuildingUrl,
    Listening,
    AwaitingUser,
    CodeReceived,
    Exchanging,
    Persisted,
    TimedOut,
    ExchangeFailed,
}

impl FlowState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FlowState::Persisted | FlowState::TimedOut | FlowState::ExchangeFailed
        )
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowState::Idle => "idle",
            FlowState::BuildingUrl => "building_url",
            FlowState::Listening => "listening",
            FlowState::AwaitingUser => "awaiting_user",
            FlowState::CodeReceived => "code_received",
            FlowState::Exchanging => "exchanging",
            FlowState::Persisted => "persisted",
            FlowState::TimedOut => "timed_out",
            FlowState::ExchangeFailed => "exchange_failed",
        };
        f.write_str(name)
    }
}

/// State of a single authorization attempt
///
/// The authorization code is write-once and read-once.
#[derive(Debug)]
pub struct AuthorizationSession {
    redirect_uri: String,
    scopes: Vec<String>,
    port: u16,
    code: Option<String>,
    consumed: bool,
}

impl AuthorizationSession {
    pub fn new(redirect_uri: impl Into<String>, scopes: Vec<String>, port: u16) -> Self {
        Self {
            redirect_uri: redirect_uri.into(),
            scopes,
            port,
            code: None,
            consumed: false,
        }
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Record the code; returns false if one was already recorded
    pub fn set_code(&mut self, code: String) -> bool {
        if self.code.is_some() || self.consumed {
            return false;
        }
        self.code = Some(code);
        true
    }

    /// Take the code, invalidating it
    pub fn take_code(&mut self) -> Option<String> {
        let code = self.code.take();
        if code.is_some() {
            self.consumed = true;
        }
        code
    }
}

/// Build the provider authorization URL
pub fn authorization_url(
    auth_url: &str,
    client_id: &str,
    redirect_uri: &str,
    scopes: &[String],
    state: Option<&str>,
) -> AuthResult<Url> {
    let scope = scope_string(scopes);
    let mut params = vec![
        ("client_id", client_id),
        ("redirect_uri", redirect_uri),
        ("response_type", "code"),
        ("scope", scope.as_str()),
    ];
    if let Some(state) = state {
        params.push(("state", state));
    }

    Url::parse_with_params(auth_url, &params).map_err(|e| AuthError::InvalidUrl {
        url: auth_url.to_string(),
        reason: e.to_string(),
    })
}

fn parse_url(raw: &str) -> AuthResult<Url> {
    Url::parse(raw).map_err(|e| AuthError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Redirect URI with the bound port substituted when an ephemeral port was requested
fn effective_redirect_uri(configured: &str, requested_port: u16, bound_port: u16) -> AuthResult<String> {
    if requested_port != 0 {
        return Ok(configured.to_string());
    }
    let mut url = parse_url(configured)?;
    url.set_port(Some(bound_port))
        .map_err(|_| AuthError::InvalidUrl {
            url: configured.to_string(),
            reason: "redirect URI cannot carry a port".to_string(),
        })?;
    Ok(url.to_string())
}

/// Runs the authorization-code flow end to end
pub struct AuthorizationFlow {
    config: OAuthConfig,
    exchanger: TokenExchanger,
    store: CredentialStore,
    browser: Box<dyn BrowserLauncher>,
    state: FlowState,
}

impl AuthorizationFlow {
    pub fn new(
        http: Client,
        config: OAuthConfig,
        credentials: &Credentials,
        store: CredentialStore,
    ) -> Self {
        let exchanger = TokenExchanger::new(http, config.token_url.clone(), credentials);
        Self {
            config,
            exchanger,
            store,
            browser: Box::new(SystemBrowser),
            state: FlowState::Idle,
        }
    }

    /// Replace the browser launcher
    pub fn with_browser(mut self, browser: Box<dyn BrowserLauncher>) -> Self {
        self.browser = browser;
        self
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    fn transition(&mut self, next: FlowState) {
        debug!(from = %self.state, to = %next, "authorization flow transition");
        self.state = next;
    }

    fn fail<T>(&mut self, state: FlowState, err: AuthError) -> AuthResult<T> {
        self.transition(state);
        Err(err)
    }

    /// Run the flow and persist the resulting tokens
    ///
    /// `state` is forwarded to the provider as the OAuth `state` parameter.
    pub async fn run(&mut self, state: Option<&str>) -> AuthResult<TokenResponse> {
        self.state = FlowState::Idle;
        self.transition(FlowState::BuildingUrl);

        let client: Option<ClientCredentials> = self.exchanger.client_credentials().cloned();
        let Some(client) = client else {
            return self.fail(FlowState::ExchangeFailed, AuthError::MissingCredentials);
        };

        let callback_path = match parse_url(&self.config.redirect_uri) {
            Ok(url) => url.path().to_string(),
            Err(e) => return self.fail(FlowState::ExchangeFailed, e),
        };
        // Reject bad endpoints before anything is bound.
        let checked = effective_redirect_uri(&self.config.redirect_uri, self.config.port, self.config.port)
            .and_then(|uri| {
                authorization_url(&self.config.auth_url, &client.client_id, &uri, &self.config.scopes, state)
            });
        if let Err(e) = checked {
            return self.fail(FlowState::ExchangeFailed, e);
        }

        self.transition(FlowState::Listening);
        let receiver = match CallbackReceiver::bind(self.config.port, &callback_path).await {
            Ok(receiver) => receiver,
            Err(e) => return self.fail(FlowState::ExchangeFailed, e),
        };

        let built = effective_redirect_uri(&self.config.redirect_uri, self.config.port, receiver.port())
            .and_then(|redirect_uri| {
                let url = authorization_url(
                    &self.config.auth_url,
                    &client.client_id,
                    &redirect_uri,
                    &self.config.scopes,
                    state,
                )?;
                Ok((redirect_uri, url))
            });
        let (redirect_uri, url) = match built {
            Ok(built) => built,
            Err(e) => {
                receiver.close().await;
                return self.fail(FlowState::ExchangeFailed, e);
            }
        };
        let mut session =
            AuthorizationSession::new(redirect_uri, self.config.scopes.clone(), receiver.port());

        self.transition(FlowState::AwaitingUser);
        info!(port = session.port(), "waiting for TickTick authorization");
        if let Err(e) = self.browser.open(url.as_str()) {
            warn!("could not open a browser: {}", e);
        }
        eprintln!("If your browser did not open, visit this URL to authorize:\n\n  {}\n", url);

        let code = match receiver.wait_for_code(self.config.callback_timeout).await {
            Ok(code) => code,
            Err(e) => return self.fail(FlowState::TimedOut, e),
        };
        session.set_code(code);
        self.transition(FlowState::CodeReceived);

        let Some(code) = session.take_code() else {
            return self.fail(FlowState::TimedOut, AuthError::TimedOut);
        };

        self.transition(FlowState::Exchanging);
        let tokens = match self
            .exchanger
            .exchange_authorization_code(&code, session.redirect_uri(), session.scopes())
            .await
        {
            Ok(tokens) => tokens,
            Err(e) => return self.fail(FlowState::ExchangeFailed, e),
        };

        if let Err(e) = self.store.persist_tokens(&tokens, Some(&client)) {
            return self.fail(FlowState::ExchangeFailed, e);
        }

        self.transition(FlowState::Persisted);
        info!(path = %self.store.path().display(), "TickTick tokens saved");
        Ok(tokens)
    }
}
