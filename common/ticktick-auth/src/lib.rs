//! TickTick Auth - OAuth2 session core for the TickTick MCP server
//!
//! This crate owns everything needed to obtain and keep a valid TickTick
//! access token:
//!
//! - **Store**: [`CredentialStore`] reads and overlays the `KEY=VALUE`
//!   credential file, [`Credentials::merge`] layers caller > env > file
//! - **Exchange**: [`TokenExchanger`] performs the `authorization_code` and
//!   `refresh_token` grants
//! - **Callback**: [`CallbackReceiver`] captures one authorization code on a
//!   loopback listener
//! - **Flow**: [`AuthorizationFlow`] drives the browser round trip and
//!   persists the tokens
//! - **Client**: [`AuthenticatedClient`] sends bearer-authenticated requests
//!   and refreshes once on 401
//!
//! # Example
//!
//! ```rust,ignore
//! use ticktick_auth::{AuthenticatedClient, CredentialStore, Credentials, TokenExchanger};
//!
//! let store = CredentialStore::default();
//! let creds = store.load(&Credentials::default())?;
//! let exchanger = TokenExchanger::new(http.clone(), DEFAULT_TOKEN_URL, &creds);
//! let client = AuthenticatedClient::new(http, DEFAULT_API_BASE_URL, &creds, exchanger, Some(store))?;
//! let projects = client.get("/project").await?;
//! ```

pub mod callback;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod exchange;
pub mod flow;
pub mod store;

pub use callback::CallbackReceiver;
pub use client::AuthenticatedClient;
pub use config::{
    default_redirect_uri, default_scopes, OAuthConfig, DEFAULT_API_BASE_URL, DEFAULT_AUTH_URL,
    DEFAULT_CALLBACK_PORT, DEFAULT_CALLBACK_TIMEOUT, DEFAULT_TOKEN_URL,
};
pub use credentials::{ClientCredentials, Credentials};
pub use error::{AuthError, AuthResult, ErrorKind};
pub use exchange::{TokenExchanger, TokenResponse};
pub use flow::{AuthorizationFlow, AuthorizationSession, BrowserLauncher, FlowState, SystemBrowser};
pub use store::{CredentialStore, DEFAULT_CREDENTIAL_FILE};
