//! OAuth endpoints and flow settings
//!
//! Defaults target the public TickTick endpoints. Every field can be
//! overridden, which is how tests point the exchanger at a mock server.

use std::time::Duration;

/// TickTick authorize endpoint (browser redirect)
pub const DEFAULT_AUTH_URL: &str = "https://ticktick.com/oauth/authorize";
/// TickTick token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://ticktick.com/oauth/token";
/// TickTick open API base
pub const DEFAULT_API_BASE_URL: &str = "https://api.ticktick.com/open/v1";
/// Port the local callback listener binds when nothing else is configured
pub const DEFAULT_CALLBACK_PORT: u16 = 8000;
/// Scopes requested when the caller does not override them
pub const DEFAULT_SCOPES: [&str; 2] = ["tasks:read", "tasks:write"];
/// Upper bound on how long the flow waits for the browser callback
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Redirect URI registered with the provider for a given local port
pub fn default_redirect_uri(port: u16) -> String {
    format!("http://localhost:{}/callback", port)
}

/// OAuth configuration shared by the exchanger and the authorization flow
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// Authorization endpoint URL
    pub auth_url: String,
    /// Token endpoint URL
    pub token_url: String,
    /// Redirect URI, must match the one registered with the provider
    pub redirect_uri: String,
    /// Local port the callback listener binds (0 picks an ephemeral port)
    pub port: u16,
    /// Scopes to request
    pub scopes: Vec<String>,
    /// How long to wait for the browser callback
    pub callback_timeout: Duration,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            redirect_uri: default_redirect_uri(DEFAULT_CALLBACK_PORT),
            port: DEFAULT_CALLBACK_PORT,
            scopes: default_scopes(),
            callback_timeout: DEFAULT_CALLBACK_TIMEOUT,
        }
    }
}

/// Default scope list as owned strings
pub fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
}

/// Join scopes the way the provider expects them (space separated)
pub fn scope_string(scopes: &[String]) -> String {
    if scopes.is_empty() {
        DEFAULT_SCOPES.join(" ")
    } else {
        scopes.join(" ")
    }
}
