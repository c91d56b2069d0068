//! Configuration loading for ticktick-mcp
//!
//! Configuration is loaded from:
//! 1. Environment variables (TICKTICK_REDIRECT_URI, TICKTICK_ENV_FILE, TICKTICK_API_BASE_URL)
//! 2. Environment variable TICKTICK_MCP_CONFIG
//! 3. ~/.ticktick-mcp/config.toml
//! 4. Default values
//!
//! CLI flags are applied on top by the caller.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use ticktick_auth::{
    config::default_scopes, default_redirect_uri, OAuthConfig, DEFAULT_API_BASE_URL,
    DEFAULT_AUTH_URL, DEFAULT_CALLBACK_PORT, DEFAULT_CALLBACK_TIMEOUT, DEFAULT_CREDENTIAL_FILE,
    DEFAULT_TOKEN_URL,
};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// OAuth endpoints and callback settings
    #[serde(default)]
    pub oauth: OAuthSection,
    /// REST API settings
    #[serde(default)]
    pub api: ApiSection,
    /// Credential file settings
    #[serde(default)]
    pub credentials: CredentialsSection,
}

/// `[oauth]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthSection {
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Local callback port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Redirect URI registered with TickTick; derived from `port` when unset
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// Seconds to wait for the browser callback
    #[serde(default = "default_callback_timeout")]
    pub callback_timeout_seconds: u64,
}

/// `[api]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    /// Per-request timeout
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

/// `[credentials]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsSection {
    /// Credential file path (KEY=VALUE lines)
    #[serde(default = "default_env_file")]
    pub env_file: PathBuf,
}

// Default value functions
fn default_auth_url() -> String {
    DEFAULT_AUTH_URL.to_string()
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_CALLBACK_PORT
}

fn default_callback_timeout() -> u64 {
    DEFAULT_CALLBACK_TIMEOUT.as_secs()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_env_file() -> PathBuf {
    PathBuf::from(DEFAULT_CREDENTIAL_FILE)
}

impl Default for OAuthSection {
    fn default() -> Self {
        Self {
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            port: default_port(),
            redirect_uri: None,
            scopes: default_scopes(),
            callback_timeout_seconds: default_callback_timeout(),
        }
    }
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for CredentialsSection {
    fn default() -> Self {
        Self {
            env_file: default_env_file(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_path() {
            Some(path) if path.exists() => {
                tracing::info!("Loading config from: {}", path.display());
                Self::from_file(&path)?
            }
            Some(path) => {
                tracing::debug!("Config file {} not found, using defaults", path.display());
                Self::default()
            }
            None => {
                tracing::debug!("No config path available, using defaults");
                Self::default()
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Apply environment-style overrides from a lookup function
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(uri) = lookup("TICKTICK_REDIRECT_URI") {
            self.oauth.redirect_uri = Some(uri);
        }
        if let Some(path) = lookup("TICKTICK_ENV_FILE") {
            self.credentials.env_file = PathBuf::from(path);
        }
        if let Some(url) = lookup("TICKTICK_API_BASE_URL") {
            self.api.base_url = url;
        }
    }

    /// Find the configuration file path
    fn find_config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("TICKTICK_MCP_CONFIG") {
            return Some(PathBuf::from(path));
        }

        dirs::home_dir().map(|home| home.join(".ticktick-mcp").join("config.toml"))
    }

    /// Redirect URI actually used for the OAuth flow
    pub fn redirect_uri(&self) -> String {
        self.oauth
            .redirect_uri
            .clone()
            .unwrap_or_else(|| default_redirect_uri(self.oauth.port))
    }

    /// Settings for the authorization flow and token exchange
    pub fn oauth_config(&self) -> OAuthConfig {
        OAuthConfig {
            auth_url: self.oauth.auth_url.clone(),
            token_url: self.oauth.token_url.clone(),
            redirect_uri: self.redirect_uri(),
            port: self.oauth.port,
            scopes: self.oauth.scopes.clone(),
            callback_timeout: Duration::from_secs(self.oauth.callback_timeout_seconds),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_seconds)
    }
}
