//! Error types for the auth/session core
//!
//! Every fallible operation in this crate returns [`AuthError`]. Callers that
//! need to branch on the failure category (rather than match on messages) use
//! [`AuthError::kind`].

use thiserror::Error;

/// Errors raised by the credential store, token exchange, callback receiver
/// and authenticated client
#[derive(Error, Debug)]
pub enum AuthError {
    /// Client id or client secret is not configured
    #[error(
        "TickTick client ID or client secret is missing - set TICKTICK_CLIENT_ID and \
         TICKTICK_CLIENT_SECRET or run the auth command"
    )]
    MissingCredentials,

    /// No access token available when building the API client
    #[error("TICKTICK_ACCESS_TOKEN is not set - run the auth command to authenticate")]
    TokenMissing,

    /// Transport failure reaching the provider or the API
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Provider or API answered with a non-success status (or an unusable body)
    #[error("request rejected (status {status}): {body}")]
    ProviderRejected {
        /// HTTP status code returned upstream
        status: u16,
        /// Response body, verbatim
        body: String,
    },

    /// No authorization callback arrived before the deadline
    #[error("authentication timed out waiting for the browser callback - please try again")]
    TimedOut,

    /// Reading or writing the credential file failed
    #[error("credential file error: {0}")]
    Storage(#[from] std::io::Error),

    /// The local callback listener could not be started
    #[error("failed to start callback listener on port {port}: {source}")]
    Listener {
        /// Port that was requested
        port: u16,
        /// Underlying bind error
        #[source]
        source: std::io::Error,
    },

    /// A configured URL could not be parsed
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// Parser message
        reason: String,
    },
}

/// Coarse failure category for an [`AuthError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed configuration (client credentials, URLs)
    Config,
    /// Transport failure
    Network,
    /// Non-success answer from the provider or API
    ProviderRejected,
    /// Callback wait elapsed
    TimedOut,
    /// No access token available
    TokenMissing,
    /// Local I/O (credential file, listener socket)
    Io,
}

impl AuthError {
    /// Failure category, for callers that render or branch on errors
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::MissingCredentials | AuthError::InvalidUrl { .. } => ErrorKind::Config,
            AuthError::Network(_) => ErrorKind::Network,
            AuthError::ProviderRejected { .. } => ErrorKind::ProviderRejected,
            AuthError::TimedOut => ErrorKind::TimedOut,
            AuthError::TokenMissing => ErrorKind::TokenMissing,
            AuthError::Storage(_) | AuthError::Listener { .. } => ErrorKind::Io,
        }
    }

    /// HTTP status carried by a rejection, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::ProviderRejected { status, .. } => Some(*status),
            AuthError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the upstream answered 401
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Result type alias for auth operations
pub type AuthResult<T> = Result<T, AuthError>;
