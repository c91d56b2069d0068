//! Credential set and layer merging
//!
//! Credentials can come from three places: values the caller passes in
//! (CLI flags), the process environment, and the credential file. The merge
//! order is fixed: caller > environment > file > defaults (unset).

use std::collections::HashMap;
use std::fmt;

/// File/environment key for the OAuth client id
pub const CLIENT_ID_KEY: &str = "TICKTICK_CLIENT_ID";
/// File/environment key for the OAuth client secret
pub const CLIENT_SECRET_KEY: &str = "TICKTICK_CLIENT_SECRET";
/// File/environment key for the access token
pub const ACCESS_TOKEN_KEY: &str = "TICKTICK_ACCESS_TOKEN";
/// File/environment key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "TICKTICK_REFRESH_TOKEN";

/// The four keys this crate owns, in the order they are written
pub const KNOWN_KEYS: [&str; 4] = [
    CLIENT_ID_KEY,
    CLIENT_SECRET_KEY,
    ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
];

/// OAuth client credentials and tokens for a single user
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Client id and secret, both present
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    /// Build a layer from a key/value map (file contents or environment)
    ///
    /// Empty values count as unset.
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            map.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            client_id: get(CLIENT_ID_KEY),
            client_secret: get(CLIENT_SECRET_KEY),
            access_token: get(ACCESS_TOKEN_KEY),
            refresh_token: get(REFRESH_TOKEN_KEY),
        }
    }

    /// Read the environment layer from the current process
    pub fn from_env() -> Self {
        let map: HashMap<String, String> = KNOWN_KEYS
            .iter()
            .filter_map(|key| std::env::var(key).ok().map(|v| (key.to_string(), v)))
            .collect();
        Self::from_map(&map)
    }

    /// Merge layers field by field; the first layer holding a value wins
    pub fn merge(caller: &Credentials, env: &Credentials, file: &Credentials) -> Credentials {
        fn pick(layers: [&Option<String>; 3]) -> Option<String> {
            layers.into_iter().find_map(|v| v.clone())
        }

        Credentials {
            client_id: pick([&caller.client_id, &env.client_id, &file.client_id]),
            client_secret: pick([
                &caller.client_secret,
                &env.client_secret,
                &file.client_secret,
            ]),
            access_token: pick([&caller.access_token, &env.access_token, &file.access_token]),
            refresh_token: pick([
                &caller.refresh_token,
                &env.refresh_token,
                &file.refresh_token,
            ]),
        }
    }

    /// Key/value pairs for the fields that are set, in [`KNOWN_KEYS`] order
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        [
            (CLIENT_ID_KEY, &self.client_id),
            (CLIENT_SECRET_KEY, &self.client_secret),
            (ACCESS_TOKEN_KEY, &self.access_token),
            (REFRESH_TOKEN_KEY, &self.refresh_token),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.clone().map(|v| (key, v)))
        .collect()
    }

    /// Client id and secret, if both are configured
    pub fn client_credentials(&self) -> Option<ClientCredentials> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => Some(ClientCredentials {
                client_id: id.clone(),
                client_secret: secret.clone(),
            }),
            _ => None,
        }
    }

    pub fn has_client_credentials(&self) -> bool {
        self.client_credentials().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.to_pairs().is_empty()
    }
}

fn redact(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "Some(<redacted>)"
    } else {
        "None"
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .finish()
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}
