//! Credential file persistence
//!
//! The credential file is a plain `KEY=VALUE` file (the `.env` format).
//! Reads skip blank lines and `#` comments. Writes overlay only the keys
//! being saved and keep every other key that was already present, in order.
//! Comments are not carried over on rewrite.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::credentials::{ClientCredentials, Credentials, CLIENT_ID_KEY, CLIENT_SECRET_KEY};
use crate::error::AuthResult;
use crate::exchange::TokenResponse;

/// Default credential file, relative to the working directory
pub const DEFAULT_CREDENTIAL_FILE: &str = ".env";

/// Reads and writes the credential file
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new(DEFAULT_CREDENTIAL_FILE)
    }
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Credentials merged from caller values, the environment and the file
    ///
    /// A missing file is treated as an empty layer.
    pub fn load(&self, caller: &Credentials) -> AuthResult<Credentials> {
        self.load_with_env(caller, &Credentials::from_env())
    }

    /// Same as [`load`](Self::load) with an explicit environment layer
    pub fn load_with_env(&self, caller: &Credentials, env: &Credentials) -> AuthResult<Credentials> {
        let file = self.read()?;
        Ok(Credentials::merge(caller, env, &file))
    }

    /// File layer only
    pub fn read(&self) -> AuthResult<Credentials> {
        let entries = self.read_entries()?;
        let map: HashMap<String, String> = entries.into_iter().collect();
        Ok(Credentials::from_map(&map))
    }

    /// Overlay the fields set in `partial` onto the file and rewrite it
    ///
    /// Keys not present in `partial` are left untouched, including keys this
    /// crate does not know about.
    pub fn save(&self, partial: &Credentials) -> AuthResult<()> {
        let mut entries = self.read_entries()?;

        for (key, value) in partial.to_pairs() {
            match entries.iter_mut().find(|(k, _)| k == key) {
                Some(entry) => entry.1 = value,
                None => entries.push((key.to_string(), value)),
            }
        }

        self.write_entries(&entries)?;
        debug!(path = %self.path.display(), keys = partial.to_pairs().len(), "credentials saved");
        Ok(())
    }

    /// Persist a token response
    ///
    /// The refresh token is only written when the response carries one, so a
    /// previously stored refresh token survives access-only responses. Client
    /// credentials are written only if the file does not hold them yet.
    pub fn persist_tokens(
        &self,
        tokens: &TokenResponse,
        client: Option<&ClientCredentials>,
    ) -> AuthResult<()> {
        let stored = self.read_entries()?;
        let has_key = |key: &str| stored.iter().any(|(k, _)| k == key);

        let mut partial = Credentials {
            access_token: Some(tokens.access_token.clone()),
            refresh_token: tokens.refresh_token.clone(),
            ..Default::default()
        };

        if let Some(client) = client {
            if !has_key(CLIENT_ID_KEY) {
                partial.client_id = Some(client.client_id.clone());
            }
            if !has_key(CLIENT_SECRET_KEY) {
                partial.client_secret = Some(client.client_secret.clone());
            }
        }

        self.save(&partial)
    }

    fn read_entries(&self) -> AuthResult<Vec<(String, String)>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(parse_entries(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_entries(&self, entries: &[(String, String)]) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content: String = entries
            .iter()
            .map(|(key, value)| format!("{}={}\n", key, value))
            .collect();
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;

        // mode only applies on creation; tighten files that already existed
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(content.as_bytes())?;

        Ok(())
    }
}

/// Parse `KEY=VALUE` lines, skipping blanks, comments and lines without `=`
///
/// Later duplicates replace earlier ones. Matching surrounding quotes are
/// stripped from values.
fn parse_entries(content: &str) -> Vec<(String, String)> {
    let mut entries: Vec<(String, String)> = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim().to_string();
        if key.is_empty() {
            continue;
        }
        let value = unquote(value.trim()).to_string();

        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => entries.push((key, value)),
        }
    }

    entries
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> CredentialStore {
        CredentialStore::new(dir.path().join(".env"))
    }

    fn full_credentials() -> Credentials {
        Credentials {
            client_id: Some("abc".to_string()),
            client_secret: Some("xyz".to_string()),
            access_token: Some("AT1".to_string()),
            refresh_token: Some("RT1".to_string()),
        }
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let creds = store.read().unwrap();
        assert!(creds.is_empty());

        let merged = store
            .load_with_env(&Credentials::default(), &Credentials::default())
            .unwrap();
        assert_eq!(merged, Credentials::default());
    }

    #[test]
    fn test_save_then_read_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.save(&full_credentials()).unwrap();
        assert_eq!(store.read().unwrap(), full_credentials());
    }

    #[test]
    fn test_save_preserves_unrelated_keys() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(
            store.path(),
            "# local settings\nOTHER_SERVICE_KEY=keep-me\n\nTICKTICK_ACCESS_TOKEN=old\n",
        )
        .unwrap();

        store.save(&full_credentials()).unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("OTHER_SERVICE_KEY=keep-me"));
        assert!(content.contains("TICKTICK_ACCESS_TOKEN=AT1"));
        assert!(!content.contains("TICKTICK_ACCESS_TOKEN=old"));
        assert!(!content.contains("# local settings"));
        // existing keys keep their position
        assert!(content.starts_with("OTHER_SERVICE_KEY=keep-me\nTICKTICK_ACCESS_TOKEN=AT1\n"));
        assert_eq!(store.read().unwrap(), full_credentials());
    }

    #[test]
    fn test_access_only_save_keeps_refresh_token() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&full_credentials()).unwrap();

        let tokens = TokenResponse {
            access_token: "AT2".to_string(),
            refresh_token: None,
            token_type: Some("bearer".to_string()),
            expires_in: Some(3600),
        };
        store.persist_tokens(&tokens, None).unwrap();

        let creds = store.read().unwrap();
        assert_eq!(creds.access_token.as_deref(), Some("AT2"));
        assert_eq!(creds.refresh_token.as_deref(), Some("RT1"));
    }

    #[test]
    fn test_persist_tokens_adds_client_credentials_once() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "TICKTICK_CLIENT_ID=stored-id\n").unwrap();

        let tokens = TokenResponse {
            access_token: "AT1".to_string(),
            refresh_token: Some("RT1".to_string()),
            token_type: None,
            expires_in: None,
        };
        let client = ClientCredentials {
            client_id: "new-id".to_string(),
            client_secret: "xyz".to_string(),
        };
        store.persist_tokens(&tokens, Some(&client)).unwrap();

        let creds = store.read().unwrap();
        assert_eq!(creds.client_id.as_deref(), Some("stored-id"));
        assert_eq!(creds.client_secret.as_deref(), Some("xyz"));
        assert_eq!(creds.access_token.as_deref(), Some("AT1"));
        assert_eq!(creds.refresh_token.as_deref(), Some("RT1"));
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path().join("nested").join("creds.env"));

        store
            .save(&Credentials {
                access_token: Some("AT1".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert!(store.exists());
        assert_eq!(store.read().unwrap().access_token.as_deref(), Some("AT1"));
    }

    #[test]
    fn test_env_layer_overrides_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&full_credentials()).unwrap();

        let env = Credentials {
            access_token: Some("ENV_TOKEN".to_string()),
            ..Default::default()
        };
        let merged = store.load_with_env(&Credentials::default(), &env).unwrap();
        assert_eq!(merged.access_token.as_deref(), Some("ENV_TOKEN"));
        assert_eq!(merged.refresh_token.as_deref(), Some("RT1"));
    }

    #[test]
    fn test_parse_entries_handles_comments_and_quotes() {
        let entries = parse_entries(
            "# comment\n\nTICKTICK_ACCESS_TOKEN=\"quoted\"\nnot a pair\nTICKTICK_REFRESH_TOKEN=a=b\n",
        );
        assert_eq!(
            entries,
            vec![
                (ACCESS_TOKEN_KEY.to_string(), "quoted".to_string()),
                (REFRESH_TOKEN_KEY.to_string(), "a=b".to_string()),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_user_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&full_credentials()).unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_readable_file_is_tightened() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "OTHER=1\n").unwrap();
        std::fs::set_permissions(store.path(), std::fs::Permissions::from_mode(0o644)).unwrap();

        store.save(&full_credentials()).unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(content.starts_with("OTHER=1\n"));
        assert_eq!(store.read().unwrap(), full_credentials());
    }
}
