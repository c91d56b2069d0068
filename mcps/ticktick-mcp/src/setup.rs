//! Interactive setup commands and server bootstrap
//!
//! `auth` runs the browser flow, `check` verifies stored credentials, and
//! [`connect`] builds the API client the server runs on.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use ticktick_auth::{
    AuthenticatedClient, AuthorizationFlow, CredentialStore, Credentials, TokenExchanger,
};

use crate::api::TickTickApi;
use crate::cli::Cli;
use crate::config::Config;
use crate::format::format_project_list;

/// Line-oriented prompts over any reader/writer pair
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<io::StdinLock<'static>, io::Stdout> {
    pub fn terminal() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.output, "{}", text)
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        Ok(line.trim().to_string())
    }

    /// Ask a yes/no question; anything but `y`/`yes` is no
    pub fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let answer = self.read_line(&format!("{} (y/n): ", question))?;
        Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
    }

    /// Ask until a non-empty answer is given
    pub fn ask_non_empty(&mut self, question: &str) -> io::Result<String> {
        loop {
            let answer = self.read_line(question)?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            self.say("This field cannot be empty. Please try again.")?;
        }
    }
}

/// Options of the `auth` command
#[derive(Debug, Clone, Default)]
pub struct AuthOptions {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub port: Option<u16>,
    pub redirect_uri: Option<String>,
}

/// Layer CLI flags over the loaded configuration
pub fn apply_cli(config: &mut Config, cli: &Cli) {
    if let Some(path) = &cli.env_file {
        config.credentials.env_file = path.clone();
    }
    if let Some(url) = cli.api_base_url.as_ref().filter(|u| !u.is_empty()) {
        config.api.base_url = url.clone();
    }
}

fn apply_auth_options(config: &mut Config, options: &AuthOptions) {
    if let Some(port) = options.port {
        config.oauth.port = port;
    }
    if let Some(uri) = options.redirect_uri.as_ref().filter(|u| !u.is_empty()) {
        config.oauth.redirect_uri = Some(uri.clone());
    }
}

pub fn credential_store(config: &Config) -> CredentialStore {
    CredentialStore::new(config.credentials.env_file.clone())
}

pub fn http_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("ticktick-mcp/", env!("CARGO_PKG_VERSION")))
        .timeout(config.request_timeout())
        .build()
        .context("Failed to create HTTP client")
}

/// Pick the client id/secret for a new authorization
///
/// Complete caller values win. Otherwise stored values are offered for
/// reuse, and anything still missing is prompted for.
pub fn resolve_client_credentials<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    caller: &Credentials,
    stored: &Credentials,
    source: &Path,
) -> io::Result<Credentials> {
    if caller.has_client_credentials() {
        return Ok(caller.clone());
    }

    if stored.has_client_credentials() {
        prompter.say(&format!(
            "Existing TickTick credentials found in {}.",
            source.display()
        ))?;
        if prompter.confirm("Do you want to use these credentials?")? {
            prompter.say("Using existing credentials.")?;
            return Ok(Credentials::merge(caller, &Credentials::default(), stored));
        }
    } else {
        prompter.say(&format!(
            "No existing TickTick credentials found in {}.",
            source.display()
        ))?;
    }

    let client_id = match &caller.client_id {
        Some(id) => id.clone(),
        None => prompter.ask_non_empty("Enter your TickTick Client ID: ")?,
    };
    let client_secret = match &caller.client_secret {
        Some(secret) => secret.clone(),
        None => prompter.ask_non_empty("Enter your TickTick Client Secret: ")?,
    };

    Ok(Credentials {
        client_id: Some(client_id),
        client_secret: Some(client_secret),
        ..Default::default()
    })
}

const AUTH_BANNER: &str = "\
TickTick MCP Server Authentication
==================================

This will open TickTick in your browser and store the resulting tokens.

Before you begin, you will need:
1. A TickTick account (https://ticktick.com)
2. A registered TickTick API application (https://developer.ticktick.com)
3. Your Client ID and Client Secret from the TickTick Developer Center
";

/// The `auth` command
pub async fn authenticate(config: &Config, options: AuthOptions) -> Result<()> {
    let mut config = config.clone();
    apply_auth_options(&mut config, &options);

    let store = credential_store(&config);
    let stored = store
        .load(&Credentials::default())
        .with_context(|| format!("Failed to read {}", store.path().display()))?;
    let caller = Credentials {
        client_id: options.client_id.filter(|v| !v.is_empty()),
        client_secret: options.client_secret.filter(|v| !v.is_empty()),
        ..Default::default()
    };

    let mut prompter = Prompter::terminal();
    prompter.say(AUTH_BANNER)?;
    let credentials = resolve_client_credentials(&mut prompter, &caller, &stored, store.path())?;

    let oauth = config.oauth_config();
    prompter.say(&format!(
        "Starting the OAuth flow. A browser window will open; after you approve access \
         TickTick redirects to {}.\n",
        oauth.redirect_uri
    ))?;

    let mut flow = AuthorizationFlow::new(http_client(&config)?, oauth, &credentials, store.clone());
    match flow.run(None).await {
        Ok(_) => {
            prompter.say(&format!(
                "\nAuthentication successful! Tokens saved to {}.\n\
                 Restart your MCP client to pick up the TickTick tools.",
                store.path().display()
            ))?;
            Ok(())
        }
        Err(e) => {
            prompter.say(
                "\nAuthentication failed. Common causes:\n\
                 - Incorrect Client ID or Client Secret\n\
                 - Redirect URI not registered for your TickTick application\n\
                 - Network connectivity problems",
            )?;
            Err(e).context(format!("Authentication did not complete (state: {})", flow.state()))
        }
    }
}

/// Build the API client from stored credentials
pub fn connect(config: &Config) -> Result<TickTickApi> {
    connect_with_env(config, &Credentials::from_env())
}

/// [`connect`] with an explicit environment layer
pub fn connect_with_env(config: &Config, env: &Credentials) -> Result<TickTickApi> {
    let store = credential_store(config);
    let credentials = store
        .load_with_env(&Credentials::default(), env)
        .with_context(|| format!("Failed to read {}", store.path().display()))?;

    let http = http_client(config)?;
    let exchanger = TokenExchanger::new(http.clone(), config.oauth.token_url.clone(), &credentials);
    if exchanger.client_credentials().is_none() {
        warn!("Client ID/secret not configured; expired tokens cannot be refreshed");
    }

    let client = AuthenticatedClient::new(
        http,
        config.api.base_url.clone(),
        &credentials,
        exchanger,
        Some(store),
    )
    .context("No TickTick access token found. Run `ticktick-mcp auth` to authenticate")?;

    Ok(TickTickApi::new(client))
}

/// Startup connectivity check; returns the number of projects
pub async fn probe(api: &TickTickApi) -> Result<usize> {
    let projects = api.get_projects().await.context(
        "Failed to access the TickTick API. Your access token may have expired; \
         run `ticktick-mcp auth` to authenticate again",
    )?;
    info!("Connected to TickTick API with {} projects", projects.len());
    Ok(projects.len())
}

/// Make sure an access token is available before serving
///
/// Offers the auth flow when a user is at the terminal; otherwise fails
/// with instructions, since stdin belongs to the MCP client.
pub async fn ensure_authenticated(config: &Config) -> Result<()> {
    let store = credential_store(config);
    let credentials = store.load(&Credentials::default())?;
    if credentials.access_token.is_some() {
        return Ok(());
    }

    if !io::stdin().is_terminal() {
        bail!(
            "No TickTick access token found in {} or the environment. \
             Run `ticktick-mcp auth` to set up authentication",
            store.path().display()
        );
    }

    let mut prompter = Prompter::terminal();
    prompter.say("Authentication setup required before the server can start.")?;
    if !prompter.confirm("Would you like to set up authentication now?")? {
        bail!("Authentication is required. Run `ticktick-mcp auth` to set it up later");
    }

    authenticate(config, AuthOptions::default()).await
}

/// The `check` command
pub async fn check(config: &Config) -> Result<()> {
    let api = connect(config)?;
    let projects = api
        .get_projects()
        .await
        .context("TickTick credentials check failed")?;

    println!("Credentials OK.\n\n{}", format_project_list(&projects));
    Ok(())
}
