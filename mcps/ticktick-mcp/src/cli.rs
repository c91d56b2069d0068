//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "ticktick-mcp")]
#[command(about = "TickTick MCP server with browser-based OAuth setup")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Credential file (KEY=VALUE lines, default: .env)
    #[arg(long, env = "TICKTICK_ENV_FILE", global = true)]
    pub env_file: Option<PathBuf>,

    /// TickTick API base URL
    #[arg(long, env = "TICKTICK_API_BASE_URL", global = true, hide_env_values = true)]
    pub api_base_url: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the MCP server over stdio (default)
    Run {
        /// Enable debug logging
        #[arg(long)]
        debug: bool,
    },
    /// Authenticate with TickTick and store the tokens
    Auth {
        /// OAuth client ID from the TickTick developer center
        #[arg(long, env = "TICKTICK_CLIENT_ID", hide_env_values = true)]
        client_id: Option<String>,
        /// OAuth client secret from the TickTick developer center
        #[arg(long, env = "TICKTICK_CLIENT_SECRET", hide_env_values = true)]
        client_secret: Option<String>,
        /// Local port for the OAuth callback listener
        #[arg(long)]
        port: Option<u16>,
        /// Redirect URI registered with TickTick
        #[arg(long, env = "TICKTICK_REDIRECT_URI")]
        redirect_uri: Option<String>,
    },
    /// Verify the stored credentials by listing projects
    Check,
}

impl Cli {
    /// Subcommand to run; `run` when none was given
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Run { debug: false })
    }

    pub fn debug(&self) -> bool {
        matches!(self.command, Some(Command::Run { debug: true }))
    }
}
