//! TickTick MCP Server
//!
//! Exposes TickTick projects and tasks as MCP tools over stdio.
//!
//! # Commands
//! - `run` (default): serve MCP over stdio
//! - `auth`: browser-based OAuth setup, tokens stored in `.env`
//! - `check`: verify stored credentials

use clap::Parser;
use rmcp::{transport::stdio, ServiceExt};

use ticktick_mcp::cli::{Cli, Command};
use ticktick_mcp::config::Config;
use ticktick_mcp::setup::{self, AuthOptions};
use ticktick_mcp::telemetry;
use ticktick_mcp::TickTickMcpServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.debug())?;

    let mut config = Config::load()?;
    setup::apply_cli(&mut config, &cli);

    match cli.command() {
        Command::Run { .. } => serve(&config).await,
        Command::Auth {
            client_id,
            client_secret,
            port,
            redirect_uri,
        } => {
            setup::authenticate(
                &config,
                AuthOptions {
                    client_id,
                    client_secret,
                    port,
                    redirect_uri,
                },
            )
            .await
        }
        Command::Check => setup::check(&config).await,
    }
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Starting TickTick MCP Server");

    setup::ensure_authenticated(config).await?;

    let api = setup::connect(config)?;
    setup::probe(&api).await?;

    let server = TickTickMcpServer::new(api);
    let service = server.serve(stdio()).await?;

    tracing::info!("Server running, waiting for requests...");
    service.waiting().await?;

    tracing::info!("Server shutting down");
    Ok(())
}
