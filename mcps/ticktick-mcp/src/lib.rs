//! TickTick MCP Library
//!
//! MCP tools for TickTick projects and tasks, backed by the OAuth session
//! core in `ticktick-auth`.
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use ticktick_mcp::{setup, Config, TickTickMcpServer};
//!
//! let config = Config::load()?;
//! let server = TickTickMcpServer::new(setup::connect(&config)?);
//! // Serve via stdio or an in-memory transport
//! ```
//!
//! # Tools
//! - Projects: list, get, tasks of a project, create, update, delete
//! - Tasks: get, create, update, complete, delete

pub mod api;
pub mod cli;
pub mod config;
pub mod format;
pub mod handlers;
pub mod params;
pub mod server;
pub mod setup;
pub mod telemetry;

// Re-export main server type
pub use server::TickTickMcpServer;

pub use api::{ApiError, TickTickApi};
pub use config::Config;

// Re-export parameter types for direct API usage
pub use params::*;
