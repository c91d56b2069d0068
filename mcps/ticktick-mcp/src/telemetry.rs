//! Tracing setup
//!
//! Logs go to stderr; stdout carries the MCP protocol. A non-empty
//! `RUST_LOG` replaces the default directives (and `--debug`), and
//! `LOG_FORMAT=json` switches to JSON lines.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crates whose events are enabled by default
const LOG_TARGETS: [&str; 2] = ["ticktick_mcp", "ticktick_auth"];

/// Default filter directives for the given verbosity
pub fn default_directives(debug: bool) -> Vec<String> {
    let level = if debug { "debug" } else { "info" };
    LOG_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect()
}

fn json_requested() -> bool {
    std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Filter from an explicit `RUST_LOG` value, or the defaults when unset
pub fn build_filter(rust_log: Option<&str>, debug: bool) -> anyhow::Result<EnvFilter> {
    match rust_log.map(str::trim).filter(|v| !v.is_empty()) {
        Some(spec) => Ok(EnvFilter::try_new(spec)?),
        None => Ok(EnvFilter::try_new(default_directives(debug).join(","))?),
    }
}

/// Install the global subscriber; call once at startup
pub fn init_tracing(debug: bool) -> anyhow::Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(rust_log.as_deref(), debug)?;

    let registry = tracing_subscriber::registry().with(filter);

    if json_requested() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?;
    }

    Ok(())
}
