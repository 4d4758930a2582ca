//! Tracing initialization
//!
//! Logs always go to stderr: with the stdio transport stdout carries the MCP
//! protocol, and keeping one destination for both transports keeps log
//! collection simple.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging for an MCP server
///
/// - `crate_name` gets `default_level` unless `RUST_LOG` says otherwise
/// - `mcp_common` itself follows the same level
/// - `LOG_FORMAT=json` switches to structured JSON output
///
/// `default_level` must be a valid `tracing` level (`trace`, `debug`, `info`,
/// `warn`, `error`).
///
/// # Example
///
/// ```rust,ignore
/// mcp_common::init_tracing("perplexity_mcp", "info")?;
/// ```
pub fn init_tracing(crate_name: &str, default_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("{}={}", crate_name, default_level).parse()?)
        .add_directive(format!("mcp_common={}", default_level).parse()?);

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);

    if use_json {
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
