//! Perplexity MCP Server
//!
//! Serves the Perplexity `search` tool over Streamable HTTP (default) or
//! stdio, and offers helpers for inspecting and generating configuration.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mcp_common::HttpBinding;
use std::path::PathBuf;
use std::sync::Arc;

use perplexity_mcp::{config, PerplexityMcpServer, Settings};

#[derive(Parser)]
#[command(name = "perplexity-mcp", version)]
#[command(about = "Perplexity AI search MCP server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (TOML, or JSON with a .json extension)
    #[arg(long, short, env = "PERPLEXITY_MCP_CONFIG", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server (default)
    Serve {
        /// Serve over stdio instead of Streamable HTTP
        #[arg(long)]
        stdio: bool,
    },
    /// Inspect or generate configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Resolve configuration and print it with secrets masked
    Show,
    /// Write an annotated sample config file
    Sample {
        /// Destination path
        #[arg(long, short, default_value = "perplexity-mcp.sample.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Existing environment variables take precedence over .env entries
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve { stdio: false }) {
        Commands::Serve { stdio } => {
            let settings = Arc::new(Settings::load(cli.config)?);
            mcp_common::init_tracing("perplexity_mcp", settings.effective_log_level())?;

            if let Ok(path) = dotenv {
                tracing::info!("Loaded environment file: {}", path.display());
            }
            serve(settings, stdio).await
        }
        Commands::Config { action } => match action {
            ConfigCommands::Show => {
                let settings = Settings::load(cli.config)?;
                for line in settings.status_lines() {
                    println!("{}", line);
                }
                for warning in settings.warnings() {
                    println!("Warning: {}", warning);
                }
                Ok(())
            }
            ConfigCommands::Sample { output } => {
                std::fs::write(&output, config::sample_config_toml())
                    .with_context(|| format!("failed to write {}", output.display()))?;
                println!("Sample config written to {}", output.display());
                Ok(())
            }
        },
    }
}

async fn serve(settings: Arc<Settings>, stdio: bool) -> Result<()> {
    tracing::info!("Starting Perplexity MCP Server");
    for line in settings.status_lines() {
        tracing::info!("{}", line);
    }
    for warning in settings.warnings() {
        tracing::warn!("{}", warning);
    }

    let server = PerplexityMcpServer::from_settings(settings.clone())?;

    if stdio {
        mcp_common::serve_stdio(server).await
    } else {
        let binding = HttpBinding {
            host: settings.bind_host.clone(),
            port: settings.bind_port,
            path: settings.bind_path.clone(),
            body_limit: usize::try_from(settings.max_request_size).unwrap_or(usize::MAX),
        };
        mcp_common::serve_streamable_http(server, &binding).await
    }
}
