use anyhow::Context;
use clap::Parser;
use dynconf::config::load_config;
use dynconf_agent::{Agent, AgentConfig};
use dynconf_logger::Logger;
use std::path::PathBuf;
use tracing::error;

/// Keeps local slots in sync with remote configuration sources.
#[derive(Debug, Parser)]
#[command(name = "dynconf-agent")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file (TOML, JSON or YAML), overridable with `DYNCONF__*` variables.
    #[arg(short, long, default_value = "dynconf-agent.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg: AgentConfig =
        load_config(Some(&cli.config)).context("Critical: Configuration is malformed")?;

    let _log = Logger::from_settings(env!("CARGO_PKG_NAME"), cfg.log.clone())?;

    Agent::new(cfg)?
        .run(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(%err, "Failed to listen for the shutdown signal");
            }
        })
        .await
}
