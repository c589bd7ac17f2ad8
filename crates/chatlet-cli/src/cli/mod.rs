//! CLI entry and dispatch.

use anyhow::{Context, Result};
use chatlet_core::config::Config;
use clap::Parser;

mod commands;

#[derive(Parser)]
#[command(name = "chatlet")]
#[command(version)]
#[command(about = "Terminal client for embeddable chat agents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Agent ID (falls back to agent_id in config.toml)
    #[arg(long, global = true, value_name = "ID")]
    agent_id: Option<String>,

    /// API base URL (falls back to CHATLET_API_BASE, then config.toml)
    #[arg(long, global = true, value_name = "URL")]
    api_base: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Chat interactively with the agent
    Chat,
    /// Show the agent's public metadata
    Agent,
}

pub fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::load().context("load config")?;
    let api_base = config.resolve_api_base(cli.api_base.as_deref())?;
    let agent_id = config.resolve_agent_id(cli.agent_id.as_deref())?;

    let runtime = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    runtime.block_on(async {
        match cli.command {
            Commands::Chat => commands::chat::run(&api_base, &agent_id).await,
            Commands::Agent => commands::agent::run(&api_base, &agent_id).await,
        }
    })
}
