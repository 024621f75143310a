//! Hearth, a smart-home assistant backed by a local LLM.
//!
//! Main entry point for the Hearth CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod client;
mod commands;
mod config;

use commands::{ask, chat, status, Context};
use config::HearthConfig;

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Hearth, a smart-home assistant backed by a local LLM
#[derive(Parser)]
#[command(name = "hearth")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to the config file (default: ~/.config/hearth/config.toml)
    #[arg(long, global = true, env = "HEARTH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Model to run, overriding the config file
    #[arg(long, global = true, env = "HEARTH_MODEL")]
    pub model: Option<String>,

    /// Ollama server URL, overriding the config file
    #[arg(long, global = true, env = "HEARTH_OLLAMA_URL")]
    pub url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a one-shot request to the assistant
    Ask(ask::AskArgs),

    /// Enter interactive chat mode (REPL)
    Chat(chat::ChatArgs),

    /// Check the model server and the home backend
    Status(status::StatusArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "hearth=debug,hearth_agent=debug,hearth_llm=debug,info"
    } else {
        "hearth=info,hearth_agent=info,hearth_llm=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = HearthConfig::load(cli.config.as_deref())?;
    if let Some(model) = cli.model {
        config.ollama.model = Some(model);
    }
    if let Some(url) = cli.url {
        config.ollama.url = Some(url);
    }

    let ctx = Context {
        config,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Ask(args) => ask::run(args, &ctx).await,
        Commands::Chat(args) => chat::run(args, &ctx).await,
        Commands::Status(args) => status::run(args, &ctx).await,
    }
}
