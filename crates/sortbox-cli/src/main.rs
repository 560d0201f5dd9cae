//! `sortbox` -- CLI binary for the sortbox email triage engine.
//!
//! Provides the following subcommands:
//!
//! - `sortbox classify` -- Classify a mailbox file, streaming NDJSON progress.
//! - `sortbox buckets` -- Print the default bucket set.
//! - `sortbox config` -- Show the resolved configuration.
//!
//! Logs go to stderr so stdout carries only the progress stream.

use clap::{Parser, Subcommand};

mod commands;

/// sortbox email triage CLI.
#[derive(Parser)]
#[command(name = "sortbox", about = "Sort email threads into buckets with an LLM", version)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Classify the threads of a mailbox file.
    Classify(commands::classify::ClassifyArgs),

    /// Print the default bucket set as JSON.
    Buckets,

    /// Show the resolved configuration.
    Config {
        /// Config file path (overrides auto-discovery).
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Classify(args) => commands::classify::run(args).await?,
        Commands::Buckets => commands::buckets::run()?,
        Commands::Config { config } => {
            let config = commands::load_config(config.as_deref())?;
            commands::config_cmd::config_show(&config)?;
        }
    }

    Ok(())
}
