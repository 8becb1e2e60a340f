//! Aide CLI: the main entry point.
//!
//! Commands:
//! - `ask`      : Answer one question and exit
//! - `chat`     : Interactive session with conversational memory
//! - `snapshot` : Summarize the day from calendar and Notion
//! - `doctor`   : Check configuration and data sources
//! - `onboard`  : Write a default config and create the knowledge folder

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "aide",
    about = "Aide: a productivity assistant over your calendar, notes, and tasks",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file (defaults to ~/.aide/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question
    Ask {
        /// The question, e.g. "what's on my calendar tomorrow?"
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Start an interactive session
    Chat,

    /// Get today's snapshot
    Snapshot,

    /// Diagnose configuration and data sources
    Doctor,

    /// Initialize configuration and the knowledge folder
    Onboard,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so answers on stdout stay clean
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Ask { question } => commands::ask::run(config, &question.join(" ")).await?,
        Commands::Chat => commands::chat::run(config).await?,
        Commands::Snapshot => commands::snapshot::run(config).await?,
        Commands::Doctor => commands::doctor::run(config).await?,
        Commands::Onboard => commands::onboard::run().await?,
    }

    Ok(())
}
