//! # tablerag: ask questions about warehouse tables
//!
//! This is the main entry point for the `tablerag` command-line interface.

mod app;
mod chat;
mod commands;
mod config;
mod ui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::fs::File;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE: &str = "tablerag.log";

// --- CLI Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a YAML config file (defaults to ./config.yml when present)
    #[arg(long, global = true, env = "TABLERAG_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract the configured tables from the warehouse into flat files
    Extract,
    /// Build the vector index from the extracted flat files
    Index(IndexArgs),
    /// Open the chat window
    Chat,
    /// Extract, index, then chat
    Run,
    /// Close the vector store and delete the query cache
    Clean,
}

#[derive(Parser, Debug)]
struct IndexArgs {
    /// Rebuild even if the data has not changed
    #[arg(long)]
    force: bool,
}

// --- Main Application Entry ---

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Log to a file so the chat window is not overwritten.
    let log_file = File::create(LOG_FILE)?;
    let subscriber = fmt::Subscriber::builder()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let config = config::get_config(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Extract => commands::extract(&config).await.map(|_| ()),
        Commands::Index(args) => commands::index(&config, args.force).await.map(|_| ()),
        Commands::Chat => commands::chat(&config).await,
        Commands::Run => commands::run(&config).await,
        Commands::Clean => commands::clean(&config).await,
    };

    if let Err(e) = &result {
        error!("Command failed: {e:#}");
    }
    result
}
