//! CodeLogic CLI
//!
//! Main entry point for the codelogic command-line tool.
//! Serves the grounded building-code chat endpoint and answers one-off questions.

mod commands;
mod server;

use clap::{Parser, Subcommand};
use codelogic_core::{config::AppConfig, logging};
use commands::{AskCommand, CategoriesCommand, ServeCommand};
use std::path::PathBuf;
use tracing::Instrument;

/// CodeLogic - building-code answers grounded in the code books
#[derive(Parser, Debug)]
#[command(name = "codelogic")]
#[command(about = "Building-code question answering grounded in retrieved passages", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "CODELOGIC_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "CODELOGIC_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (openai, ollama)
    #[arg(short, long, global = true, env = "CODELOGIC_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "CODELOGIC_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP chat endpoint
    Serve(ServeCommand),

    /// Ask a single question
    Ask(AskCommand),

    /// List category codes and their documents
    Categories(CategoriesCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration from file and environment
    let config = AppConfig::load()?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)?;

    tracing::info!("CodeLogic starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    let command_name = match &cli.command {
        Commands::Serve(_) => "serve",
        Commands::Ask(_) => "ask",
        Commands::Categories(_) => "categories",
    };
    let result = async {
        match cli.command {
            Commands::Serve(cmd) => cmd.execute(&config).await,
            Commands::Ask(cmd) => cmd.execute(&config).await.map_err(Into::into),
            Commands::Categories(cmd) => cmd.execute(&config).await.map_err(Into::into),
        }
    }
    .instrument(tracing::info_span!("command", name = command_name))
    .await;

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
