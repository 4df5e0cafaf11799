mod commands;
mod config;

use clap::{Parser, Subcommand};
use gamepass_core::{GameLedger, GamePassError};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "gamepass")]
#[command(about = "GamePass - escrowed pooled-stake game ledger")]
#[command(version)]
struct Cli {
    /// Data directory for ledger storage
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Platform fee percentage, used when initializing a fresh ledger
    #[arg(long, global = true, default_value_t = config::DEFAULT_PLATFORM_FEE_PERCENTAGE)]
    fee: u8,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Game lifecycle commands
    #[command(subcommand)]
    Game(commands::GameCommands),

    /// Account and funding commands
    #[command(subcommand)]
    Account(commands::AccountCommands),

    /// Show the registry status
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "gamepass={},gamepass_core={}",
            log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Get data directory
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| config::CliConfig::default().data_dir);
    tokio::fs::create_dir_all(&data_dir).await?;
    tracing::debug!("Using data directory {}", data_dir.display());

    // Open the ledger (creates registry and owner account on first run)
    let ledger = GameLedger::open(&data_dir, cli.fee).await?;

    // Execute command
    let result = match cli.command {
        Commands::Game(cmd) => commands::handle_game_command(cmd, &ledger).await,
        Commands::Account(cmd) => commands::handle_account_command(cmd, &ledger).await,
        Commands::Status => commands::show_status(&ledger),
    };

    if let Err(e) = result {
        match e {
            GamePassError::AccountNotFound(name) => {
                eprintln!("Error: Account '{}' not found", name);
                eprintln!("Use 'gamepass account list' to see available accounts");
            }
            GamePassError::NotFound(id) => {
                eprintln!("Error: Game {} not found", id);
                eprintln!("Use 'gamepass game list' to see known games");
            }
            GamePassError::InsufficientFunds { need, available } => {
                eprintln!("Error: Insufficient funds");
                eprintln!("Need: {} units, Available: {} units", need, available);
            }
            _ => {
                eprintln!("Error: {}", e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
