use anyhow::Result;
use btcwatch::core::log::init_logging;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch and display the current price and recent history once
    Show,
    /// Keep the current price and recent history up to date
    Watch,
    /// Display a single day's price in every available currency
    Day {
        /// Day to look up, as YYYY-MM-DD (UTC)
        date: NaiveDate,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config_path = cli.config_path.as_deref();
    let result = match cli.command {
        Some(Commands::Setup) => btcwatch::cli::setup::setup(),
        Some(Commands::Show) => btcwatch::run_command(btcwatch::AppCommand::Show, config_path).await,
        Some(Commands::Watch) => {
            btcwatch::run_command(btcwatch::AppCommand::Watch, config_path).await
        }
        Some(Commands::Day { date }) => {
            btcwatch::run_command(btcwatch::AppCommand::Day(date), config_path).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
