pub mod cli;
pub mod core;
pub mod providers;
pub mod sync;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::{debug, info};

pub enum AppCommand {
    Show,
    Watch,
    Day(NaiveDate),
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("btcwatch starting...");

    let config = match config_path {
        Some(path) => core::config::AppConfig::load_from_path(path)?,
        None => core::config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Show => cli::prices::show(&config).await,
        AppCommand::Watch => cli::prices::watch(&config).await,
        AppCommand::Day(date) => cli::prices::day(&config, date).await,
    }
}
