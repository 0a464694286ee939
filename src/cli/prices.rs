use super::ui;
use crate::core::config::AppConfig;
use crate::core::price::DayNumber;
use crate::providers::coingecko::CoinGeckoProvider;
use crate::sync::{RefreshScheduler, SyncCoordinator};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

pub fn build_coordinator(config: &AppConfig) -> Result<SyncCoordinator> {
    let provider = CoinGeckoProvider::new(&config.providers.coingecko, &config.currency)
        .context("Failed to create CoinGecko client")?;
    Ok(SyncCoordinator::new(
        Arc::new(provider),
        config.sync_settings(),
    ))
}

fn render(coordinator: &SyncCoordinator, config: &AppConfig) -> String {
    format!(
        "{}\n\n{}",
        ui::render_current_price(&coordinator.current_price()),
        ui::render_history(
            &coordinator.historical_prices(),
            &config.currency,
            config.window_size_days
        )
    )
}

/// Runs a single refresh and prints both sections.
pub async fn show(config: &AppConfig) -> Result<()> {
    let coordinator = build_coordinator(config)?;

    let spinner = ui::new_spinner("Fetching prices...");
    coordinator.refresh_all().await?;
    spinner.finish_and_clear();

    println!("{}", render(&coordinator, config));
    Ok(())
}

/// Keeps both sections up to date until interrupted.
pub async fn watch(config: &AppConfig) -> Result<()> {
    let coordinator = build_coordinator(config)?;
    watch_until(&coordinator, config, tokio::signal::ctrl_c()).await
}

/// Redraws on every state change until `shutdown` resolves.
///
/// `shutdown` is polled across redraws, so a signal raised mid-render is not lost.
pub async fn watch_until<F>(
    coordinator: &SyncCoordinator,
    config: &AppConfig,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    let mut current = coordinator.subscribe_current();
    let mut historical = coordinator.subscribe_historical();
    let mut scheduler = RefreshScheduler::new(coordinator.clone(), config.refresh_interval());

    // Becoming active triggers the first refresh; the scheduler handles the rest.
    coordinator.request_refresh()?;
    scheduler.start();

    let term = console::Term::stdout();
    tokio::pin!(shutdown);
    loop {
        term.clear_screen()?;
        println!("{}", render(coordinator, config));
        println!(
            "\n{}",
            ui::style_text(
                &format!(
                    "Refreshing every {}s. Press Ctrl-C to quit.",
                    config.refresh_interval_seconds
                ),
                ui::StyleType::Subtle
            )
        );

        tokio::select! {
            signal = &mut shutdown => {
                signal.context("Failed to listen for Ctrl-C")?;
                debug!("Interrupted");
                break;
            }
            changed = current.changed() => changed.context("Coordinator stopped")?,
            changed = historical.changed() => changed.context("Coordinator stopped")?,
        }
    }

    scheduler.stop();
    info!("Stopped watching");
    Ok(())
}

/// Prints every currency the source reports for one day.
pub async fn day(config: &AppConfig, date: NaiveDate) -> Result<()> {
    let coordinator = build_coordinator(config)?;

    let spinner = ui::new_spinner(&format!("Fetching prices for {date}..."));
    let daily = coordinator.day_detail(DayNumber::from_date(date)).await;
    spinner.finish_and_clear();

    let daily = daily.with_context(|| format!("Failed to load prices for {date}"))?;
    println!("{}", ui::render_day_detail(&daily));
    Ok(())
}
