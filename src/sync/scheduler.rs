use crate::sync::coordinator::SyncCoordinator;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically triggers [`SyncCoordinator::refresh_all`] while running.
///
/// The first refresh is left to whoever calls [`start`](Self::start); the
/// scheduler only drives the recurring cadence after it.
pub struct RefreshScheduler {
    coordinator: SyncCoordinator,
    interval: Duration,
    ticker: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    pub fn new(coordinator: SyncCoordinator, interval: Duration) -> Self {
        Self {
            coordinator,
            interval,
            ticker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker
            .as_ref()
            .is_some_and(|ticker| !ticker.is_finished())
    }

    pub fn start(&mut self) {
        if self.is_running() {
            debug!("Refresh scheduler already running");
            return;
        }

        let coordinator = self.coordinator.clone();
        let period = self.interval;
        info!(?period, "Starting refresh scheduler");
        self.ticker = Some(tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticks.tick().await;
                debug!("Scheduled refresh");
                // Requesting rather than awaiting keeps an in-flight cycle
                // alive if the scheduler is stopped mid-refresh.
                if let Err(e) = coordinator.request_refresh() {
                    warn!(error = %e, "Stopping refresh scheduler");
                    break;
                }
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            info!("Stopping refresh scheduler");
            ticker.abort();
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
