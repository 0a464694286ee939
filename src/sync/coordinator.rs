use crate::core::cache::{DEFAULT_WINDOW_SIZE_DAYS, HistoricalPriceCache};
use crate::core::error::{SyncError, classify};
use crate::core::price::{DailyPrice, DayNumber, PriceDataSource, RawSample, SpotQuote};
use crate::core::retry::{RetryExecutor, RetryPolicy};
use crate::sync::state::{CurrentPriceState, HistoricalState};
use crate::sync::tracker::CurrentPriceTracker;
use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

/// Source of "today" for deciding how much history to fetch.
pub trait Clock: Send + Sync {
    fn today(&self) -> DayNumber;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> DayNumber {
        DayNumber::from_datetime(Utc::now())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub window_size_days: u32,
    pub retry_policy: RetryPolicy,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            window_size_days: DEFAULT_WINDOW_SIZE_DAYS,
            retry_policy: RetryPolicy::default(),
        }
    }
}

enum Command {
    RefreshAll {
        done: Option<oneshot::Sender<()>>,
    },
    DayDetail {
        day: DayNumber,
        reply: oneshot::Sender<Result<DailyPrice, SyncError>>,
    },
}

enum Completion {
    Spot(Result<SpotQuote, SyncError>),
    History {
        today: DayNumber,
        outcome: Result<Vec<RawSample>, SyncError>,
    },
    CycleDone(Option<oneshot::Sender<()>>),
}

/// Handle to the task that owns the price window and both published states.
///
/// Handles are cheap to clone. Once every handle is dropped the owning task
/// stops, and fetches still in flight have their results discarded.
#[derive(Clone)]
pub struct SyncCoordinator {
    commands: mpsc::UnboundedSender<Command>,
    current: watch::Receiver<CurrentPriceState>,
    historical: watch::Receiver<HistoricalState>,
}

impl SyncCoordinator {
    /// Spawns the owning task on the current tokio runtime.
    pub fn new(source: Arc<dyn PriceDataSource>, settings: SyncSettings) -> Self {
        Self::with_clock(source, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: Arc<dyn PriceDataSource>,
        settings: SyncSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (current_tx, current_rx) = watch::channel(CurrentPriceState::Pending);
        let (historical_tx, historical_rx) = watch::channel(HistoricalState::Pending);

        let retry = RetryExecutor::new(settings.retry_policy);
        let context = SyncContext {
            tracker: CurrentPriceTracker::new(Arc::clone(&source), retry),
            cache: HistoricalPriceCache::new(settings.window_size_days, source.currency()),
            source,
            retry,
            clock,
            current_tx,
            historical_tx,
            completions_tx,
        };
        tokio::spawn(context.run(commands_rx, completions_rx));

        Self {
            commands: commands_tx,
            current: current_rx,
            historical: historical_rx,
        }
    }

    /// Refreshes both sections and waits until both results are published.
    pub async fn refresh_all(&self) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.send(Command::RefreshAll {
            done: Some(done_tx),
        })?;
        done_rx
            .await
            .context("Coordinator stopped before the refresh completed")
    }

    /// Starts a refresh cycle without waiting for it.
    pub fn request_refresh(&self) -> Result<()> {
        self.send(Command::RefreshAll { done: None })
    }

    /// Fetches every reported currency for one day. Published state is untouched.
    pub async fn day_detail(&self, day: DayNumber) -> Result<DailyPrice> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::DayDetail {
            day,
            reply: reply_tx,
        })?;
        let daily = reply_rx
            .await
            .context("Coordinator stopped before the day detail arrived")??;
        Ok(daily)
    }

    pub fn current_price(&self) -> CurrentPriceState {
        self.current.borrow().clone()
    }

    pub fn historical_prices(&self) -> HistoricalState {
        self.historical.borrow().clone()
    }

    pub fn subscribe_current(&self) -> watch::Receiver<CurrentPriceState> {
        self.current.clone()
    }

    pub fn subscribe_historical(&self) -> watch::Receiver<HistoricalState> {
        self.historical.clone()
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("Coordinator is no longer running"))
    }
}

/// All mutable sync state. Lives on a single task; fetches run on their own
/// tasks and report back through `completions_tx`.
struct SyncContext {
    tracker: CurrentPriceTracker,
    cache: HistoricalPriceCache,
    source: Arc<dyn PriceDataSource>,
    retry: RetryExecutor,
    clock: Arc<dyn Clock>,
    current_tx: watch::Sender<CurrentPriceState>,
    historical_tx: watch::Sender<HistoricalState>,
    completions_tx: mpsc::UnboundedSender<Completion>,
}

impl SyncContext {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        loop {
            tokio::select! {
                biased;
                Some(completion) = completions.recv() => self.apply(completion),
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }
        debug!("All coordinator handles dropped, discarding in-flight results");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::RefreshAll { done } => self.start_cycle(done),
            Command::DayDetail { day, reply } => {
                let source = Arc::clone(&self.source);
                let retry = self.retry;
                tokio::spawn(async move {
                    let outcome = retry
                        .execute(|| source.fetch_day_prices(day), classify)
                        .await;
                    let _ = reply.send(outcome);
                });
            }
        }
    }

    fn start_cycle(&mut self, done: Option<oneshot::Sender<()>>) {
        let today = self.clock.today();
        info!(%today, "Starting refresh cycle");

        self.current_tx
            .send_replace(self.tracker.mark_pending().clone());
        let spot_fetch = self.tracker.refresh();
        let completions = self.completions_tx.clone();
        let spot = tokio::spawn(async move {
            let outcome = spot_fetch.await;
            let _ = completions.send(Completion::Spot(outcome));
        });

        let history = if self.cache.is_fresh_enough_to_skip(today) {
            debug!("History already covers today, republishing cached window");
            self.historical_tx
                .send_replace(HistoricalState::Ready(self.cache.prices()));
            None
        } else {
            self.historical_tx.send_replace(HistoricalState::Pending);
            let lookback = self.cache.required_lookback(today);
            debug!(lookback, "Requesting daily series");
            let source = Arc::clone(&self.source);
            let retry = self.retry;
            let completions = self.completions_tx.clone();
            Some(tokio::spawn(async move {
                let outcome = retry
                    .execute(|| source.fetch_daily_series(lookback), classify)
                    .await;
                let _ = completions.send(Completion::History { today, outcome });
            }))
        };

        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let _ = spot.await;
            if let Some(history) = history {
                let _ = history.await;
            }
            let _ = completions.send(Completion::CycleDone(done));
        });
    }

    fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Spot(outcome) => {
                let state = self.tracker.apply(outcome).clone();
                self.current_tx.send_replace(state);
            }
            Completion::History { today, outcome } => {
                let state = match outcome.and_then(|samples| self.cache.merge(&samples, today)) {
                    Ok(_) => HistoricalState::Ready(self.cache.prices()),
                    Err(e) => {
                        warn!(error = %e, "History refresh failed");
                        HistoricalState::Failed(format!("Failed to load history: {e}"))
                    }
                };
                self.historical_tx.send_replace(state);
            }
            Completion::CycleDone(done) => {
                debug!("Refresh cycle complete");
                if let Some(done) = done {
                    let _ = done.send(());
                }
            }
        }
    }
}
