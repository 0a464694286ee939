use crate::core::error::{SyncError, classify};
use crate::core::price::{PriceDataSource, SpotQuote};
use crate::core::retry::RetryExecutor;
use crate::sync::state::CurrentPriceState;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::{debug, warn};

/// Keeps the spot price section. Every refresh goes to the network.
pub struct CurrentPriceTracker {
    source: Arc<dyn PriceDataSource>,
    retry: RetryExecutor,
    state: CurrentPriceState,
}

impl CurrentPriceTracker {
    pub fn new(source: Arc<dyn PriceDataSource>, retry: RetryExecutor) -> Self {
        Self {
            source,
            retry,
            state: CurrentPriceState::Pending,
        }
    }

    pub fn state(&self) -> &CurrentPriceState {
        &self.state
    }

    /// Starts a fresh spot fetch. The returned future owns everything it
    /// needs, so it can run on its own task while the tracker stays put.
    pub fn refresh(&self) -> BoxFuture<'static, Result<SpotQuote, SyncError>> {
        let source = Arc::clone(&self.source);
        let retry = self.retry;
        Box::pin(async move {
            retry
                .execute(|| source.fetch_spot_price(), classify)
                .await
        })
    }

    pub fn mark_pending(&mut self) -> &CurrentPriceState {
        self.state = CurrentPriceState::Pending;
        &self.state
    }

    /// Records the outcome of a fetch started by [`refresh`](Self::refresh).
    pub fn apply(&mut self, outcome: Result<SpotQuote, SyncError>) -> &CurrentPriceState {
        self.state = match outcome {
            Ok(quote) => {
                debug!(price = quote.price, currency = %quote.currency, "Spot price updated");
                CurrentPriceState::Ready(quote)
            }
            Err(e) => {
                warn!(error = %e, "Spot price refresh failed");
                CurrentPriceState::Failed(format!("Failed to load current price: {e}"))
            }
        };
        &self.state
    }
}
