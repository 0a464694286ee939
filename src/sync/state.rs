use crate::core::price::{DailyPrice, SpotQuote};

/// Published state of one independently refreshed section.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncState<T> {
    Pending,
    Ready(T),
    Failed(String),
}

impl<T> SyncState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, SyncState::Pending)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            SyncState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            SyncState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

impl<T> Default for SyncState<T> {
    fn default() -> Self {
        SyncState::Pending
    }
}

pub type CurrentPriceState = SyncState<SpotQuote>;

/// Daily prices, most recent day first.
pub type HistoricalState = SyncState<Vec<DailyPrice>>;
