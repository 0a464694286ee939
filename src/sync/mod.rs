//! Incremental synchronization of the spot price and the daily history

pub mod coordinator;
pub mod scheduler;
pub mod state;
pub mod tracker;

pub use coordinator::{Clock, SyncCoordinator, SyncSettings, SystemClock};
pub use scheduler::RefreshScheduler;
pub use state::{CurrentPriceState, HistoricalState, SyncState};
pub use tracker::CurrentPriceTracker;
