//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod error;
pub mod log;
pub mod price;
pub mod retry;

// Re-export main types for cleaner imports
pub use cache::HistoricalPriceCache;
pub use error::{ErrorClass, SyncError, TransportError};
pub use price::{DailyPrice, DayNumber, PriceDataSource, RawSample, SpotQuote};
pub use retry::{RetryExecutor, RetryPolicy};
